//! Quadrature rules on simplices, in barycentric coordinates.
//!
//! Weights sum to one, so the physical weight of a point is its weight times
//! the cell volume (or facet area).

use glam::DVec3;

#[derive(Clone, Debug, PartialEq)]
pub struct QuadratureRule<const N: usize> {
    pub points: Vec<[f64; N]>,
    pub weights: Vec<f64>,
}

pub type TetrahedronRule = QuadratureRule<4>;
pub type TriangleRule = QuadratureRule<3>;

/// Highest order with a tabulated rule.
pub const MAX_ORDER: u32 = 3;

impl<const N: usize> QuadratureRule<N> {
    fn centroid() -> Self {
        Self {
            points: vec![[1.0 / N as f64; N]],
            weights: vec![1.0],
        }
    }

    /// All permutations of `(a, b, b, ...)` with weight `w`.
    fn push_orbit(&mut self, a: f64, b: f64, w: f64) {
        for i in 0..N {
            let mut p = [b; N];
            p[i] = a;
            self.points.push(p);
            self.weights.push(w);
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Physical points of the rule on the simplex with the given vertices.
    pub fn map<'a>(&'a self, vertices: &'a [DVec3; N]) -> impl Iterator<Item = (DVec3, f64)> + 'a {
        self.points.iter().zip(&self.weights).map(move |(lambda, &w)| {
            let x = lambda
                .iter()
                .zip(vertices)
                .fold(DVec3::ZERO, |acc, (&l, &v)| acc + l * v);
            (x, w)
        })
    }
}

impl TetrahedronRule {
    /// Rule exact for polynomials of degree `order`, `None` above [`MAX_ORDER`].
    pub fn tetrahedron(order: u32) -> Option<Self> {
        match order {
            0 | 1 => Some(Self::centroid()),
            2 => {
                let mut rule = Self {
                    points: Vec::new(),
                    weights: Vec::new(),
                };
                rule.push_orbit(0.585_410_196_624_968_5, 0.138_196_601_125_010_5, 0.25);
                Some(rule)
            }
            3 => {
                let mut rule = Self::centroid();
                rule.weights[0] = -0.8;
                rule.push_orbit(0.5, 1.0 / 6.0, 0.45);
                Some(rule)
            }
            _ => None,
        }
    }
}

impl TriangleRule {
    pub fn triangle(order: u32) -> Option<Self> {
        match order {
            0 | 1 => Some(Self::centroid()),
            2 => {
                let mut rule = Self {
                    points: Vec::new(),
                    weights: Vec::new(),
                };
                rule.push_orbit(2.0 / 3.0, 1.0 / 6.0, 1.0 / 3.0);
                Some(rule)
            }
            3 => {
                let mut rule = Self::centroid();
                rule.weights[0] = -27.0 / 48.0;
                rule.push_orbit(0.6, 0.2, 25.0 / 48.0);
                Some(rule)
            }
            _ => None,
        }
    }
}
