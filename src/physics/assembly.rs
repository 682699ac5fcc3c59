//! Weak-form assembly for linear tetrahedra.
//!
//! The residual is generic over the numeric type so that the Newton solver can
//! differentiate it with dual numbers. Terms that do not depend on the unknown
//! are integrated once into a constant load vector.

use glam::{DMat3, DVec3};
use nalgebra::{DVector, Matrix3};
use num_dual::DualNum;

use super::quadrature::{TetrahedronRule, TriangleRule};
use crate::discretization::mesh::Mesh;
use crate::problem::Coefficient;

/// Diffusion coefficient of a Laplace term.
#[derive(Clone, Debug, PartialEq)]
pub enum Conductivity {
    Scalar(f64),
    Tensor(Matrix3<f64>),
}

impl Conductivity {
    /// Scalars and 3x3 tensors are accepted; a 1x1 matrix counts as a scalar.
    pub fn from_coefficient(c: &Coefficient) -> Option<Self> {
        match c {
            Coefficient::Scalar(k) => Some(Self::Scalar(*k)),
            Coefficient::Matrix(rows) if rows.len() == 1 && rows[0].len() == 1 => {
                Some(Self::Scalar(rows[0][0]))
            }
            Coefficient::Matrix(rows) if rows.len() == 3 && rows.iter().all(|r| r.len() == 3) => {
                Some(Self::Tensor(Matrix3::from_fn(|i, j| rows[i][j])))
            }
            _ => None,
        }
    }

    fn apply<T>(&self, g: &[T; 3]) -> [T; 3]
    where
        T: nalgebra::Scalar + DualNum<f64> + num_traits::Zero,
    {
        match self {
            Conductivity::Scalar(k) => g.clone().map(|x| x * *k),
            Conductivity::Tensor(m) => std::array::from_fn(|r| {
                let mut acc = T::zero();
                for (c, x) in g.iter().enumerate() {
                    acc += x.clone() * m[(r, c)];
                }
                acc
            }),
        }
    }
}

/// A term of the residual `sum(factor * term) = 0`, bound to concrete mesh
/// entities.
#[derive(Clone, Debug)]
pub enum WeakTerm {
    /// `∫ ∇s · K ∇t` over cells.
    Laplace {
        factor: f64,
        cells: Vec<usize>,
        conductivity: Conductivity,
        rule: TetrahedronRule,
    },
    /// `∫ f s` over cells.
    VolumeSource {
        factor: f64,
        cells: Vec<usize>,
        value: f64,
        rule: TetrahedronRule,
    },
    /// `∫ g s` over boundary facets.
    SurfaceFlux {
        factor: f64,
        facets: Vec<usize>,
        value: f64,
        rule: TriangleRule,
    },
}

/// Gradients of the four barycentric shape functions of a tetrahedron.
pub fn shape_gradients(p: [DVec3; 4]) -> [DVec3; 4] {
    let jac = DMat3::from_cols(p[1] - p[0], p[2] - p[0], p[3] - p[0]);
    if jac.determinant().abs() <= f64::MIN_POSITIVE {
        return [DVec3::ZERO; 4];
    }
    // rows of the inverse Jacobian
    let rows = jac.inverse().transpose();
    let (g1, g2, g3) = (rows.col(0), rows.col(1), rows.col(2));
    [-(g1 + g2 + g3), g1, g2, g3]
}

pub struct WeakForm {
    terms: Vec<WeakTerm>,
    gradients: Vec<[DVec3; 4]>,
    load: DVector<f64>,
}

impl WeakForm {
    pub fn new(mesh: &Mesh, terms: Vec<WeakTerm>) -> Self {
        let gradients = mesh
            .cells
            .iter()
            .map(|c| shape_gradients(c.vertices.map(|v| mesh.nodes[v].position)))
            .collect();
        let mut load = DVector::zeros(mesh.nodes.len());
        for term in &terms {
            match term {
                WeakTerm::VolumeSource {
                    factor,
                    cells,
                    value,
                    rule,
                } => {
                    for &c in cells {
                        let cell = &mesh.cells[c];
                        for (lambda, w) in rule.points.iter().zip(&rule.weights) {
                            let scale = factor * value * w * cell.volume;
                            for (i, &v) in cell.vertices.iter().enumerate() {
                                load[v] += scale * lambda[i];
                            }
                        }
                    }
                }
                WeakTerm::SurfaceFlux {
                    factor,
                    facets,
                    value,
                    rule,
                } => {
                    for &f in facets {
                        let facet = &mesh.facets[f];
                        for (lambda, w) in rule.points.iter().zip(&rule.weights) {
                            let scale = factor * value * w * facet.area;
                            for (i, &v) in facet.vertices.iter().enumerate() {
                                load[v] += scale * lambda[i];
                            }
                        }
                    }
                }
                WeakTerm::Laplace { .. } => {}
            }
        }
        Self {
            terms,
            gradients,
            load,
        }
    }

    pub fn terms(&self) -> &[WeakTerm] {
        &self.terms
    }

    /// Constant part of the residual.
    pub fn load(&self) -> &DVector<f64> {
        &self.load
    }

    /// Residual over all nodal DOFs for the full nodal vector `u`.
    pub fn residual<T>(&self, mesh: &Mesh, u: &DVector<T>) -> DVector<T>
    where
        T: nalgebra::Scalar + DualNum<f64> + num_traits::Zero,
    {
        let mut r = DVector::from_iterator(self.load.len(), self.load.iter().map(|&l| T::from(l)));
        for term in &self.terms {
            let WeakTerm::Laplace {
                factor,
                cells,
                conductivity,
                rule,
            } = term
            else {
                continue;
            };
            // constant gradients: the integrand is constant on each cell
            let weight: f64 = rule.weights.iter().sum();
            for &c in cells {
                let cell = &mesh.cells[c];
                let g = &self.gradients[c];
                let mut grad = [T::zero(), T::zero(), T::zero()];
                for (j, &v) in cell.vertices.iter().enumerate() {
                    grad[0] += u[v].clone() * g[j].x;
                    grad[1] += u[v].clone() * g[j].y;
                    grad[2] += u[v].clone() * g[j].z;
                }
                let flux = conductivity.apply(&grad);
                let scale = factor * weight * cell.volume;
                for (i, &v) in cell.vertices.iter().enumerate() {
                    r[v] += (flux[0].clone() * g[i].x
                        + flux[1].clone() * g[i].y
                        + flux[2].clone() * g[i].z)
                        * scale;
                }
            }
        }
        r
    }
}
