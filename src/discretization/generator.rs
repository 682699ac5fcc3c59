use super::mesh::{Mesh, MeshError};
use glam::DVec3;

/// Hex corner offsets of the six Kuhn tetrahedra sharing the main diagonal.
/// Every hex is split the same way, so neighbouring hexes stay conforming.
const KUHN_PATHS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

/// Structured grid of `n[0] x n[1] x n[2]` hexahedra over `[min, max]`, each
/// split into six tetrahedra.
fn structured_tets(min: DVec3, max: DVec3, n: [usize; 3]) -> (Vec<DVec3>, Vec<[usize; 4]>) {
    let [nx, ny, nz] = n.map(|k| k.max(1));
    let step = (max - min) / DVec3::new(nx as f64, ny as f64, nz as f64);
    let index = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);

    let mut positions = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                // pin the far planes so they are hit exactly
                let x = if i == nx { max.x } else { min.x + i as f64 * step.x };
                let y = if j == ny { max.y } else { min.y + j as f64 * step.y };
                let z = if k == nz { max.z } else { min.z + k as f64 * step.z };
                positions.push(DVec3::new(x, y, z));
            }
        }
    }

    let mut connectivity = Vec::with_capacity(6 * nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                for path in KUHN_PATHS {
                    let mut corner = [i, j, k];
                    let mut tet = [index(i, j, k), 0, 0, 0];
                    for (slot, axis) in path.into_iter().enumerate() {
                        corner[axis] += 1;
                        tet[slot + 1] = index(corner[0], corner[1], corner[2]);
                    }
                    connectivity.push(tet);
                }
            }
        }
    }

    (positions, connectivity)
}

/// Tetrahedral mesh of the box `[min, max]` with `n` hexahedra per axis.
pub fn create_box_mesh(min: DVec3, max: DVec3, n: [usize; 3]) -> Result<Mesh, MeshError> {
    let (positions, connectivity) = structured_tets(min, max, n);
    let groups = vec![1; connectivity.len()];
    Mesh::new(positions, connectivity, groups)
}

/// Tetrahedral mesh of a circular cylinder with its axis along +x, spanning
/// `0 <= x <= length`. The square cross-section grid of `n_cross x n_cross`
/// cells is mapped onto the disc of the given radius.
pub fn create_cylinder_mesh(
    length: f64,
    radius: f64,
    n_axial: usize,
    n_cross: usize,
) -> Result<Mesh, MeshError> {
    let (square, connectivity) = structured_tets(
        DVec3::new(0.0, -1.0, -1.0),
        DVec3::new(length, 1.0, 1.0),
        [n_axial, n_cross, n_cross],
    );
    let positions = square
        .into_iter()
        .map(|p| {
            let (u, v) = (p.y, p.z);
            DVec3::new(
                p.x,
                radius * u * (1.0 - 0.5 * v * v).sqrt(),
                radius * v * (1.0 - 0.5 * u * u).sqrt(),
            )
        })
        .collect();
    let groups = vec![1; connectivity.len()];
    Mesh::new(positions, connectivity, groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn box_mesh_volume_and_counts() {
        let mesh = create_box_mesh(DVec3::ZERO, DVec3::new(2.0, 1.0, 0.5), [4, 2, 1]).unwrap();
        assert_eq!(mesh.nodes.len(), 5 * 3 * 2);
        assert_eq!(mesh.cells.len(), 6 * 8);
        assert_relative_eq!(mesh.total_volume(), 1.0, epsilon = 1e-12);
        // two triangles per boundary quad
        let quads = 2 * (4 * 2 + 4 * 1 + 2 * 1);
        assert_eq!(mesh.facets.len(), 2 * quads);
    }

    #[test]
    fn cylinder_mesh_end_planes_are_exact() {
        let mesh = create_cylinder_mesh(0.1, 0.01, 5, 4).unwrap();
        let (lo, hi) = mesh.bounding_box();
        assert_eq!(lo.x, 0.0);
        assert_eq!(hi.x, 0.1);
        assert!(mesh
            .nodes
            .iter()
            .all(|n| n.position.y.hypot(n.position.z) <= 0.01 + 1e-12));
        // the inscribed polygon approaches the disc area from below
        let area = mesh.total_volume() / 0.1;
        let disc = std::f64::consts::PI * 0.01 * 0.01;
        assert!(area < disc && area > 0.8 * disc);
    }
}
