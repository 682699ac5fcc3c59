use std::collections::HashMap;

use glam::DVec3;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("failed to read mesh {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed mesh file at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("cell {cell} references vertex {vertex}, mesh has {n_nodes} vertices")]
    VertexOutOfRange {
        cell: usize,
        vertex: usize,
        n_nodes: usize,
    },
    #[error("mesh has no tetrahedra")]
    Empty,
}

/// The complete tetrahedral mesh.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub nodes: Vec<Node>,
    pub cells: Vec<Cell>,
    /// Boundary facets only; interior faces are not stored.
    pub facets: Vec<Facet>,
}

#[derive(Clone, Copy, Debug)]
pub struct Node {
    pub position: DVec3,
}

/// A linear tetrahedron.
#[derive(Clone, Debug)]
pub struct Cell {
    pub id: usize,
    pub vertices: [usize; 4],
    pub group: i32,
    pub volume: f64,
    pub centroid: DVec3,
}

/// A boundary triangle of a single cell.
#[derive(Clone, Debug)]
pub struct Facet {
    pub vertices: [usize; 3],
    pub cell: usize,
    pub area: f64,
    /// Outward pointing unit normal.
    pub normal: DVec3,
    pub centroid: DVec3,
}

impl Mesh {
    /// Build a mesh from vertex coordinates and tetrahedral connectivity.
    /// Cell volumes, centroids and the boundary facets are derived here.
    pub fn new(
        positions: Vec<DVec3>,
        connectivity: Vec<[usize; 4]>,
        groups: Vec<i32>,
    ) -> Result<Self, MeshError> {
        if connectivity.is_empty() {
            return Err(MeshError::Empty);
        }
        let n_nodes = positions.len();
        let nodes: Vec<Node> = positions.into_iter().map(|position| Node { position }).collect();

        let mut cells = Vec::with_capacity(connectivity.len());
        for (id, vertices) in connectivity.into_iter().enumerate() {
            if let Some(&vertex) = vertices.iter().find(|&&v| v >= n_nodes) {
                return Err(MeshError::VertexOutOfRange {
                    cell: id,
                    vertex,
                    n_nodes,
                });
            }
            let p = vertices.map(|v| nodes[v].position);
            let volume = tet_signed_volume(p).abs();
            if volume <= f64::EPSILON * (p[1] - p[0]).length().powi(3) {
                warn!(cell = id, volume, "degenerate tetrahedron");
            }
            cells.push(Cell {
                id,
                vertices,
                group: groups.get(id).copied().unwrap_or(0),
                volume,
                centroid: (p[0] + p[1] + p[2] + p[3]) / 4.0,
            });
        }

        let facets = boundary_facets(&nodes, &cells);
        Ok(Self {
            nodes,
            cells,
            facets,
        })
    }

    /// Axis-aligned bounding box as `(min, max)`.
    pub fn bounding_box(&self) -> (DVec3, DVec3) {
        self.nodes.iter().fold(
            (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
            |(lo, hi), n| (lo.min(n.position), hi.max(n.position)),
        )
    }

    pub fn total_volume(&self) -> f64 {
        self.cells.iter().map(|c| c.volume).sum()
    }

    /// Shortest and longest cell edge.
    pub fn edge_length_range(&self) -> (f64, f64) {
        let mut min: f64 = f64::INFINITY;
        let mut max: f64 = 0.0;
        for cell in &self.cells {
            for a in 0..4 {
                for b in (a + 1)..4 {
                    let d = self.nodes[cell.vertices[a]]
                        .position
                        .distance(self.nodes[cell.vertices[b]].position);
                    min = min.min(d);
                    max = max.max(d);
                }
            }
        }
        (min, max)
    }
}

pub fn tet_signed_volume(p: [DVec3; 4]) -> f64 {
    (p[1] - p[0]).dot((p[2] - p[0]).cross(p[3] - p[0])) / 6.0
}

/// Faces that belong to exactly one cell, oriented outwards.
fn boundary_facets(nodes: &[Node], cells: &[Cell]) -> Vec<Facet> {
    const LOCAL_FACES: [[usize; 3]; 4] = [[1, 2, 3], [0, 2, 3], [0, 1, 3], [0, 1, 2]];

    let mut owners: HashMap<[usize; 3], (usize, usize, usize)> = HashMap::new();
    let mut order = Vec::new();
    for cell in cells {
        for (opposite, local) in LOCAL_FACES.iter().enumerate() {
            let mut key = local.map(|i| cell.vertices[i]);
            key.sort_unstable();
            let entry = owners.entry(key).or_insert_with(|| {
                order.push(key);
                (cell.id, opposite, 0)
            });
            entry.2 += 1;
        }
    }

    order
        .into_iter()
        .filter_map(|key| {
            let (cell_id, opposite, count) = owners[&key];
            if count != 1 {
                return None;
            }
            let cell = &cells[cell_id];
            let p = key.map(|v| nodes[v].position);
            let mut cross = (p[1] - p[0]).cross(p[2] - p[0]);
            let centroid = (p[0] + p[1] + p[2]) / 3.0;
            let mut vertices = key;
            let inward = nodes[cell.vertices[opposite]].position - centroid;
            if cross.dot(inward) > 0.0 {
                cross = -cross;
                vertices.swap(1, 2);
            }
            let area = 0.5 * cross.length();
            Some(Facet {
                vertices,
                cell: cell_id,
                area,
                normal: cross.normalize_or_zero(),
                centroid,
            })
        })
        .collect()
}
