//! Evaluation of region selectors on a concrete mesh.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::debug;

use super::mesh::Mesh;
use crate::problem::region::{RegionDef, RegionKind, Selector, SetOp};

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("region '{0}' is empty")]
    Empty(String),
    #[error("region '{name}' refers to unknown region '{reference}'")]
    UnknownReference { name: String, reference: String },
    #[error("region '{name}' selects vertex {index}, mesh has {len}")]
    VertexOutOfRange { name: String, index: usize, len: usize },
    #[error("region '{name}' selects cell {index}, mesh has {len}")]
    CellOutOfRange { name: String, index: usize, len: usize },
}

/// Concrete entities of a region. All index lists are sorted.
#[derive(Clone, Debug)]
pub struct Region {
    pub name: String,
    pub kind: RegionKind,
    pub vertices: Vec<usize>,
    pub cells: Vec<usize>,
    /// Indices into [`Mesh::facets`].
    pub facets: Vec<usize>,
}

impl Region {
    pub fn contains_vertex(&self, v: usize) -> bool {
        self.vertices.binary_search(&v).is_ok()
    }
}

pub type RegionMap = BTreeMap<String, Region>;

#[derive(Clone, Default)]
struct Sets {
    vertices: BTreeSet<usize>,
    cells: BTreeSet<usize>,
}

struct Evaluator<'a> {
    mesh: &'a Mesh,
    defs: &'a BTreeMap<String, RegionDef>,
    done: BTreeMap<&'a str, Sets>,
}

impl<'a> Evaluator<'a> {
    fn cells_within(&self, vertices: &BTreeSet<usize>) -> BTreeSet<usize> {
        self.mesh
            .cells
            .iter()
            .filter(|c| c.vertices.iter().all(|v| vertices.contains(v)))
            .map(|c| c.id)
            .collect()
    }

    fn vertices_of(&self, cells: &BTreeSet<usize>) -> BTreeSet<usize> {
        cells
            .iter()
            .flat_map(|&c| self.mesh.cells[c].vertices)
            .collect()
    }

    fn from_vertices(&self, vertices: BTreeSet<usize>) -> Sets {
        let cells = self.cells_within(&vertices);
        Sets { vertices, cells }
    }

    fn from_cells(&self, cells: BTreeSet<usize>) -> Sets {
        let vertices = self.vertices_of(&cells);
        Sets { vertices, cells }
    }

    fn region(&mut self, name: &'a str) -> Result<Sets, RegionError> {
        if let Some(sets) = self.done.get(name) {
            return Ok(sets.clone());
        }
        let def = self.defs.get(name).ok_or_else(|| RegionError::Empty(name.to_string()))?;
        let sets = self.selector(name, def.selector())?;
        self.done.insert(name, sets.clone());
        Ok(sets)
    }

    fn selector(&mut self, name: &'a str, selector: &'a Selector) -> Result<Sets, RegionError> {
        let mesh = self.mesh;
        let sets = match selector {
            Selector::All => Sets {
                vertices: (0..mesh.nodes.len()).collect(),
                cells: (0..mesh.cells.len()).collect(),
            },
            Selector::VerticesIn(pred) => self.from_vertices(
                mesh.nodes
                    .iter()
                    .enumerate()
                    .filter(|(_, n)| pred.eval(n.position))
                    .map(|(i, _)| i)
                    .collect(),
            ),
            Selector::VerticesOfSurface => self.from_vertices(
                mesh.facets.iter().flat_map(|f| f.vertices).collect(),
            ),
            Selector::Vertices(list) => {
                if let Some(&index) = list.iter().find(|&&v| v >= mesh.nodes.len()) {
                    return Err(RegionError::VertexOutOfRange {
                        name: name.to_string(),
                        index,
                        len: mesh.nodes.len(),
                    });
                }
                self.from_vertices(list.iter().copied().collect())
            }
            Selector::Cells(list) => {
                if let Some(&index) = list.iter().find(|&&c| c >= mesh.cells.len()) {
                    return Err(RegionError::CellOutOfRange {
                        name: name.to_string(),
                        index,
                        len: mesh.cells.len(),
                    });
                }
                self.from_cells(list.iter().copied().collect())
            }
            Selector::CellsOfGroup(group) => self.from_cells(
                mesh.cells
                    .iter()
                    .filter(|c| c.group == *group)
                    .map(|c| c.id)
                    .collect(),
            ),
            Selector::Reference(other) => {
                if !self.defs.contains_key(other) {
                    return Err(RegionError::UnknownReference {
                        name: name.to_string(),
                        reference: other.clone(),
                    });
                }
                self.region(other)?
            }
            Selector::Combine { op, lhs, rhs } => {
                let a = self.selector(name, lhs)?;
                let b = self.selector(name, rhs)?;
                match op {
                    SetOp::VertexUnion => {
                        self.from_vertices(a.vertices.union(&b.vertices).copied().collect())
                    }
                    SetOp::VertexDifference => {
                        self.from_vertices(a.vertices.difference(&b.vertices).copied().collect())
                    }
                    SetOp::VertexIntersection => self
                        .from_vertices(a.vertices.intersection(&b.vertices).copied().collect()),
                    SetOp::CellUnion => self.from_cells(a.cells.union(&b.cells).copied().collect()),
                    SetOp::CellDifference => {
                        self.from_cells(a.cells.difference(&b.cells).copied().collect())
                    }
                    SetOp::CellIntersection => {
                        self.from_cells(a.cells.intersection(&b.cells).copied().collect())
                    }
                }
            }
        };
        Ok(sets)
    }
}

/// Evaluate every region definition on `mesh`.
///
/// A cell belongs to a vertex-selected region when all of its vertices do, and
/// a boundary facet likewise. Regions must not be empty for their kind: cell
/// regions need cells, facet regions need boundary facets.
pub fn evaluate_regions(
    defs: &BTreeMap<String, RegionDef>,
    mesh: &Mesh,
) -> Result<RegionMap, RegionError> {
    let mut evaluator = Evaluator {
        mesh,
        defs,
        done: BTreeMap::new(),
    };
    let mut out = RegionMap::new();
    for (name, def) in defs {
        let sets = evaluator.region(name)?;
        let facets: Vec<usize> = mesh
            .facets
            .iter()
            .enumerate()
            .filter(|(_, f)| f.vertices.iter().all(|v| sets.vertices.contains(v)))
            .map(|(i, _)| i)
            .collect();
        let empty = match def.kind() {
            RegionKind::Cell => sets.cells.is_empty(),
            RegionKind::Facet => facets.is_empty(),
            RegionKind::Edge | RegionKind::Vertex => sets.vertices.is_empty(),
        };
        if empty {
            return Err(RegionError::Empty(name.clone()));
        }
        debug!(
            region = %name,
            kind = %def.kind(),
            vertices = sets.vertices.len(),
            cells = sets.cells.len(),
            facets = facets.len(),
            "evaluated region"
        );
        out.insert(
            name.clone(),
            Region {
                name: name.clone(),
                kind: def.kind(),
                vertices: sets.vertices.into_iter().collect(),
                cells: sets.cells.into_iter().collect(),
                facets,
            },
        );
    }
    Ok(out)
}
