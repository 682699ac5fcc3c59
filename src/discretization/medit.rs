//! Medit ASCII (`.mesh`) reading and writing for tetrahedral meshes.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use glam::DVec3;
use tracing::debug;

use super::mesh::{Mesh, MeshError};

struct Tokens<'a> {
    inner: Box<dyn Iterator<Item = (usize, &'a str)> + 'a>,
    line: usize,
}

impl<'a> Tokens<'a> {
    fn new(src: &'a str) -> Self {
        let inner = src
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim_start().starts_with('#'))
            .flat_map(|(i, l)| l.split_whitespace().map(move |t| (i + 1, t)));
        Self {
            inner: Box::new(inner),
            line: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> MeshError {
        MeshError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn next(&mut self) -> Option<&'a str> {
        let (line, tok) = self.inner.next()?;
        self.line = line;
        Some(tok)
    }

    fn value<T: std::str::FromStr>(&mut self, what: &str) -> Result<T, MeshError> {
        let tok = self
            .next()
            .ok_or_else(|| self.error(format!("unexpected end of file, expected {what}")))?;
        tok.parse()
            .map_err(|_| self.error(format!("expected {what}, found '{tok}'")))
    }

    fn skip(&mut self, n: usize) -> Result<(), MeshError> {
        for _ in 0..n {
            self.next()
                .ok_or_else(|| self.error("unexpected end of file"))?;
        }
        Ok(())
    }
}

/// Number of values per entity in sections this reader does not use.
fn skipped_section_width(keyword: &str) -> Option<usize> {
    match keyword {
        "Edges" => Some(3),
        "Triangles" => Some(4),
        "Quadrilaterals" => Some(5),
        "Hexahedra" => Some(9),
        "Corners" | "RequiredVertices" | "Ridges" => Some(1),
        _ => None,
    }
}

pub fn parse_medit(src: &str) -> Result<Mesh, MeshError> {
    let mut tokens = Tokens::new(src);
    let mut dimension = 3;
    let mut positions = Vec::new();
    let mut connectivity = Vec::new();
    let mut groups = Vec::new();

    while let Some(keyword) = tokens.next() {
        match keyword {
            "MeshVersionFormatted" => {
                let _: u32 = tokens.value("format version")?;
            }
            "Dimension" => {
                dimension = tokens.value("dimension")?;
                if dimension != 3 {
                    return Err(tokens.error(format!("only 3D meshes are supported, got {dimension}")));
                }
            }
            "Vertices" => {
                let n: usize = tokens.value("vertex count")?;
                // the count is untrusted input, cap the allocation by the file size
                positions.reserve(n.min(src.len()));
                for _ in 0..n {
                    let mut p = [0.0; 3];
                    for c in p.iter_mut().take(dimension) {
                        *c = tokens.value("coordinate")?;
                    }
                    let _: i64 = tokens.value("vertex reference")?;
                    positions.push(DVec3::from_array(p));
                }
            }
            "Tetrahedra" => {
                let n: usize = tokens.value("tetrahedron count")?;
                connectivity.reserve(n.min(src.len()));
                for _ in 0..n {
                    let mut tet = [0usize; 4];
                    for v in &mut tet {
                        let one_based: usize = tokens.value("vertex index")?;
                        *v = one_based
                            .checked_sub(1)
                            .ok_or_else(|| tokens.error("vertex indices are 1-based"))?;
                    }
                    connectivity.push(tet);
                    groups.push(tokens.value("cell group")?);
                }
            }
            "End" => break,
            other => match skipped_section_width(other) {
                Some(width) => {
                    let n: usize = tokens.value("entity count")?;
                    let values = n
                        .checked_mul(width)
                        .ok_or_else(|| tokens.error(format!("{other} count {n} is too large")))?;
                    tokens.skip(values)?;
                }
                None => return Err(tokens.error(format!("unknown section '{other}'"))),
            },
        }
    }

    debug!(
        vertices = positions.len(),
        cells = connectivity.len(),
        "parsed medit mesh"
    );
    Mesh::new(positions, connectivity, groups)
}

pub fn read_medit(path: &Path) -> Result<Mesh, MeshError> {
    let src = std::fs::read_to_string(path).map_err(|source| MeshError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_medit(&src)
}

pub fn write_medit<W: Write>(mesh: &Mesh, out: &mut W) -> io::Result<()> {
    writeln!(out, "MeshVersionFormatted 1")?;
    writeln!(out, "Dimension 3")?;
    writeln!(out, "Vertices")?;
    writeln!(out, "{}", mesh.nodes.len())?;
    for node in &mesh.nodes {
        let p = node.position;
        writeln!(out, "{} {} {} 0", p.x, p.y, p.z)?;
    }
    writeln!(out, "Tetrahedra")?;
    writeln!(out, "{}", mesh.cells.len())?;
    for cell in &mesh.cells {
        let [a, b, c, d] = cell.vertices.map(|v| v + 1);
        writeln!(out, "{a} {b} {c} {d} {}", cell.group)?;
    }
    writeln!(out, "End")
}

pub fn save_medit(mesh: &Mesh, path: &Path) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_medit(mesh, &mut out)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::generator::create_box_mesh;

    const TET: &str = "MeshVersionFormatted 1
# a single tetrahedron
Dimension
3
Vertices
4
0 0 0 0
1 0 0 0
0 1 0 0
0 0 1 0
Triangles
1
1 2 3 5
Tetrahedra
1
1 2 3 4 2
End
";

    #[test]
    fn parses_sections_and_skips_unused_ones() {
        let mesh = parse_medit(TET).unwrap();
        assert_eq!(mesh.nodes.len(), 4);
        assert_eq!(mesh.cells[0].vertices, [0, 1, 2, 3]);
        assert_eq!(mesh.cells[0].group, 2);
    }

    #[test]
    fn written_mesh_reads_back() {
        let mesh = create_box_mesh(DVec3::ZERO, DVec3::new(0.1, 0.02, 0.02), [3, 1, 1]).unwrap();
        let mut buf = Vec::new();
        write_medit(&mesh, &mut buf).unwrap();
        let back = parse_medit(std::str::from_utf8(&buf).unwrap()).unwrap();
        assert_eq!(back.nodes.len(), mesh.nodes.len());
        assert_eq!(back.cells.len(), mesh.cells.len());
        assert_eq!(back.nodes[5].position, mesh.nodes[5].position);
    }

    #[test]
    fn reports_line_of_bad_token() {
        let broken = TET.replace("1 0 0 0\n0 1", "1 zero 0 0\n0 1");
        let err = parse_medit(&broken).unwrap_err();
        assert!(matches!(err, MeshError::Parse { line: 8, .. }));
    }

    #[test]
    fn oversized_counts_are_parse_errors() {
        let huge = usize::MAX.to_string();
        let vertices = TET.replace("Vertices\n4", &format!("Vertices\n{huge}"));
        assert!(matches!(parse_medit(&vertices), Err(MeshError::Parse { .. })));

        let tets = TET.replace("Tetrahedra\n1", &format!("Tetrahedra\n{huge}"));
        assert!(matches!(parse_medit(&tets), Err(MeshError::Parse { .. })));

        let skipped = TET.replace("Triangles\n1", &format!("Triangles\n{huge}"));
        let err = parse_medit(&skipped).unwrap_err();
        assert!(err.to_string().contains("too large"), "{err}");
    }

    #[test]
    fn rejects_zero_vertex_index() {
        let broken = TET.replace("1 2 3 4 2", "0 2 3 4 2");
        assert!(parse_medit(&broken).is_err());
    }
}
