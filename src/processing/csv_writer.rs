use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::discretization::mesh::Mesh;
use crate::numerics::solver::IterationRecord;
use crate::simulation::SimulationResult;

/// Write data to CSV file with headers
pub fn write_csv<P: AsRef<Path>>(path: P, headers: &[&str], data: &[Vec<f64>]) -> io::Result<()> {
    if !headers.is_empty() && !data.is_empty() && headers.len() != data.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Headers count ({}) doesn't match data columns ({})",
                headers.len(),
                data.len()
            ),
        ));
    }

    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "{}", headers.join(","))?;

    let n_rows = data.iter().map(|col| col.len()).max().unwrap_or(0);

    for i in 0..n_rows {
        let row: Vec<String> = data
            .iter()
            .map(|col| {
                if i < col.len() {
                    format!("{:.15e}", col[i])
                } else {
                    String::new()
                }
            })
            .collect();
        writeln!(file, "{}", row.join(","))?;
    }

    file.flush()
}

/// Write x-y data pairs
pub fn write_xy<P: AsRef<Path>>(
    path: P,
    x_header: &str,
    y_header: &str,
    x_data: &[f64],
    y_data: &[f64],
) -> io::Result<()> {
    if x_data.len() != y_data.len() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "X and Y data lengths don't match ({} vs {})",
                x_data.len(),
                y_data.len()
            ),
        ));
    }
    write_csv(
        path,
        &[x_header, y_header],
        &[x_data.to_vec(), y_data.to_vec()],
    )
}

/// Vertex coordinates and the nodal solution, one row per vertex.
pub fn write_solution<P: AsRef<Path>>(
    path: P,
    mesh: &Mesh,
    result: &SimulationResult,
) -> io::Result<()> {
    let column = |f: fn(&glam::DVec3) -> f64| -> Vec<f64> {
        mesh.nodes.iter().map(|n| f(&n.position)).collect()
    };
    write_csv(
        path,
        &["x", "y", "z", result.variable.as_str()],
        &[
            column(|p| p.x),
            column(|p| p.y),
            column(|p| p.z),
            result.values.as_slice().to_vec(),
        ],
    )
}

/// Newton residual history. Iterations without a linear solve leave the last
/// column empty.
pub fn write_history<P: AsRef<Path>>(path: P, history: &[IterationRecord]) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "iter,residual,relative,step,linear_residual")?;
    for rec in history {
        let linear = rec
            .linear_residual
            .map(|r| format!("{r:.15e}"))
            .unwrap_or_default();
        writeln!(
            file,
            "{},{:.15e},{:.15e},{},{}",
            rec.iteration, rec.residual, rec.relative, rec.step, linear
        )?;
    }
    file.flush()
}
