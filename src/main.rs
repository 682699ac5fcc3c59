use std::fs;

use anyhow::Context;
use heatfem_rs::models::temperature::{cylinder_mesh, temperature_problem};
use heatfem_rs::processing::csv_writer;
use heatfem_rs::processing::summary::SimulationSummary;
use heatfem_rs::{ProblemDescription, RunConfig, Simulation};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let config = RunConfig::from_args(std::env::args().skip(1))
        .context("usage: heatfem [PROBLEM.json] [--data-dir DIR] [--output-dir DIR]")?;

    let sim = match &config.problem {
        Some(path) => {
            let problem = ProblemDescription::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?;
            Simulation::load(problem, &config)?
        }
        None => {
            let problem = temperature_problem()?;
            let mesh_path = problem.mesh().resolve(&config.data_dir);
            if mesh_path.exists() {
                Simulation::load(problem, &config)?
            } else {
                info!(mesh = %mesh_path.display(), "mesh file not found, generating the cylinder");
                Simulation::new(problem, cylinder_mesh()?)?
            }
        }
    };

    let result = sim.solve()?;

    let out_dir = config.output_dir_for(sim.problem());
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    csv_writer::write_solution(out_dir.join("solution.csv"), sim.mesh(), &result)?;
    csv_writer::write_history(out_dir.join("newton_history.csv"), &result.history)?;

    // values along the axis, sorted by x
    let mut profile: Vec<(f64, f64)> = sim
        .mesh()
        .nodes
        .iter()
        .zip(result.values.iter())
        .map(|(n, &v)| (n.position.x, v))
        .collect();
    profile.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (x, values): (Vec<f64>, Vec<f64>) = profile.into_iter().unzip();
    csv_writer::write_xy(out_dir.join("profile.csv"), "x", &result.variable, &x, &values)?;

    let summary = SimulationSummary::new(&sim, &result);
    summary.write_to_file(out_dir.join("summary.txt"))?;
    summary.log();

    info!(output = %out_dir.display(), "results written");
    Ok(())
}
