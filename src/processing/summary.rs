use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use glam::DVec3;
use tracing::info;

use crate::problem::RegionKind;
use crate::simulation::{Simulation, SimulationResult};

pub struct RegionSummary {
    pub name: String,
    pub kind: RegionKind,
    pub vertices: usize,
    pub cells: usize,
    pub facets: usize,
}

pub struct SimulationSummary {
    pub problem: String,

    // Mesh info
    pub num_cells: usize,
    pub num_nodes: usize,
    pub num_boundary_facets: usize,
    pub bounding_box: (DVec3, DVec3),
    pub edge_lengths: (f64, f64),
    pub total_volume: f64,

    pub regions: Vec<RegionSummary>,

    // Solver info
    pub nonlinear_solver: String,
    pub linear_solver: String,
    pub i_max: u32,
    pub eps_a: f64,

    // Result
    pub variable: String,
    pub free_dofs: usize,
    pub fixed_dofs: usize,
    pub iterations: u32,
    pub final_residual: f64,
    pub value_range: (f64, f64),
}

impl SimulationSummary {
    pub fn new(sim: &Simulation, result: &SimulationResult) -> Self {
        let mesh = sim.mesh();
        let regions = sim
            .regions()
            .values()
            .map(|r| RegionSummary {
                name: r.name.clone(),
                kind: r.kind,
                vertices: r.vertices.len(),
                cells: r.cells.len(),
                facets: r.facets.len(),
            })
            .collect();
        let problem = sim.problem();
        Self {
            problem: problem.name().to_string(),
            num_cells: mesh.cells.len(),
            num_nodes: mesh.nodes.len(),
            num_boundary_facets: mesh.facets.len(),
            bounding_box: mesh.bounding_box(),
            edge_lengths: mesh.edge_length_range(),
            total_volume: mesh.total_volume(),
            regions,
            nonlinear_solver: format!(
                "{} ({})",
                problem.options().nls,
                problem.nonlinear_solver().kind_name()
            ),
            linear_solver: format!("{} ({})", problem.options().ls, sim.linear_solver().name()),
            i_max: sim.newton().params.i_max,
            eps_a: sim.newton().params.eps_a,
            variable: result.variable.clone(),
            free_dofs: result.n_free,
            fixed_dofs: result.n_fixed,
            iterations: result.iterations,
            final_residual: result.final_residual,
            value_range: result.range(),
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", "=".repeat(60))?;
        writeln!(out, "SIMULATION SUMMARY: {}", self.problem)?;
        writeln!(out, "{}", "=".repeat(60))?;
        writeln!(out)?;

        writeln!(out, "MESH STATISTICS")?;
        writeln!(out, "{}", "-".repeat(60))?;
        writeln!(out, "Number of cells:     {}", self.num_cells)?;
        writeln!(out, "Number of nodes:     {}", self.num_nodes)?;
        writeln!(out, "Boundary facets:     {}", self.num_boundary_facets)?;
        let (lo, hi) = self.bounding_box;
        writeln!(
            out,
            "Bounding box:        [{:.6e}, {:.6e}, {:.6e}] to [{:.6e}, {:.6e}, {:.6e}]",
            lo.x, lo.y, lo.z, hi.x, hi.y, hi.z
        )?;
        writeln!(
            out,
            "Edge lengths:        {:.6e} to {:.6e}",
            self.edge_lengths.0, self.edge_lengths.1
        )?;
        writeln!(out, "Total volume:        {:.6e}", self.total_volume)?;
        writeln!(out)?;

        writeln!(out, "REGIONS")?;
        writeln!(out, "{}", "-".repeat(60))?;
        for r in &self.regions {
            writeln!(
                out,
                "{:<20} {:<7} {:>7} vertices {:>7} cells {:>7} facets",
                r.name, r.kind, r.vertices, r.cells, r.facets
            )?;
        }
        writeln!(out)?;

        writeln!(out, "SOLVER")?;
        writeln!(out, "{}", "-".repeat(60))?;
        writeln!(out, "Nonlinear solver:    {}", self.nonlinear_solver)?;
        writeln!(out, "Linear solver:       {}", self.linear_solver)?;
        writeln!(out, "i_max / eps_a:       {} / {:.1e}", self.i_max, self.eps_a)?;
        writeln!(out, "Free DOFs:           {}", self.free_dofs)?;
        writeln!(out, "Fixed DOFs:          {}", self.fixed_dofs)?;
        writeln!(out, "Iterations:          {}", self.iterations)?;
        writeln!(out, "Final residual:      {:.6e}", self.final_residual)?;
        writeln!(out)?;

        writeln!(out, "RESULT")?;
        writeln!(out, "{}", "-".repeat(60))?;
        writeln!(
            out,
            "{} range:{:>width$}{:.6e} to {:.6e}",
            self.variable,
            "",
            self.value_range.0,
            self.value_range.1,
            width = 14usize.saturating_sub(self.variable.len())
        )?;
        writeln!(out, "{}", "=".repeat(60))?;
        Ok(())
    }

    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = BufWriter::new(File::create(path)?);
        self.write_to(&mut file)?;
        file.flush()
    }

    pub fn log(&self) {
        info!(
            problem = %self.problem,
            cells = self.num_cells,
            nodes = self.num_nodes,
            iterations = self.iterations,
            residual = self.final_residual,
            min = self.value_range.0,
            max = self.value_range.1,
            "{} solved",
            self.variable
        );
    }
}
