use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use glam::DVec3;
use heatfem_rs::discretization::generator::create_box_mesh;
use heatfem_rs::models::temperature::{analytic_temperature, cylinder_mesh, temperature_problem};
use heatfem_rs::numerics::solver::SolverError;
use heatfem_rs::problem::solver::IterativeParams;
use heatfem_rs::problem::{
    EssentialBc, FieldDef, IntegralDef, Material, NewtonParams, Options, ProblemBuilder,
    RegionKind, SolverConf, VariableDef,
};
use heatfem_rs::processing::csv_writer::{write_history, write_solution};
use heatfem_rs::processing::summary::SimulationSummary;
use heatfem_rs::{ProblemDescription, RunConfig, Simulation, SimulationError};

fn assert_matches_profile(sim: &Simulation, values: &[f64], exact: impl Fn(DVec3) -> f64, tol: f64) {
    for (node, &t) in sim.mesh().nodes.iter().zip(values) {
        let expected = exact(node.position);
        assert!(
            (t - expected).abs() < tol,
            "t({:?}) = {t}, expected {expected}",
            node.position
        );
    }
}

#[test]
fn cylinder_reproduces_the_linear_profile() {
    let sim = Simulation::new(temperature_problem().unwrap(), cylinder_mesh().unwrap()).unwrap();
    let res = sim.solve().unwrap();

    assert_eq!(res.variable, "t");
    assert_eq!(res.iterations, 1);
    assert!(res.final_residual < 1e-10);
    assert_eq!(res.n_fixed, 50);
    assert_eq!(res.n_free + res.n_fixed, sim.mesh().nodes.len());
    assert_matches_profile(&sim, res.values.as_slice(), |p| analytic_temperature(p.x), 1e-8);

    let (lo, hi) = res.range();
    assert_relative_eq!(lo, -2.0, epsilon = 1e-12);
    assert_relative_eq!(hi, 2.0, epsilon = 1e-12);

    // first record is the initial residual, the last one the converged state
    assert_eq!(res.history.len(), 2);
    assert!(res.history[0].linear_residual.is_some());
    assert!(res.history[1].linear_residual.is_none());
}

#[test]
fn shipped_data_gives_the_same_solution() {
    let config = RunConfig {
        data_dir: Path::new(env!("CARGO_MANIFEST_DIR")).join("data"),
        ..RunConfig::default()
    };
    let problem =
        ProblemDescription::from_file(Path::new(env!("CARGO_MANIFEST_DIR")).join("problems/temperature.json"))
            .unwrap();
    let sim = Simulation::load(problem, &config).unwrap();
    let res = sim.solve().unwrap();
    assert_eq!(res.iterations, 1);
    assert_matches_profile(&sim, res.values.as_slice(), |p| analytic_temperature(p.x), 1e-8);
}

#[test]
fn conjugate_gradients_reach_the_same_profile() {
    let problem = ProblemBuilder::new("temperature_cg")
        .mesh("meshes/3d/cylinder.mesh")
        .material("coef", Material::new().with("val", 1.0))
        .region("Omega", "all", RegionKind::Cell)
        .region("Gamma_Left", "vertices in (x < 0.00001)", RegionKind::Facet)
        .region("Gamma_Right", "vertices in (x > 0.099999)", RegionKind::Facet)
        .field("temperature", FieldDef::scalar("Omega", 1))
        .variable("t", VariableDef::unknown("temperature"))
        .variable("s", VariableDef::test("temperature", "t"))
        .ebc("t1", EssentialBc::new("Gamma_Left").fix("t.0".parse().unwrap(), 2.0))
        .ebc("t2", EssentialBc::new("Gamma_Right").fix("t.0".parse().unwrap(), -2.0))
        .integral("i1", IntegralDef::volume(2))
        .equation("Temperature", "dw_laplace.i1.Omega( coef.val, s, t ) = 0")
        .solver(
            "ls",
            SolverConf::Iterative(IterativeParams {
                i_max: 1000,
                eps_a: 1e-14,
                eps_r: 1e-13,
                ..IterativeParams::default()
            }),
        )
        .solver(
            "newton",
            SolverConf::Newton(NewtonParams {
                i_max: 3,
                ..NewtonParams::default()
            }),
        )
        .options(Options::new("newton", "ls"))
        .build()
        .unwrap();

    let sim = Simulation::new(problem, cylinder_mesh().unwrap()).unwrap();
    assert_eq!(sim.linear_solver().name(), "ls.scipy_iterative");
    let res = sim.solve().unwrap();
    assert!(res.iterations >= 1);
    assert_matches_profile(&sim, res.values.as_slice(), |p| analytic_temperature(p.x), 1e-8);
}

fn slab(equation: &str) -> ProblemBuilder {
    ProblemDescription::builder("slab")
        .mesh("slab.mesh")
        .material("m", Material::new().with("c", 1.0).with("f", 2.0).with("g", 3.0))
        .region("Omega", "all", RegionKind::Cell)
        .region("Left", "vertices in (x < 1e-9)", RegionKind::Facet)
        .region("Right", "vertices in (x > 0.999999)", RegionKind::Facet)
        .field("temperature", FieldDef::scalar("Omega", 1))
        .variable("t", VariableDef::unknown("temperature"))
        .variable("s", VariableDef::test("temperature", "t"))
        .ebc("left", EssentialBc::new("Left").fix("t.0".parse().unwrap(), 0.0))
        .integral("i", IntegralDef::volume(2))
        .integral("is", IntegralDef::surface(2))
        .equation("balance", equation)
        .solver("ls", SolverConf::Direct(Default::default()))
        .solver("newton", SolverConf::Newton(Default::default()))
        .options(Options::new("newton", "ls"))
}

fn slab_mesh() -> heatfem_rs::discretization::mesh::Mesh {
    create_box_mesh(DVec3::ZERO, DVec3::new(1.0, 0.5, 0.5), [8, 2, 2]).unwrap()
}

#[test]
fn volume_source_gives_the_parabola_at_nodes() {
    // -t'' = 2 with t(0) = t(1) = 0
    let problem = slab("dw_laplace.i.Omega(m.c, s, t) = dw_volume_lvf.i.Omega(m.f, s)")
        .ebc("right", EssentialBc::new("Right").fix("t.0".parse().unwrap(), 0.0))
        .build()
        .unwrap();
    let sim = Simulation::new(problem, slab_mesh()).unwrap();
    let res = sim.solve().unwrap();
    assert_eq!(res.iterations, 1);
    assert_matches_profile(&sim, res.values.as_slice(), |p| p.x * (1.0 - p.x), 1e-10);
}

#[test]
fn surface_flux_sets_the_slope() {
    // t' = 3 on the right end, t(0) = 0
    let problem = slab("dw_laplace.i.Omega(m.c, s, t) = dw_surface_integrate.is.Right(m.g, s)")
        .build()
        .unwrap();
    let sim = Simulation::new(problem, slab_mesh()).unwrap();
    let res = sim.solve().unwrap();
    assert_matches_profile(&sim, res.values.as_slice(), |p| 3.0 * p.x, 1e-10);
}

#[test]
fn newton_without_iterations_reports_nonconvergence() {
    let problem = slab("dw_laplace.i.Omega(m.c, s, t) = dw_volume_lvf.i.Omega(m.f, s)")
        .solver(
            "newton0",
            SolverConf::Newton(NewtonParams {
                i_max: 0,
                ..NewtonParams::default()
            }),
        )
        .options(Options::new("newton0", "ls"))
        .build();
    // options were set twice, the later call wins
    let sim = Simulation::new(problem.unwrap(), slab_mesh()).unwrap();
    assert!(matches!(
        sim.solve(),
        Err(SimulationError::Solver(SolverError::NonConvergence { iterations: 0, .. }))
    ));
}

#[test]
fn results_and_summary_are_written() {
    let sim = Simulation::new(temperature_problem().unwrap(), cylinder_mesh().unwrap()).unwrap();
    let res = sim.solve().unwrap();
    let dir = tempfile::tempdir().unwrap();

    write_solution(dir.path().join("solution.csv"), sim.mesh(), &res).unwrap();
    write_history(dir.path().join("newton_history.csv"), &res.history).unwrap();
    let summary = SimulationSummary::new(&sim, &res);
    summary.write_to_file(dir.path().join("summary.txt")).unwrap();

    let solution = fs::read_to_string(dir.path().join("solution.csv")).unwrap();
    assert!(solution.starts_with("x,y,z,t\n"));
    assert_eq!(solution.lines().count(), sim.mesh().nodes.len() + 1);

    let history = fs::read_to_string(dir.path().join("newton_history.csv")).unwrap();
    assert_eq!(history.lines().count(), 3);

    let text = fs::read_to_string(dir.path().join("summary.txt")).unwrap();
    assert!(text.contains("SIMULATION SUMMARY: temperature"));
    assert!(text.contains("Gamma_Left"));
    assert!(text.contains("Iterations:          1"));
    assert_eq!(summary.fixed_dofs, 50);
}
