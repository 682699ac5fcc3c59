use std::fs;
use std::path::Path;

use heatfem_rs::discretization::mesh::MeshError;
use heatfem_rs::discretization::regions::RegionError;
use heatfem_rs::models::temperature::cylinder_mesh;
use heatfem_rs::physics::bc::BcError;
use heatfem_rs::problem::{Issue, ProblemError, Section};
use heatfem_rs::{ProblemDescription, RunConfig, Simulation, SimulationError};

fn temperature_json() -> String {
    fs::read_to_string(Path::new(env!("CARGO_MANIFEST_DIR")).join("problems/temperature.json"))
        .unwrap()
}

fn load(json: &str) -> Result<ProblemDescription, ProblemError> {
    ProblemDescription::from_json_str("temperature", json)
}

#[test]
fn unresolved_references_are_all_reported() {
    let json = temperature_json()
        .replace(r#""t1": ["Gamma_Left""#, r#""t1": ["Gamma_Top""#)
        .replace("dw_laplace.i1.Omega", "dw_laplace.i2.Omega");
    let err = load(&json).unwrap_err();
    let issues = err.issues();
    assert_eq!(issues.len(), 2, "{err}");
    assert!(issues.contains(&Issue::Unresolved {
        section: Section::Ebc,
        owner: "t1".into(),
        expected: Section::Region,
        name: "Gamma_Top".into(),
    }));
    assert!(issues.contains(&Issue::Unresolved {
        section: Section::Equation,
        owner: "Temperature".into(),
        expected: Section::Integral,
        name: "i2".into(),
    }));
}

#[test]
fn swapped_solver_roles_are_invalid() {
    let json = temperature_json().replace(
        r#""nls": "newton", "ls": "ls""#,
        r#""nls": "ls", "ls": "newton""#,
    );
    let err = load(&json).unwrap_err();
    assert_eq!(err.issues().len(), 2, "{err}");
    assert!(err.issues().iter().all(|i| matches!(
        i,
        Issue::Invalid {
            section: Section::Options,
            ..
        }
    )));
}

#[test]
fn line_search_that_cannot_shrink_is_rejected() {
    let json = temperature_json().replace(
        r#""eps_a": 1e-10"#,
        r#""eps_a": 1e-10, "ls_on": 0.0, "ls_red": 1.0"#,
    );
    let err = load(&json).unwrap_err();
    assert!(matches!(err, ProblemError::Invalid(_)), "{err}");
    assert_eq!(err.issues().len(), 2, "{err}");
    assert!(err.issues().iter().all(|i| matches!(
        i,
        Issue::Invalid { section: Section::Solver, owner, .. } if owner == "newton"
    )));
}

#[test]
fn malformed_selector_names_the_region() {
    let json = temperature_json().replace("x < 0.00001", "x <");
    let err = load(&json).unwrap_err();
    assert!(
        matches!(&err, ProblemError::Expression { section: Section::Region, name, .. } if name == "Gamma_Left"),
        "{err}"
    );
}

#[test]
fn malformed_json_is_rejected() {
    assert!(matches!(load("{ \"filename_mesh\": "), Err(ProblemError::Json(_))));
}

#[test]
fn missing_problem_file_is_an_io_error() {
    let err = ProblemDescription::from_file("no/such/problem.json").unwrap_err();
    assert!(matches!(err, ProblemError::Io { .. }));
}

#[test]
fn missing_mesh_file_fails_loading() {
    let problem = load(&temperature_json()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        data_dir: dir.path().to_path_buf(),
        ..RunConfig::default()
    };
    assert!(matches!(
        Simulation::load(problem, &config),
        Err(SimulationError::Mesh(MeshError::Io { .. }))
    ));
}

#[test]
fn overlapping_boundary_values_conflict() {
    let json = temperature_json()
        .replace("x < 0.00001", "x < 0.06")
        .replace("x > 0.099999", "x > 0.04");
    let problem = load(&json).unwrap();
    let err = Simulation::new(problem, cylinder_mesh().unwrap()).err();
    assert!(
        matches!(err, Some(SimulationError::Bc(BcError::Conflict { .. }))),
        "{err:?}"
    );
}

#[test]
fn selector_matching_nothing_is_an_empty_region() {
    let json = temperature_json().replace("x > 0.099999", "x > 0.2");
    let problem = load(&json).unwrap();
    let err = Simulation::new(problem, cylinder_mesh().unwrap()).err();
    assert!(
        matches!(&err, Some(SimulationError::Region(RegionError::Empty(name))) if name == "Gamma_Right"),
        "{err:?}"
    );
}
