use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use heatfem_rs::discretization::medit::read_medit;
use heatfem_rs::discretization::regions::evaluate_regions;
use heatfem_rs::models::temperature::{
    LENGTH, MESH_PATH, RADIUS, cylinder_mesh, temperature_problem,
};
use heatfem_rs::problem::{RegionKind, SolverConf};
use heatfem_rs::ProblemDescription;

fn root() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
}

fn data_dir() -> PathBuf {
    root().join("data")
}

#[test]
fn json_file_matches_builtin_problem() {
    let loaded = ProblemDescription::from_file(root().join("problems/temperature.json")).unwrap();
    let built = temperature_problem().unwrap();
    assert_eq!(loaded, built);
}

#[test]
fn every_reference_resolves() {
    let p = temperature_problem().unwrap();

    assert_eq!(p.mesh().path(), Path::new(MESH_PATH));
    for field in p.fields().values() {
        assert!(p.regions().contains_key(&field.region));
    }
    for variable in p.variables().values() {
        assert!(p.fields().contains_key(variable.field()));
    }
    for ebc in p.ebcs().values() {
        assert!(p.regions().contains_key(&ebc.region));
        for (dof, _) in &ebc.dofs {
            assert!(p.variables()[&dof.variable].is_unknown());
        }
    }
    for eq in p.equations().values() {
        for term in eq.terms() {
            assert!(p.integrals().contains_key(&term.integral));
            assert!(p.regions().contains_key(&term.region));
        }
    }
    assert!(matches!(p.solvers()[&p.options().nls], SolverConf::Newton(_)));
    assert!(p.solvers()[&p.options().ls].is_linear());
}

#[test]
fn shipped_mesh_is_the_generated_cylinder() {
    let path = temperature_problem().unwrap().mesh().resolve(&data_dir());
    let shipped = read_medit(&path).unwrap();
    let generated = cylinder_mesh().unwrap();

    assert_eq!(shipped.nodes.len(), generated.nodes.len());
    assert_eq!(shipped.cells.len(), generated.cells.len());
    for (a, b) in shipped.nodes.iter().zip(&generated.nodes) {
        assert_relative_eq!(a.position.x, b.position.x, epsilon = 1e-15);
        assert_relative_eq!(a.position.y, b.position.y, epsilon = 1e-15);
        assert_relative_eq!(a.position.z, b.position.z, epsilon = 1e-15);
    }
    for (a, b) in shipped.cells.iter().zip(&generated.cells) {
        assert_eq!(a.vertices, b.vertices);
    }

    let (lo, hi) = shipped.bounding_box();
    assert_relative_eq!(lo.x, 0.0);
    assert_relative_eq!(hi.x, LENGTH);
    assert_relative_eq!(hi.y, RADIUS, epsilon = 1e-15);
    assert_relative_eq!(lo.z, -RADIUS, epsilon = 1e-15);
}

#[test]
fn end_regions_are_disjoint_facet_sets() {
    let p = temperature_problem().unwrap();
    let mesh = read_medit(&p.mesh().resolve(&data_dir())).unwrap();
    let regions = evaluate_regions(p.regions(), &mesh).unwrap();

    let left = &regions["Gamma_Left"];
    let right = &regions["Gamma_Right"];
    assert_eq!(left.kind, RegionKind::Facet);
    assert_eq!(right.kind, RegionKind::Facet);
    assert!(!left.facets.is_empty());
    assert!(!right.facets.is_empty());
    assert!(left.vertices.iter().all(|&v| !right.contains_vertex(v)));

    // each end disc is a full cross-section of the 5x5 vertex grid
    assert_eq!(left.vertices.len(), 25);
    assert_eq!(right.vertices.len(), 25);
    assert!(left
        .vertices
        .iter()
        .all(|&v| mesh.nodes[v].position.x == 0.0));
    assert!(right
        .vertices
        .iter()
        .all(|&v| mesh.nodes[v].position.x == LENGTH));

    let omega = &regions["Omega"];
    assert_eq!(omega.cells.len(), mesh.cells.len());
    assert_eq!(omega.vertices.len(), mesh.nodes.len());
}
