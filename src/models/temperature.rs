//! Steady heat conduction along a cylinder with fixed end temperatures.
//!
//! The cylinder spans `0 <= x <= 0.1` and the ends are held at `2` and `-2`,
//! so the exact temperature is the linear profile `t = 2 - 40 x`.

use crate::discretization::generator::create_cylinder_mesh;
use crate::discretization::mesh::{Mesh, MeshError};
use crate::problem::{
    EssentialBc, FieldDef, IntegralDef, Material, NewtonParams, Options, ProblemDescription,
    ProblemError, RegionKind, SolverConf, VariableDef,
};

pub const LENGTH: f64 = 0.1;
pub const RADIUS: f64 = 0.01;
pub const LEFT_TEMPERATURE: f64 = 2.0;
pub const RIGHT_TEMPERATURE: f64 = -2.0;
pub const MESH_PATH: &str = "meshes/3d/cylinder.mesh";

/// Exact solution at axial position `x`.
pub fn analytic_temperature(x: f64) -> f64 {
    LEFT_TEMPERATURE + (RIGHT_TEMPERATURE - LEFT_TEMPERATURE) * x / LENGTH
}

pub fn temperature_problem() -> Result<ProblemDescription, ProblemError> {
    ProblemDescription::builder("temperature")
        .mesh(MESH_PATH)
        .material("coef", Material::new().with("val", 1.0))
        .region("Omega", "all", RegionKind::Cell)
        .region("Gamma_Left", "vertices in (x < 0.00001)", RegionKind::Facet)
        .region("Gamma_Right", "vertices in (x > 0.099999)", RegionKind::Facet)
        .field("temperature", FieldDef::scalar("Omega", 1))
        .variable("t", VariableDef::unknown("temperature"))
        .variable("s", VariableDef::test("temperature", "t"))
        .ebc(
            "t1",
            EssentialBc::new("Gamma_Left").fix("t.0".parse().map_err(entry_error)?, LEFT_TEMPERATURE),
        )
        .ebc(
            "t2",
            EssentialBc::new("Gamma_Right")
                .fix("t.0".parse().map_err(entry_error)?, RIGHT_TEMPERATURE),
        )
        .integral("i1", IntegralDef::volume(2))
        .equation("Temperature", "dw_laplace.i1.Omega( coef.val, s, t ) = 0")
        .solver("ls", SolverConf::Direct(Default::default()))
        .solver(
            "newton",
            SolverConf::Newton(NewtonParams {
                i_max: 1,
                eps_a: 1e-10,
                ..NewtonParams::default()
            }),
        )
        .options(Options::new("newton", "ls"))
        .build()
}

fn entry_error(message: String) -> ProblemError {
    ProblemError::Entry {
        section: crate::problem::Section::Ebc,
        name: "t".to_string(),
        message,
    }
}

/// The mesh shipped as `data/meshes/3d/cylinder.mesh`.
pub fn cylinder_mesh() -> Result<Mesh, MeshError> {
    create_cylinder_mesh(LENGTH, RADIUS, 10, 4)
}
