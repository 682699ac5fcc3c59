//! From a validated problem description to a solved nodal field.

use nalgebra::DVector;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::discretization::medit::read_medit;
use crate::discretization::mesh::{Mesh, MeshError};
use crate::discretization::regions::{RegionError, RegionMap, evaluate_regions};
use crate::numerics::linear::{self, LinearSolver};
use crate::numerics::solver::{IterationRecord, NewtonSolver, SolverError};
use crate::physics::PhysicsModel;
use crate::physics::assembly::{Conductivity, WeakForm, WeakTerm};
use crate::physics::bc::{BCRegistry, BcError};
use crate::physics::dofs::DofMap;
use crate::physics::model::HeatModel;
use crate::physics::quadrature::{MAX_ORDER, TetrahedronRule, TriangleRule};
use crate::problem::{
    Coefficient, DataType, ProblemDescription, ProblemError, TermArg, TermCall, TermKind,
};

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Region(#[from] RegionError),
    #[error(transparent)]
    Bc(#[from] BcError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error("unsupported problem: {0}")]
    Unsupported(String),
}

fn unsupported(msg: impl Into<String>) -> SimulationError {
    SimulationError::Unsupported(msg.into())
}

pub struct SimulationResult {
    /// Name of the solved unknown variable.
    pub variable: String,
    /// Nodal values, one per mesh vertex.
    pub values: DVector<f64>,
    pub iterations: u32,
    pub final_residual: f64,
    pub history: Vec<IterationRecord>,
    pub n_free: usize,
    pub n_fixed: usize,
}

impl SimulationResult {
    pub fn range(&self) -> (f64, f64) {
        (self.values.min(), self.values.max())
    }
}

/// A problem bound to a mesh, ready to solve.
///
/// Supports a single scalar real unknown with linear approximation and a
/// single equation made of `dw_laplace`, `dw_volume_lvf` and
/// `dw_surface_integrate` terms.
pub struct Simulation {
    problem: ProblemDescription,
    mesh: Mesh,
    regions: RegionMap,
    unknown: String,
    model: HeatModel,
    newton: NewtonSolver,
    linear: Box<dyn LinearSolver>,
}

impl Simulation {
    /// Read the problem's mesh from the data directory and set up the solve.
    pub fn load(problem: ProblemDescription, config: &RunConfig) -> Result<Self, SimulationError> {
        let path = problem.mesh().resolve(&config.data_dir);
        info!(mesh = %path.display(), "reading mesh");
        let mesh = read_medit(&path)?;
        Self::new(problem, mesh)
    }

    pub fn new(problem: ProblemDescription, mesh: Mesh) -> Result<Self, SimulationError> {
        info!(
            problem = problem.name(),
            vertices = mesh.nodes.len(),
            cells = mesh.cells.len(),
            "setting up simulation"
        );
        let regions = evaluate_regions(problem.regions(), &mesh)?;

        let unknowns: Vec<_> = problem.unknowns().collect();
        let [(unknown, variable)] = unknowns.as_slice() else {
            return Err(unsupported(format!(
                "exactly one unknown variable is supported, found {}",
                unknowns.len()
            )));
        };
        let unknown = unknown.to_string();
        let field = problem
            .fields()
            .get(variable.field())
            .ok_or_else(|| unsupported(format!("field '{}' is not declared", variable.field())))?;
        if field.dtype != DataType::Real || field.n_components != 1 || field.approx_order != 1 {
            return Err(unsupported(format!(
                "field '{}' must be a real scalar field of order 1, got {} with {} component(s) of order {}",
                variable.field(),
                field.dtype,
                field.n_components,
                field.approx_order
            )));
        }
        let support = &regions[&field.region];
        if support.vertices.len() != mesh.nodes.len() {
            return Err(unsupported(format!(
                "field region '{}' must cover the whole mesh",
                field.region
            )));
        }

        let mut equations = problem.equations().values();
        let (Some(equation), None) = (equations.next(), equations.next()) else {
            return Err(unsupported("exactly one equation is supported"));
        };
        let terms = equation
            .terms()
            .iter()
            .map(|term| weak_term(&problem, &regions, term))
            .collect::<Result<Vec<_>, _>>()?;

        let fixed = BCRegistry::from_ebcs(problem.ebcs()).constrained_dofs(&unknown, 1, &regions)?;
        if fixed.is_empty() {
            warn!(variable = %unknown, "no essential boundary conditions, the system may be singular");
        }
        let dofs = DofMap::new(mesh.nodes.len(), &fixed);
        info!(
            variable = %unknown,
            free = dofs.n_free(),
            fixed = dofs.n_fixed(),
            "degrees of freedom"
        );
        let model = HeatModel::new(WeakForm::new(&mesh, terms), dofs);

        let newton = NewtonSolver::from_conf(problem.nonlinear_solver()).ok_or_else(|| {
            unsupported(format!("'{}' is not a nonlinear solver", problem.options().nls))
        })?;
        let linear = linear::from_conf(problem.linear_solver()).ok_or_else(|| {
            unsupported(format!("'{}' is not a linear solver", problem.options().ls))
        })?;

        Ok(Self {
            problem,
            mesh,
            regions,
            unknown,
            model,
            newton,
            linear,
        })
    }

    pub fn solve(&self) -> Result<SimulationResult, SimulationError> {
        let dofs = self.model.dofs();
        let u0 = PhysicsModel::<f64>::initial_condition(&self.model, &self.mesh);
        let res = self
            .newton
            .solve(&self.model, &self.mesh, u0, self.linear.as_ref())?;
        let values = self.model.full_solution(&res.solution);
        info!(
            variable = %self.unknown,
            iterations = res.iterations,
            residual = res.final_residual,
            "solved"
        );
        Ok(SimulationResult {
            variable: self.unknown.clone(),
            values,
            iterations: res.iterations,
            final_residual: res.final_residual,
            history: res.history,
            n_free: dofs.n_free(),
            n_fixed: dofs.n_fixed(),
        })
    }

    pub fn problem(&self) -> &ProblemDescription {
        &self.problem
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn regions(&self) -> &RegionMap {
        &self.regions
    }

    pub fn model(&self) -> &HeatModel {
        &self.model
    }

    pub fn newton(&self) -> &NewtonSolver {
        &self.newton
    }

    pub fn linear_solver(&self) -> &dyn LinearSolver {
        self.linear.as_ref()
    }
}

fn weak_term(
    problem: &ProblemDescription,
    regions: &RegionMap,
    term: &TermCall,
) -> Result<WeakTerm, SimulationError> {
    let kind = term
        .kind()
        .ok_or_else(|| unsupported(format!("unknown term '{}'", term.name)))?;
    let order = problem
        .integrals()
        .get(&term.integral)
        .map(|i| i.order)
        .ok_or_else(|| unsupported(format!("integral '{}' is not declared", term.integral)))?;
    let region = regions
        .get(&term.region)
        .ok_or_else(|| unsupported(format!("region '{}' is not declared", term.region)))?;
    let coefficient = match term.args.first() {
        Some(TermArg::Material { material, param }) => problem
            .coefficient(material, param)
            .ok_or_else(|| unsupported(format!("material parameter '{material}.{param}' is not declared")))?,
        _ => return Err(unsupported(format!("term '{}' needs a material parameter first", term.name))),
    };
    let tet_rule = || {
        TetrahedronRule::tetrahedron(order)
            .ok_or_else(|| unsupported(format!("integral order {order} exceeds {MAX_ORDER}")))
    };
    let scalar = |c: &Coefficient| {
        c.as_scalar()
            .ok_or_else(|| unsupported(format!("term '{}' needs a scalar coefficient", term.name)))
    };

    Ok(match kind {
        TermKind::Laplace => WeakTerm::Laplace {
            factor: term.factor,
            cells: region.cells.clone(),
            conductivity: Conductivity::from_coefficient(coefficient).ok_or_else(|| {
                unsupported("dw_laplace needs a scalar or 3x3 tensor coefficient")
            })?,
            rule: tet_rule()?,
        },
        TermKind::VolumeLvf => WeakTerm::VolumeSource {
            factor: term.factor,
            cells: region.cells.clone(),
            value: scalar(coefficient)?,
            rule: tet_rule()?,
        },
        TermKind::SurfaceIntegrate => WeakTerm::SurfaceFlux {
            factor: term.factor,
            facets: region.facets.clone(),
            value: scalar(coefficient)?,
            rule: TriangleRule::triangle(order).ok_or_else(|| {
                unsupported(format!("integral order {order} exceeds {MAX_ORDER}"))
            })?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::generator::create_box_mesh;
    use crate::problem::{FieldDef, IntegralDef, Material, Options, SolverConf, VariableDef};
    use crate::problem::{EssentialBc, RegionKind};
    use glam::DVec3;

    fn builder() -> crate::problem::ProblemBuilder {
        ProblemDescription::builder("slab")
            .mesh("slab.mesh")
            .material("m", Material::new().with("k", 1.0))
            .region("Omega", "all", RegionKind::Cell)
            .region("Left", "vertices in (x < 1e-9)", RegionKind::Facet)
            .field("t", FieldDef::scalar("Omega", 1))
            .variable("u", VariableDef::unknown("t"))
            .variable("v", VariableDef::test("t", "u"))
            .integral("i", IntegralDef::volume(2))
            .equation("eq", "dw_laplace.i.Omega(m.k, v, u) = 0")
            .solver("newton", SolverConf::Newton(Default::default()))
            .solver("ls", SolverConf::Direct(Default::default()))
            .options(Options::new("newton", "ls"))
    }

    fn mesh() -> Mesh {
        create_box_mesh(DVec3::ZERO, DVec3::ONE, [2, 1, 1]).unwrap()
    }

    #[test]
    fn constant_solution_with_one_sided_bc() {
        let problem = builder()
            .ebc("fix", EssentialBc::new("Left").fix("u.0".parse().unwrap(), 3.0))
            .build()
            .unwrap();
        let sim = Simulation::new(problem, mesh()).unwrap();
        let res = sim.solve().unwrap();
        assert!(res.values.iter().all(|v| (v - 3.0).abs() < 1e-10));
        assert_eq!(res.n_fixed, 4);
        assert_eq!(res.variable, "u");
    }

    #[test]
    fn vector_fields_are_unsupported() {
        let problem = builder()
            .field(
                "t",
                FieldDef {
                    n_components: 3,
                    ..FieldDef::scalar("Omega", 1)
                },
            )
            .build();
        // the field is declared twice, so the builder already refuses it
        assert!(problem.is_err());

        let problem = ProblemDescription::builder("vec")
            .mesh("slab.mesh")
            .material("m", Material::new().with("k", 1.0))
            .region("Omega", "all", RegionKind::Cell)
            .field(
                "t",
                FieldDef {
                    n_components: 3,
                    ..FieldDef::scalar("Omega", 1)
                },
            )
            .variable("u", VariableDef::unknown("t"))
            .variable("v", VariableDef::test("t", "u"))
            .integral("i", IntegralDef::volume(2))
            .equation("eq", "dw_laplace.i.Omega(m.k, v, u) = 0")
            .solver("newton", SolverConf::Newton(Default::default()))
            .solver("ls", SolverConf::Direct(Default::default()))
            .options(Options::new("newton", "ls"))
            .build()
            .unwrap();
        assert!(matches!(
            Simulation::new(problem, mesh()),
            Err(SimulationError::Unsupported(_))
        ));
    }

    #[test]
    fn empty_regions_fail_setup() {
        let problem = builder()
            .region("Far", "vertices in (x > 5)", RegionKind::Facet)
            .build()
            .unwrap();
        assert!(matches!(
            Simulation::new(problem, mesh()),
            Err(SimulationError::Region(RegionError::Empty(_)))
        ));
    }
}
