//! Declarative finite-element problem descriptions and a small P1 engine that
//! solves them.
//!
//! A [`problem::ProblemDescription`] names a mesh, materials, regions, fields,
//! variables, essential boundary conditions, integrals, equations and solvers.
//! [`simulation::Simulation`] binds such a description to a tetrahedral mesh,
//! assembles the weak form and runs Newton's method on it.

pub mod config;
pub mod discretization;
pub mod models;
pub mod numerics;
pub mod physics;
pub mod problem;
pub mod processing;
pub mod simulation;

pub use config::RunConfig;
pub use problem::{ProblemDescription, ProblemError};
pub use simulation::{Simulation, SimulationError, SimulationResult};
