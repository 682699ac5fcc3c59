pub mod assembly;
pub mod bc;
pub mod dofs;
pub mod model;
pub mod quadrature;

use crate::discretization::mesh::Mesh;
use nalgebra::DVector;

/// Defines the contract for any physical model to be solved.
pub trait PhysicsModel<T: nalgebra::Scalar> {
    /// Number of unknowns of the reduced system, i.e. free DOFs only.
    fn num_unknowns(&self) -> usize;

    /// Calculates the residual vector `R(u)` of the reduced system.
    /// This is the function that will be automatically differentiated.
    fn calculate_residual(&self, mesh: &Mesh, u: DVector<T>) -> DVector<T>;

    /// Starting point for the nonlinear solver. Default: zeros.
    fn initial_condition(&self, _mesh: &Mesh) -> DVector<f64> {
        DVector::zeros(self.num_unknowns())
    }
}
