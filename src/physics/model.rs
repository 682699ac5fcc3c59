use nalgebra::DVector;
use num_dual::DualNum;

use super::PhysicsModel;
use super::assembly::WeakForm;
use super::dofs::DofMap;
use crate::discretization::mesh::Mesh;

/// Steady scalar diffusion: a weak form restricted to the free DOFs.
pub struct HeatModel {
    form: WeakForm,
    dofs: DofMap,
}

impl HeatModel {
    pub fn new(form: WeakForm, dofs: DofMap) -> Self {
        Self { form, dofs }
    }

    pub fn form(&self) -> &WeakForm {
        &self.form
    }

    pub fn dofs(&self) -> &DofMap {
        &self.dofs
    }

    /// Nodal values for a reduced solution vector.
    pub fn full_solution(&self, reduced: &DVector<f64>) -> DVector<f64> {
        self.dofs.expand(reduced)
    }
}

impl<T> PhysicsModel<T> for HeatModel
where
    T: nalgebra::Scalar + DualNum<f64> + num_traits::Zero,
{
    fn num_unknowns(&self) -> usize {
        self.dofs.n_free()
    }

    fn calculate_residual(&self, mesh: &Mesh, u: DVector<T>) -> DVector<T> {
        let full = self.dofs.expand(&u);
        let r = self.form.residual(mesh, &full);
        self.dofs.reduce(&r)
    }

    /// Mean of the fixed values on every free DOF.
    fn initial_condition(&self, _mesh: &Mesh) -> DVector<f64> {
        let fixed: Vec<f64> = (0..self.dofs.n_dofs())
            .filter_map(|d| self.dofs.fixed_value(d))
            .collect();
        let mean = if fixed.is_empty() {
            0.0
        } else {
            fixed.iter().sum::<f64>() / fixed.len() as f64
        };
        DVector::from_element(self.dofs.n_free(), mean)
    }
}
