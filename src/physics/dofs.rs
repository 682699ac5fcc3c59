use std::collections::BTreeMap;

use nalgebra::DVector;
use num_dual::DualNum;

/// Partition of the nodal degrees of freedom into free and fixed ones.
///
/// The solver works on the reduced vector of free DOFs only; fixed DOFs carry
/// the values imposed by essential boundary conditions.
#[derive(Clone, Debug)]
pub struct DofMap {
    fixed: Vec<Option<f64>>,
    free: Vec<usize>,
}

impl DofMap {
    pub fn new(n_dofs: usize, fixed_values: &BTreeMap<usize, f64>) -> Self {
        let mut fixed = vec![None; n_dofs];
        for (&dof, &value) in fixed_values {
            if let Some(slot) = fixed.get_mut(dof) {
                *slot = Some(value);
            }
        }
        let free = (0..n_dofs).filter(|&d| fixed[d].is_none()).collect();
        Self { fixed, free }
    }

    pub fn n_dofs(&self) -> usize {
        self.fixed.len()
    }

    pub fn n_free(&self) -> usize {
        self.free.len()
    }

    pub fn n_fixed(&self) -> usize {
        self.n_dofs() - self.n_free()
    }

    /// Global indices of the free DOFs, in reduced order.
    pub fn free(&self) -> &[usize] {
        &self.free
    }

    pub fn fixed_value(&self, dof: usize) -> Option<f64> {
        self.fixed.get(dof).copied().flatten()
    }

    /// Full DOF vector from the reduced one, with fixed values filled in.
    pub fn expand<T>(&self, reduced: &DVector<T>) -> DVector<T>
    where
        T: nalgebra::Scalar + DualNum<f64> + num_traits::Zero,
    {
        let mut full = DVector::from_iterator(
            self.n_dofs(),
            self.fixed.iter().map(|v| T::from(v.unwrap_or(0.0))),
        );
        for (k, &dof) in self.free.iter().enumerate() {
            full[dof] = reduced[k].clone();
        }
        full
    }

    /// Entries of a full vector belonging to free DOFs.
    pub fn reduce<T: nalgebra::Scalar>(&self, full: &DVector<T>) -> DVector<T> {
        DVector::from_iterator(self.n_free(), self.free.iter().map(|&d| full[d].clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> DofMap {
        DofMap::new(5, &BTreeMap::from([(0, 2.0), (4, -2.0)]))
    }

    #[test]
    fn partitions_dofs() {
        let dofs = map();
        assert_eq!(dofs.free(), &[1, 2, 3]);
        assert_eq!(dofs.n_fixed(), 2);
        assert_eq!(dofs.fixed_value(4), Some(-2.0));
        assert_eq!(dofs.fixed_value(2), None);
    }

    #[test]
    fn expand_then_reduce() {
        let dofs = map();
        let full = dofs.expand(&DVector::from_vec(vec![1.0, 0.0, -1.0]));
        assert_eq!(full.as_slice(), &[2.0, 1.0, 0.0, -1.0, -2.0]);
        assert_eq!(dofs.reduce(&full).as_slice(), &[1.0, 0.0, -1.0]);
    }
}
