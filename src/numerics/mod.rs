pub mod linear;
pub mod solver;
pub mod timing;

use nalgebra::DVector;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Tolerance {
    Absolute(f64),
    Relative(f64),
    /// Either criterion suffices.
    Combined(f64, f64),
    /// Both criteria must hold.
    Both(f64, f64),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConvergenceMetric {
    L2Norm,
    MaxNorm,
}

/// Convergence criteria for iterative solvers
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Convergence {
    pub tolerance: Tolerance,
    pub metric: ConvergenceMetric,
}

impl Convergence {
    pub fn new(tolerance: Tolerance) -> Self {
        Self {
            tolerance,
            metric: ConvergenceMetric::L2Norm,
        }
    }

    pub fn norm(&self, vector: &DVector<f64>) -> f64 {
        match self.metric {
            ConvergenceMetric::L2Norm => vector.norm(),
            ConvergenceMetric::MaxNorm => vector.amax(),
        }
    }

    /// `initial_norm` is the reference for relative criteria. A zero reference
    /// counts as a relative error of zero.
    pub fn check_tolerance(&self, norm: f64, initial_norm: f64) -> bool {
        let relative = if initial_norm > 0.0 {
            norm / initial_norm
        } else {
            0.0
        };
        match self.tolerance {
            Tolerance::Absolute(tol) => norm < tol,
            Tolerance::Relative(tol) => relative < tol,
            Tolerance::Combined(abs_tol, rel_tol) => norm < abs_tol || relative < rel_tol,
            Tolerance::Both(abs_tol, rel_tol) => norm < abs_tol && relative < rel_tol,
        }
    }
}
