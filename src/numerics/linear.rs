use nalgebra::{DMatrix, DVector};
use thiserror::Error;
use tracing::debug;

use super::{Convergence, Tolerance};
use crate::problem::SolverConf;

#[derive(Debug, Error, PartialEq)]
pub enum LinearSolveError {
    #[error("matrix is singular")]
    Singular,
    #[error("matrix is not positive definite (diagonal entry {index} is {value})")]
    NotPositiveDefinite { index: usize, value: f64 },
    #[error("conjugate gradients stopped after {iterations} iterations with residual {residual:e}")]
    NotConverged { iterations: u32, residual: f64 },
}

/// Solves `A x = b` for a dense system matrix.
pub trait LinearSolver {
    fn name(&self) -> &'static str;

    fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, LinearSolveError>;
}

/// `ls.scipy_direct`: dense LU factorization with partial pivoting.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectLu;

impl LinearSolver for DirectLu {
    fn name(&self) -> &'static str {
        "ls.scipy_direct"
    }

    fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, LinearSolveError> {
        let x = a.clone().lu().solve(b).ok_or(LinearSolveError::Singular)?;
        if x.iter().all(|v| v.is_finite()) {
            Ok(x)
        } else {
            Err(LinearSolveError::Singular)
        }
    }
}

/// `ls.scipy_iterative` with `method = "cg"`: Jacobi-preconditioned conjugate
/// gradients for symmetric positive definite systems.
#[derive(Clone, Copy, Debug)]
pub struct ConjugateGradient {
    pub i_max: u32,
    pub convergence: Convergence,
}

impl ConjugateGradient {
    pub fn new(i_max: u32, eps_a: f64, eps_r: f64) -> Self {
        Self {
            i_max,
            convergence: Convergence::new(Tolerance::Combined(eps_a, eps_r)),
        }
    }
}

impl LinearSolver for ConjugateGradient {
    fn name(&self) -> &'static str {
        "ls.scipy_iterative"
    }

    fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, LinearSolveError> {
        let diag = a.diagonal();
        if let Some((index, &value)) = diag.iter().enumerate().find(|(_, d)| **d <= 0.0) {
            return Err(LinearSolveError::NotPositiveDefinite { index, value });
        }
        let inv_diag = diag.map(|d| 1.0 / d);

        let b_norm = self.convergence.norm(b);
        let mut x = DVector::zeros(b.len());
        let mut r = b.clone();
        let mut z = r.component_mul(&inv_diag);
        let mut p = z.clone();
        let mut rz = r.dot(&z);

        let mut it = 0;
        loop {
            let r_norm = self.convergence.norm(&r);
            if self.convergence.check_tolerance(r_norm, b_norm) {
                debug!(iterations = it, residual = r_norm, "cg converged");
                return Ok(x);
            }
            if it == self.i_max {
                return Err(LinearSolveError::NotConverged {
                    iterations: it,
                    residual: r_norm,
                });
            }
            it += 1;
            let ap = a * &p;
            let p_ap = p.dot(&ap);
            if p_ap <= 0.0 {
                return Err(LinearSolveError::Singular);
            }
            let alpha = rz / p_ap;
            x.axpy(alpha, &p, 1.0);
            r.axpy(-alpha, &ap, 1.0);
            z = r.component_mul(&inv_diag);
            let rz_next = r.dot(&z);
            p = &z + &p * (rz_next / rz);
            rz = rz_next;
        }
    }
}

/// Linear solver for a configuration, `None` for nonlinear solver kinds.
pub fn from_conf(conf: &SolverConf) -> Option<Box<dyn LinearSolver>> {
    match conf {
        SolverConf::Direct(_) => Some(Box::new(DirectLu)),
        SolverConf::Iterative(p) => Some(Box::new(ConjugateGradient::new(p.i_max, p.eps_a, p.eps_r))),
        SolverConf::Newton(_) => None,
    }
}
