use crate::discretization::mesh::Mesh;
use crate::numerics::linear::{LinearSolveError, LinearSolver};
#[allow(unused)]
use crate::numerics::timing::{finalize_and_log, record_jacobian, record_linear_solve, reset_timing};
use crate::numerics::{Convergence, Tolerance};
use crate::physics::PhysicsModel;
use crate::problem::{NewtonParams, SolverConf};
use nalgebra::{DMatrix, DVector};
use num_dual::{DualDVec64, jacobian};
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(feature = "timing")]
use std::time::Instant;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("linear solve failed: {0}")]
    LinearSolveFailed(#[from] LinearSolveError),
    #[error("linear system not solved accurately: residual {linear:e} exceeds {limit:e}")]
    LinearSolveInaccurate { linear: f64, limit: f64 },
    #[error("residual is not finite at iteration {0}")]
    NonFiniteResidual(u32),
    #[error("Newton's method failed to converge in {iterations} iterations (residual {residual:e})")]
    NonConvergence { iterations: u32, residual: f64 },
}

/// One accepted Newton iterate.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationRecord {
    pub iteration: u32,
    pub residual: f64,
    /// Residual relative to the initial one.
    pub relative: f64,
    /// Step length accepted by the line search, 1 for a full step.
    pub step: f64,
    /// Residual of the linear solve that produced the next update.
    pub linear_residual: Option<f64>,
}

#[derive(Debug)]
pub struct SolverResult {
    pub solution: DVector<f64>,
    pub iterations: u32,
    pub final_residual: f64,
    pub history: Vec<IterationRecord>,
}

/// Newton's method with a backtracking line search (`nls.newton`).
///
/// Iteration `i` first evaluates the residual of the current iterate. It stops
/// when `|r| < eps_a` (at iteration 0) or when both `|r| < eps_a` and
/// `|r| / |r0| < eps_r` hold (later iterations). Otherwise, and unless `i_max`
/// iterations have been taken, the Jacobian system is solved and the update
/// applied. A linear problem therefore converges with exactly one iteration.
pub struct NewtonSolver {
    pub params: NewtonParams,
}

impl NewtonSolver {
    pub fn new(params: NewtonParams) -> Self {
        Self { params }
    }

    /// Newton solver for a configuration, `None` for linear solver kinds.
    pub fn from_conf(conf: &SolverConf) -> Option<Self> {
        match conf {
            SolverConf::Newton(params) => Some(Self::new(params.clone())),
            _ => None,
        }
    }

    fn converged(&self, iteration: u32, err: f64, err0: f64) -> bool {
        let tolerance = if iteration == 0 {
            Tolerance::Absolute(self.params.eps_a)
        } else {
            Tolerance::Both(self.params.eps_a, self.params.eps_r)
        };
        Convergence::new(tolerance).check_tolerance(err, err0)
    }

    pub fn solve<M>(
        &self,
        model: &M,
        mesh: &Mesh,
        initial_guess: DVector<f64>,
        linear: &dyn LinearSolver,
    ) -> Result<SolverResult, SolverError>
    where
        M: PhysicsModel<DualDVec64> + PhysicsModel<f64>,
    {
        reset_timing();

        #[cfg(feature = "timing")]
        let solve_start = Instant::now();

        let p = &self.params;
        let mut u = initial_guess;
        let mut r = PhysicsModel::<f64>::calculate_residual(model, mesh, u.clone());
        let mut err = r.norm();
        if !err.is_finite() {
            return Err(SolverError::NonFiniteResidual(0));
        }
        let err0 = err;
        let mut step = 1.0;
        let mut history: Vec<IterationRecord> = Vec::new();

        debug!(unknowns = u.len(), linear = linear.name(), "starting Newton");

        let mut it = 0;
        loop {
            let relative = if err0 > 0.0 { err / err0 } else { 0.0 };
            debug!(iteration = it, residual = err, relative, "nls");
            history.push(IterationRecord {
                iteration: it,
                residual: err,
                relative,
                step,
                linear_residual: None,
            });

            if self.converged(it, err, err0) {
                #[cfg(feature = "timing")]
                finalize_and_log(solve_start.elapsed());

                return Ok(SolverResult {
                    solution: u,
                    iterations: it,
                    final_residual: err,
                    history,
                });
            }
            if it >= p.i_max {
                #[cfg(feature = "timing")]
                finalize_and_log(solve_start.elapsed());

                return Err(SolverError::NonConvergence {
                    iterations: it,
                    residual: err,
                });
            }

            let (_, jac) = record_jacobian(|| self.compute_residual_and_jacobian(model, mesh, &u));
            let du = record_linear_solve(|| linear.solve(&jac, &-&r))?;

            let linear_residual = (&jac * &du + &r).norm();
            if let Some(record) = history.last_mut() {
                record.linear_residual = Some(linear_residual);
            }
            if let Some(lin_red) = p.lin_red {
                let limit = lin_red * err;
                if linear_residual > limit {
                    return Err(SolverError::LinearSolveInaccurate {
                        linear: linear_residual,
                        limit,
                    });
                }
            }

            // backtracking line search
            step = 1.0;
            loop {
                let trial = &u + &du * step;
                let r_trial = PhysicsModel::<f64>::calculate_residual(model, mesh, trial.clone());
                let err_trial = r_trial.norm();
                let acceptable = err_trial.is_finite() && err_trial <= p.ls_on * err;
                if acceptable || step < p.ls_min {
                    if !err_trial.is_finite() {
                        return Err(SolverError::NonFiniteResidual(it + 1));
                    }
                    if !acceptable {
                        warn!(step, residual = err_trial, "line search failed, continuing anyway");
                    }
                    u = trial;
                    r = r_trial;
                    err = err_trial;
                    break;
                }
                step *= p.ls_red;
                debug!(step, residual = err_trial, "line search");
            }
            it += 1;
        }
    }

    // A helper that wraps the call to the AD library.
    pub fn compute_residual_and_jacobian<M: PhysicsModel<DualDVec64>>(
        &self,
        model: &M,
        mesh: &Mesh,
        u: &DVector<f64>,
    ) -> (DVector<f64>, DMatrix<f64>) {
        jacobian(
            |arg: DVector<DualDVec64>| model.calculate_residual(mesh, arg),
            u.clone(),
        )
    }
}
