#![allow(unused)]
//! Per-solve timing of Jacobian evaluations and linear solves, compiled in
//! with the `timing` feature. Without it every hook is a no-op.

use std::cell::RefCell;
use std::time::Duration;

use tracing::info;

#[derive(Default, Clone, Debug)]
pub struct TimingStats {
    pub jacobian_times: Vec<Duration>,
    pub linear_solve_times: Vec<Duration>,
    pub total_time: Duration,
}

impl TimingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_jacobian(&self) -> Duration {
        self.jacobian_times.iter().sum()
    }

    pub fn total_linear(&self) -> Duration {
        self.linear_solve_times.iter().sum()
    }

    /// Time not spent in Jacobians or linear solves.
    pub fn overhead(&self) -> Duration {
        self.total_time
            .saturating_sub(self.total_jacobian() + self.total_linear())
    }

    pub fn log_summary(&self) {
        if self.jacobian_times.is_empty() {
            return;
        }
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        info!(
            total_ms = ms(self.total_time),
            jacobian_ms = ms(self.total_jacobian()),
            jacobian_avg_ms = ms(self.total_jacobian()) / self.jacobian_times.len() as f64,
            linear_ms = ms(self.total_linear()),
            overhead_ms = ms(self.overhead()),
            jacobians = self.jacobian_times.len(),
            linear_solves = self.linear_solve_times.len(),
            "solver timing"
        );
        for (i, (jac, lin)) in self
            .jacobian_times
            .iter()
            .zip(&self.linear_solve_times)
            .enumerate()
        {
            info!(iteration = i, jacobian_ms = ms(*jac), linear_ms = ms(*lin), "iteration timing");
        }
    }
}

#[cfg(feature = "timing")]
thread_local! {
    static TIMING_STATS: RefCell<TimingStats> = RefCell::new(TimingStats::new());
}

#[cfg(feature = "timing")]
pub fn reset_timing() {
    TIMING_STATS.with(|stats| {
        *stats.borrow_mut() = TimingStats::new();
    });
}

#[cfg(not(feature = "timing"))]
pub fn reset_timing() {}

#[cfg(feature = "timing")]
pub fn record_jacobian<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = std::time::Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    TIMING_STATS.with(|stats| {
        stats.borrow_mut().jacobian_times.push(elapsed);
    });
    result
}

#[cfg(not(feature = "timing"))]
pub fn record_jacobian<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}

#[cfg(feature = "timing")]
pub fn record_linear_solve<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = std::time::Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    TIMING_STATS.with(|stats| {
        stats.borrow_mut().linear_solve_times.push(elapsed);
    });
    result
}

#[cfg(not(feature = "timing"))]
pub fn record_linear_solve<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}

#[cfg(feature = "timing")]
pub fn finalize_timing(total_time: Duration) -> TimingStats {
    TIMING_STATS.with(|stats| {
        let mut s = stats.borrow_mut();
        s.total_time = total_time;
        s.clone()
    })
}

#[cfg(not(feature = "timing"))]
pub fn finalize_timing(_total_time: Duration) -> TimingStats {
    TimingStats::new()
}

pub fn finalize_and_log(total_time: Duration) {
    finalize_timing(total_time).log_summary();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overhead_saturates() {
        let stats = TimingStats {
            jacobian_times: vec![Duration::from_millis(3), Duration::from_millis(2)],
            linear_solve_times: vec![Duration::from_millis(1)],
            total_time: Duration::from_millis(4),
        };
        assert_eq!(stats.total_jacobian(), Duration::from_millis(5));
        assert_eq!(stats.overhead(), Duration::ZERO);
    }

    #[test]
    fn hooks_pass_results_through() {
        reset_timing();
        assert_eq!(record_jacobian(|| 2 + 2), 4);
        assert_eq!(record_linear_solve(|| "ok"), "ok");
    }
}
