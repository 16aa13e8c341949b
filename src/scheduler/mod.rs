//! The annealing schedule contract (spec §4.2) and its COV
//! implementation. Modeled as a capability trait plus a closed enum of
//! concrete schedulers, matching the "dynamic component lookup"
//! strategy from spec §9: a future non-COV scheduler only needs a new
//! enum arm, no runtime registry is needed.

pub mod cov;

pub use cov::CovScheduler;

use crate::cooling_step::CoolingStep;
use rand::RngCore;

/// What every annealing schedule must provide: push `step` forward one
/// increment and report whether the root-finder converged.
pub trait SchedulerOps {
    fn update(&mut self, step: &mut CoolingStep, rng: &mut dyn RngCore) -> bool;

    /// The coefficient of variation actually achieved on the last call
    /// to `update`, for monitors and non-convergence diagnostics.
    fn achieved_cov(&self) -> f64;
}

/// The closed set of recognized schedulers (spec §9: non-COV
/// schedulers are an explicit Non-goal, but the shape is left open).
pub enum Scheduler {
    Cov(CovScheduler),
}

impl SchedulerOps for Scheduler {
    fn update(&mut self, step: &mut CoolingStep, rng: &mut dyn RngCore) -> bool {
        match self {
            Scheduler::Cov(inner) => inner.update(step, rng),
        }
    }

    fn achieved_cov(&self) -> f64 {
        match self {
            Scheduler::Cov(inner) => inner.last_cov,
        }
    }
}
