//! The chain-advance sampler contract (spec §4.3) and its Metropolis
//! implementation.

pub mod metropolis;

pub use metropolis::{MetropolisSampler, Tallies};

use crate::cooling_step::CoolingStep;
use crate::error::Result;
use crate::model::Model;
use rand::RngCore;

/// What every sampler must provide: walk every chain in `step` forward
/// and adapt itself from the resulting tallies. Non-Metropolis
/// samplers are an explicit Non-goal (spec §1), but the shape mirrors
/// [`crate::scheduler::Scheduler`] so one could be added.
pub trait SamplerOps {
    fn walk_chains(
        &self,
        model: &dyn Model,
        step: &mut CoolingStep,
        rng: &mut dyn RngCore,
    ) -> Result<Tallies>;

    fn resample(&mut self, tallies: &Tallies);
}

pub enum Sampler {
    Metropolis(MetropolisSampler),
}

impl SamplerOps for Sampler {
    fn walk_chains(
        &self,
        model: &dyn Model,
        step: &mut CoolingStep,
        rng: &mut dyn RngCore,
    ) -> Result<Tallies> {
        match self {
            Sampler::Metropolis(inner) => inner.walk_chains(model, step, rng),
        }
    }

    fn resample(&mut self, tallies: &Tallies) {
        match self {
            Sampler::Metropolis(inner) => inner.resample(tallies),
        }
    }
}
