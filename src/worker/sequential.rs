//! The sequential worker (spec §4.4): owns the global `CoolingStep`
//! directly, `workers() == 1`. Grounded on
//! `altar/bayesian/SequentialAnnealing.py`, the base case every other
//! worker variant decorates.

use crate::cooling_step::CoolingStep;
use crate::error::Result;
use crate::model::Model;
use crate::sampler::{Sampler, SamplerOps, Tallies};
use crate::worker::Worker;
use rand::RngCore;

pub struct SequentialWorker {
    step: CoolingStep,
}

impl SequentialWorker {
    pub fn new(samples: usize, parameters: usize) -> Self {
        SequentialWorker {
            step: CoolingStep::zeros(samples, parameters),
        }
    }

    /// Wrap an already-built step (used by `ThreadedWorker` to hand a
    /// row-slice to a sequential sub-worker).
    pub fn from_step(step: CoolingStep) -> Self {
        SequentialWorker { step }
    }

    pub fn into_step(self) -> CoolingStep {
        self.step
    }
}

impl Worker for SequentialWorker {
    fn start(&mut self, model: &dyn Model, rng: &mut dyn RngCore) {
        self.step.beta = 0.0;
        model.initialize_sample(&mut self.step.theta, rng);
        model.likelihoods(&mut self.step);
    }

    fn walk(
        &mut self,
        model: &dyn Model,
        sampler: &Sampler,
        rng: &mut dyn RngCore,
    ) -> Result<Tallies> {
        sampler.walk_chains(model, &mut self.step, rng)
    }

    fn step(&self) -> &CoolingStep {
        &self.step
    }

    fn step_mut(&mut self) -> &mut CoolingStep {
        &mut self.step
    }

    fn workers(&self) -> usize {
        1
    }
}
