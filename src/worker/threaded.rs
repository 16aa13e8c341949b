//! The threaded worker (spec §4.4): partitions the global `CoolingStep`
//! into disjoint row-slices and walks them concurrently, combining
//! tallies at a join barrier. Grounded on
//! `altar/bayesian/ThreadedAnnealing.py` for the contract and on
//! `runner/runner.rs::run`'s `rayon::scope` + `Arc<Mutex<_>>` harness
//! for the concurrency shape.

use crate::cooling_step::CoolingStep;
use crate::error::Result;
use crate::model::Model;
use crate::sampler::{Sampler, Tallies};
use crate::worker::{walk_row_partitioned, Worker};
use rand::RngCore;

pub struct ThreadedWorker {
    combined: CoolingStep,
    tasks: usize,
}

impl ThreadedWorker {
    pub fn new(samples: usize, parameters: usize, tasks: usize) -> Self {
        assert!(tasks >= 1, "a threaded worker needs at least one task");
        ThreadedWorker {
            combined: CoolingStep::zeros(samples, parameters),
            tasks,
        }
    }

    fn partition_rows(&self) -> Vec<(usize, usize)> {
        let counts = crate::worker::partition_counts(self.combined.samples(), self.tasks);
        let mut ranges = Vec::with_capacity(self.tasks);
        let mut start = 0;
        for count in counts {
            ranges.push((start, count));
            start += count;
        }
        ranges
    }
}

impl Worker for ThreadedWorker {
    fn start(&mut self, model: &dyn Model, rng: &mut dyn RngCore) {
        self.combined.beta = 0.0;
        model.initialize_sample(&mut self.combined.theta, rng);
        model.likelihoods(&mut self.combined);
    }

    fn walk(
        &mut self,
        model: &dyn Model,
        sampler: &Sampler,
        rng: &mut dyn RngCore,
    ) -> Result<Tallies> {
        walk_row_partitioned(&mut self.combined, self.tasks, model, sampler, rng)
    }

    fn step(&self) -> &CoolingStep {
        &self.combined
    }

    fn step_mut(&mut self) -> &mut CoolingStep {
        &mut self.combined
    }

    fn workers(&self) -> usize {
        self.tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NullModel;
    use crate::sampler::MetropolisSampler;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn partition_rows_balances_with_remainder_on_lowest_ranks() {
        let worker = ThreadedWorker::new(10, 1, 3);
        let ranges = worker.partition_rows();
        assert_eq!(ranges, vec![(0, 4), (4, 3), (7, 3)]);
        let total: usize = ranges.iter().map(|&(_, c)| c).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn walk_tallies_equal_samples_times_steps_across_tasks() {
        let model = NullModel::new(-1.0, 1.0);
        let mut worker = ThreadedWorker::new(20, 1, 4);
        let mut rng = StdRng::seed_from_u64(2);
        worker.start(&model, &mut rng);
        worker.step_mut().sigma = nalgebra::DMatrix::identity(1, 1);

        let sampler = Sampler::Metropolis(MetropolisSampler::new(0.2, 8.0, 1.0, 3));
        let tallies = worker.walk(&model, &sampler, &mut rng).unwrap();
        assert_eq!(tallies.total(), 20 * 3);
        assert_eq!(worker.workers(), 4);
    }
}
