//! The distributed (MPI-shaped) worker (spec §4.4): wraps one inner
//! slice per rank, rank 0 acting as manager. Grounded on
//! `altar/bayesian/MPIAnnealing.py`: `collect`/`partition` bracket
//! `cool` (which only the manager runs), and tallies are all-reduced
//! after `walk` so every rank adapts the proposal scale identically.
//! Ranks run concurrently via `rayon::scope`, matching the teacher's
//! `runner/runner.rs` concurrency shape; `LocalCommunicator`'s
//! collectives block until every rank has called in, exactly as a real
//! MPI runtime's would. `assemble_manager_step`/`cool` route through
//! `Communicator::gather`/`broadcast_f64`/`broadcast_matrix` rather than
//! hand-rolling the collect/partition bookkeeping, so the abstraction
//! actually backs this worker instead of sitting beside it.

use crate::cooling_step::CoolingStep;
use crate::error::{CatmipError, Result};
use crate::model::Model;
use crate::rng::rng_for_rank;
use crate::sampler::{Sampler, Tallies};
use crate::scheduler::{Scheduler, SchedulerOps};
use crate::worker::communicator::{Communicator, LocalCommunicator};
use crate::worker::{device_id_for_rank, partition_counts, walk_row_partitioned, Worker};
use rand::rngs::StdRng;
use rand::RngCore;
use std::sync::Mutex;

struct RankState {
    comm: LocalCommunicator,
    rng: StdRng,
    local: CoolingStep,
}

pub struct DistributedWorker {
    ranks: Vec<RankState>,
    manager_step: CoolingStep,
    /// Threads walked per rank (spec §4.4's MPI-wraps-threaded nesting,
    /// one thread per GPU when `gpus > 1`); `1` walks each rank's slice
    /// directly with no inner partition.
    threads_per_rank: usize,
    /// `rank mod gpus_per_task` (spec §4.4) for every rank, computed once
    /// at construction; all zero when the job has no GPUs.
    device_ids: Vec<usize>,
}

impl DistributedWorker {
    /// `base_seed` seeds every rank independently via
    /// `base_seed + 29*(rank+1) + 1` (normative, spec §4.4/§9). Equivalent
    /// to `with_threads(.., 1, 0)`: no per-rank thread-wrap, no GPUs.
    pub fn new(samples: usize, parameters: usize, num_ranks: usize, base_seed: u64) -> Self {
        Self::with_threads(samples, parameters, num_ranks, base_seed, 1, 0)
    }

    /// Like [`DistributedWorker::new`], additionally thread-wrapping each
    /// rank's walk across `threads_per_rank` tasks and recording each
    /// rank's CUDA `device_id = rank mod gpus_per_task` (spec §4.4). Used
    /// by [`crate::worker::build_worker`] for the MPI-mode branches of
    /// `altar/bayesian/Annealer.py::deduceAnnealingMethod`'s decision
    /// table.
    pub fn with_threads(
        samples: usize,
        parameters: usize,
        num_ranks: usize,
        base_seed: u64,
        threads_per_rank: usize,
        gpus_per_task: usize,
    ) -> Self {
        let comms = LocalCommunicator::new_group(num_ranks);
        let counts = partition_counts(samples, num_ranks);
        let device_ids = (0..num_ranks)
            .map(|rank| device_id_for_rank(rank, gpus_per_task))
            .collect();
        let ranks = comms
            .into_iter()
            .zip(counts.into_iter())
            .enumerate()
            .map(|(rank, (comm, count))| RankState {
                comm,
                rng: rng_for_rank(base_seed, rank),
                local: CoolingStep::zeros(count, parameters),
            })
            .collect();
        DistributedWorker {
            ranks,
            manager_step: CoolingStep::zeros(samples, parameters),
            threads_per_rank: threads_per_rank.max(1),
            device_ids,
        }
    }

    fn total_samples(&self) -> usize {
        self.ranks.iter().map(|r| r.local.samples()).sum()
    }

    pub fn threads_per_rank(&self) -> usize {
        self.threads_per_rank
    }

    pub fn device_ids(&self) -> &[usize] {
        &self.device_ids
    }

    /// Gather every rank's local slice into `manager_step`, in rank
    /// order, via `Communicator::gather` -- a collective every rank must
    /// call concurrently, so it runs under `rayon::scope` the same as
    /// `cool`/`walk`.
    fn assemble_manager_step(&mut self) {
        let results: Mutex<Vec<Option<CoolingStep>>> =
            Mutex::new((0..self.ranks.len()).map(|_| None).collect());
        rayon::scope(|scope| {
            for (idx, state) in self.ranks.iter_mut().enumerate() {
                let results = &results;
                scope.spawn(move |_| {
                    let assembled = state.comm.gather(&state.local);
                    results.lock().unwrap()[idx] = Some(assembled);
                });
            }
        });
        let mut results = results.into_inner().unwrap();
        self.manager_step = results[0]
            .take()
            .expect("gather is a collective: every rank returns the same assembled step");
    }
}

impl Worker for DistributedWorker {
    fn start(&mut self, model: &dyn Model, _rng: &mut dyn RngCore) {
        rayon::scope(|scope| {
            for state in self.ranks.iter_mut() {
                scope.spawn(move |_| {
                    state.local.beta = 0.0;
                    model.initialize_sample(&mut state.local.theta, &mut state.rng);
                    model.likelihoods(&mut state.local);
                });
            }
        });
        self.assemble_manager_step();
    }

    fn cool(&mut self, scheduler: &mut Scheduler, rng: &mut dyn RngCore) -> bool {
        self.assemble_manager_step();
        let converged = scheduler.update(&mut self.manager_step, rng);

        let beta = self.manager_step.beta;
        let sigma = self.manager_step.sigma.clone();
        let manager_step = &self.manager_step;

        rayon::scope(|scope| {
            for state in self.ranks.iter_mut() {
                let sigma = &sigma;
                scope.spawn(move |_| {
                    let beta = state.comm.broadcast_f64(beta);
                    let sigma = state.comm.broadcast_matrix(sigma);
                    let global = if state.comm.is_manager() {
                        Some(manager_step)
                    } else {
                        None
                    };
                    let mut local = state.comm.scatter(global, 0);
                    local.beta = beta;
                    local.sigma = sigma;
                    state.local = local;
                });
            }
        });
        converged
    }

    fn walk(
        &mut self,
        model: &dyn Model,
        sampler: &Sampler,
        _rng: &mut dyn RngCore,
    ) -> Result<Tallies> {
        let threads_per_rank = self.threads_per_rank;
        let failure: Mutex<Option<CatmipError>> = Mutex::new(None);
        let totals: Mutex<Vec<Option<Tallies>>> =
            Mutex::new((0..self.ranks.len()).map(|_| None).collect());

        rayon::scope(|scope| {
            for (idx, state) in self.ranks.iter_mut().enumerate() {
                let failure = &failure;
                let totals = &totals;
                scope.spawn(move |_| {
                    let walked =
                        walk_row_partitioned(&mut state.local, threads_per_rank, model, sampler, &mut state.rng);
                    match walked {
                        Ok(local_tallies) => {
                            let reduced = state.comm.all_reduce_sum(local_tallies);
                            totals.lock().unwrap()[idx] = Some(reduced);
                        }
                        Err(err) => {
                            *failure.lock().unwrap() = Some(err);
                            let _ = state.comm.all_reduce_sum(Tallies::default());
                        }
                    }
                });
            }
        });

        if let Some(err) = failure.into_inner().unwrap() {
            return Err(err);
        }

        self.assemble_manager_step();
        let totals = totals.into_inner().unwrap();
        Ok(totals[0].expect("every rank all-reduces to the same total tallies"))
    }

    fn step(&self) -> &CoolingStep {
        &self.manager_step
    }

    fn step_mut(&mut self) -> &mut CoolingStep {
        &mut self.manager_step
    }

    fn workers(&self) -> usize {
        self.total_samples()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NullModel;
    use crate::sampler::MetropolisSampler;
    use crate::scheduler::CovScheduler;
    use rand::rngs::StdRng as TopRng;
    use rand::SeedableRng;

    #[test]
    fn start_partitions_samples_across_ranks() {
        let model = NullModel::new(-1.0, 1.0);
        let mut worker = DistributedWorker::new(10, 1, 3, 0);
        let mut rng = TopRng::seed_from_u64(0);
        worker.start(&model, &mut rng);
        assert_eq!(worker.step().samples(), 10);
        assert_eq!(worker.workers(), 10);
    }

    #[test]
    fn cool_then_walk_advances_every_rank() {
        let model = NullModel::new(-1.0, 1.0);
        let mut worker = DistributedWorker::new(12, 1, 4, 7);
        let mut rng = TopRng::seed_from_u64(0);
        worker.start(&model, &mut rng);

        let mut scheduler = Scheduler::Cov(CovScheduler::default());
        let converged = worker.cool(&mut scheduler, &mut rng);
        assert!(converged);
        assert!((worker.step().beta - 1.0).abs() < 1e-12);

        let sampler = Sampler::Metropolis(MetropolisSampler::new(0.2, 8.0, 1.0, 4));
        let tallies = worker.walk(&model, &sampler, &mut rng).unwrap();
        assert_eq!(tallies.total(), 12 * 4);
    }

    #[test]
    fn rank_seeds_differ_across_ranks() {
        let worker = DistributedWorker::new(8, 1, 3, 100);
        let seeds: Vec<u64> = (0..3).map(|r| crate::rng::partition_seed(100, r)).collect();
        assert_eq!(seeds.len(), 3);
        assert_ne!(seeds[0], seeds[1]);
        assert_ne!(seeds[1], seeds[2]);
        let _ = worker;
    }

    #[test]
    fn with_threads_records_gpus_per_task_device_ids() {
        let worker = DistributedWorker::with_threads(10, 1, 4, 0, 3, 3);
        assert_eq!(worker.threads_per_rank(), 3);
        assert_eq!(worker.device_ids(), &[0, 1, 2, 0]);
    }

    #[test]
    fn zero_gpus_assigns_device_zero_to_every_rank() {
        let worker = DistributedWorker::with_threads(10, 1, 4, 0, 1, 0);
        assert_eq!(worker.device_ids(), &[0, 0, 0, 0]);
    }

    #[test]
    fn thread_wrapped_ranks_still_tally_every_sample_times_step() {
        let model = NullModel::new(-1.0, 1.0);
        let mut worker = DistributedWorker::with_threads(16, 1, 4, 3, 2, 0);
        let mut rng = TopRng::seed_from_u64(0);
        worker.start(&model, &mut rng);

        let mut scheduler = Scheduler::Cov(CovScheduler::default());
        worker.cool(&mut scheduler, &mut rng);

        let sampler = Sampler::Metropolis(MetropolisSampler::new(0.2, 8.0, 1.0, 3));
        let tallies = worker.walk(&model, &sampler, &mut rng).unwrap();
        assert_eq!(tallies.total(), 16 * 3);
    }
}
