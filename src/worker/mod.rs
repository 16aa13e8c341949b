//! The execution-strategy hierarchy (spec §4.4): sequential, threaded,
//! distributed, and device-offload workers stacked as decorators over
//! one contract.

pub mod communicator;
pub mod cuda;
pub mod distributed;
pub mod factory;
pub mod sequential;
pub mod threaded;

pub use communicator::{Communicator, LocalCommunicator};
pub use cuda::CudaWorker;
pub use distributed::DistributedWorker;
pub use factory::{build_worker, device_id_for_rank, BuiltWorker};
pub use sequential::SequentialWorker;
pub use threaded::ThreadedWorker;

use crate::cooling_step::CoolingStep;
use crate::error::{CatmipError, Result};
use crate::model::Model;
use crate::sampler::{Sampler, SamplerOps, Tallies};
use crate::scheduler::{Scheduler, SchedulerOps};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::Mutex;

/// Balanced row partition of `total` rows across `parts` workers: base
/// `total / parts` rows each, remainder distributed one row at a time
/// to the lowest-ranked parts (spec §4.4). Shared by the threaded and
/// distributed workers so both honor the same ordering rule.
pub fn partition_counts(total: usize, parts: usize) -> Vec<usize> {
    let base = total / parts;
    let remainder = total % parts;
    (0..parts)
        .map(|i| base + if i < remainder { 1 } else { 0 })
        .collect()
}

/// Walk `step`'s rows split into `tasks` disjoint row-slices concurrently
/// via `rayon::scope`, combining tallies and writing chain state back in
/// place. `tasks <= 1` just walks `step` directly. Factored out of
/// `ThreadedWorker::walk` so `DistributedWorker` can give each rank its
/// own internal thread-wrap (spec §4.4's MPI-wraps-threaded-wraps-base
/// nesting) without duplicating the partition/rayon/rejoin dance.
pub(crate) fn walk_row_partitioned(
    step: &mut CoolingStep,
    tasks: usize,
    model: &dyn Model,
    sampler: &Sampler,
    rng: &mut dyn RngCore,
) -> Result<Tallies> {
    if tasks <= 1 {
        return sampler.walk_chains(model, step, rng);
    }

    let counts = partition_counts(step.samples(), tasks);
    let parameters = step.parameters();
    let beta = step.beta;
    let sigma = step.sigma.clone();

    let mut ranges = Vec::with_capacity(tasks);
    let mut start = 0;
    for count in &counts {
        ranges.push((start, *count));
        start += *count;
    }

    let mut locals: Vec<CoolingStep> = Vec::with_capacity(tasks);
    let mut seeds: Vec<u64> = Vec::with_capacity(tasks);
    for &(row_start, count) in &ranges {
        let mut local = CoolingStep::zeros(count, parameters);
        local.beta = beta;
        local.sigma = sigma.clone();
        for i in 0..count {
            for j in 0..parameters {
                local.theta[(i, j)] = step.theta[(row_start + i, j)];
            }
            local.prior[i] = step.prior[row_start + i];
            local.data[i] = step.data[row_start + i];
            local.posterior[i] = step.posterior[row_start + i];
        }
        locals.push(local);
        seeds.push(rng.next_u64());
    }

    let results: Mutex<Vec<Option<(CoolingStep, Tallies)>>> =
        Mutex::new((0..tasks).map(|_| None).collect());
    let failure: Mutex<Option<CatmipError>> = Mutex::new(None);

    rayon::scope(|scope| {
        for (idx, (mut local, seed)) in locals.into_iter().zip(seeds.into_iter()).enumerate() {
            let results = &results;
            let failure = &failure;
            scope.spawn(move |_| {
                let mut local_rng = StdRng::seed_from_u64(seed);
                match sampler.walk_chains(model, &mut local, &mut local_rng) {
                    Ok(tallies) => results.lock().unwrap()[idx] = Some((local, tallies)),
                    Err(err) => *failure.lock().unwrap() = Some(err),
                }
            });
        }
    });

    if let Some(err) = failure.into_inner().unwrap() {
        return Err(err);
    }

    let results = results.into_inner().unwrap();
    let mut total = Tallies::default();
    for ((row_start, count), slot) in ranges.iter().zip(results.into_iter()) {
        let (local, tallies) = slot.expect("every spawned task reports a result or an error");
        total = total.combine(&tallies);
        for i in 0..*count {
            for j in 0..parameters {
                step.theta[(row_start + i, j)] = local.theta[(i, j)];
            }
            step.prior[row_start + i] = local.prior[i];
            step.data[row_start + i] = local.data[i];
            step.posterior[row_start + i] = local.posterior[i];
        }
    }
    Ok(total)
}

/// The contract every execution strategy implements (spec §4.4):
/// `initialize, start, top, cool, walk, resample, bottom, finish`, plus
/// `step`/`workers`. Workers compose as decorators so capabilities
/// stack (MPI wraps threaded wraps sequential/CUDA).
pub trait Worker {
    /// Build the initial `CoolingStep` (β = 0, θ drawn from the prior,
    /// likelihoods evaluated so posterior = prior).
    fn start(&mut self, model: &dyn Model, rng: &mut dyn RngCore);

    /// Notification that a β-step is about to begin (spec §4.1 betaStart).
    fn top(&mut self) {}

    /// Advance the schedule one increment; returns whether the
    /// root-finder converged (the caller may log a warning otherwise).
    fn cool(&mut self, scheduler: &mut Scheduler, rng: &mut dyn RngCore) -> bool {
        scheduler.update(self.step_mut(), rng)
    }

    /// Walk every chain this worker owns for `sampler`'s inner `steps`
    /// iterations; returns the tallies, summed across any sub-workers.
    fn walk(
        &mut self,
        model: &dyn Model,
        sampler: &Sampler,
        rng: &mut dyn RngCore,
    ) -> Result<Tallies>;

    /// Adapt `sampler`'s scale from the tallies of the walk just run.
    fn resample(&mut self, sampler: &mut Sampler, tallies: &Tallies) {
        sampler.resample(tallies);
    }

    /// Notification that a β-step just ended (spec §4.1 betaFinish).
    fn bottom(&mut self) {}

    /// Notification that the simulation is done; implementations may
    /// release resources here.
    fn finish(&mut self) {}

    /// The worker's local `CoolingStep` (the global one, for
    /// sequential/threaded; the manager's assembled view, for
    /// distributed).
    fn step(&self) -> &CoolingStep;

    /// Mutable access to the same step, for `cool`'s default
    /// implementation and for partitioning in threaded/distributed
    /// workers.
    fn step_mut(&mut self) -> &mut CoolingStep;

    /// Total number of chain-processors this worker commands (1 for
    /// sequential, T for threaded, sum across ranks for distributed).
    fn workers(&self) -> usize;
}
