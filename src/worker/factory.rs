//! Worker selection from `JobConfig` (spec §6 `job.hosts/tasks/gpus/mode`).
//! Grounded line-for-line on `altar/bayesian/Annealer.py::deduceAnnealingMethod`:
//! a GPU-or-sequential base worker, thread-wrapped outside MPI when
//! `tasks > 1 || gpus > 1`, thread-wrapped-per-rank inside MPI only when
//! `gpus > 1`, and always MPI-wrapped when `job.mode == Mpi`.

use crate::config::{JobConfig, JobMode};
use crate::cooling_step::CoolingStep;
use crate::error::Result;
use crate::model::Model;
use crate::sampler::{Sampler, Tallies};
use crate::scheduler::Scheduler;
use crate::worker::{CudaWorker, DistributedWorker, SequentialWorker, ThreadedWorker, Worker};
use rand::RngCore;

/// The worker nesting [`build_worker`] selected for a given `JobConfig`.
/// One variant per leaf/composite the decision table can reach; dispatch
/// to the contained worker's [`Worker`] impl.
pub enum BuiltWorker {
    Sequential(SequentialWorker),
    Cuda(CudaWorker),
    Threaded(ThreadedWorker),
    Distributed(DistributedWorker),
}

/// `rank mod gpus_per_task` (spec §4.4): the CUDA device a given rank is
/// assigned. `gpus_per_task == 0` (no GPUs configured) maps every rank to
/// device `0`, matching a single-device/no-device local run rather than
/// dividing by zero.
pub fn device_id_for_rank(rank: usize, gpus_per_task: usize) -> usize {
    rank % gpus_per_task.max(1)
}

/// Build the worker `job` selects for `samples` total chains over a
/// `parameters`-dimensional θ, seeding every rank's RNG stream from
/// `base_seed` (spec §4.4/§9's `partition_seed`). Mirrors
/// `deduceAnnealingMethod`'s table:
///
/// - base worker: CUDA if `job.gpus > 0`, else sequential.
/// - outside MPI: thread-wrap the base when `job.tasks > 1 || job.gpus >
///   1`, with `threads = job.tasks * job.gpus`, falling back to whichever
///   of `tasks`/`gpus` is nonzero when the product is zero (the Python
///   `tasks*gpus or tasks or gpus` short-circuit); otherwise the base
///   worker runs alone.
/// - inside MPI: thread-wrap each rank's walk only when `job.gpus > 1`
///   (`threads_per_rank = job.gpus`), then always wrap in the
///   distributed/MPI layer, sized to `job.hosts` ranks.
pub fn build_worker(job: &JobConfig, samples: usize, parameters: usize, base_seed: u64) -> BuiltWorker {
    match job.mode {
        JobMode::Local => {
            if job.tasks > 1 || job.gpus > 1 {
                let threads = local_thread_count(job.tasks, job.gpus);
                BuiltWorker::Threaded(ThreadedWorker::new(samples, parameters, threads))
            } else if job.gpus > 0 {
                let device_id = device_id_for_rank(0, job.gpus);
                BuiltWorker::Cuda(CudaWorker::new(samples, parameters, device_id))
            } else {
                BuiltWorker::Sequential(SequentialWorker::new(samples, parameters))
            }
        }
        JobMode::Mpi => {
            let num_ranks = job.hosts.max(1);
            let threads_per_rank = if job.gpus > 1 { job.gpus } else { 1 };
            BuiltWorker::Distributed(DistributedWorker::with_threads(
                samples,
                parameters,
                num_ranks,
                base_seed,
                threads_per_rank,
                job.gpus,
            ))
        }
    }
}

/// `tasks*gpus or tasks or gpus`: the product if nonzero, else whichever
/// operand is nonzero, else `1` (there is always at least one task).
fn local_thread_count(tasks: usize, gpus: usize) -> usize {
    let product = tasks * gpus;
    if product > 0 {
        product
    } else if tasks > 0 {
        tasks
    } else if gpus > 0 {
        gpus
    } else {
        1
    }
}

impl Worker for BuiltWorker {
    fn start(&mut self, model: &dyn Model, rng: &mut dyn RngCore) {
        match self {
            BuiltWorker::Sequential(w) => w.start(model, rng),
            BuiltWorker::Cuda(w) => w.start(model, rng),
            BuiltWorker::Threaded(w) => w.start(model, rng),
            BuiltWorker::Distributed(w) => w.start(model, rng),
        }
    }

    fn top(&mut self) {
        match self {
            BuiltWorker::Sequential(w) => w.top(),
            BuiltWorker::Cuda(w) => w.top(),
            BuiltWorker::Threaded(w) => w.top(),
            BuiltWorker::Distributed(w) => w.top(),
        }
    }

    fn cool(&mut self, scheduler: &mut Scheduler, rng: &mut dyn RngCore) -> bool {
        match self {
            BuiltWorker::Sequential(w) => w.cool(scheduler, rng),
            BuiltWorker::Cuda(w) => w.cool(scheduler, rng),
            BuiltWorker::Threaded(w) => w.cool(scheduler, rng),
            BuiltWorker::Distributed(w) => w.cool(scheduler, rng),
        }
    }

    fn walk(&mut self, model: &dyn Model, sampler: &Sampler, rng: &mut dyn RngCore) -> Result<Tallies> {
        match self {
            BuiltWorker::Sequential(w) => w.walk(model, sampler, rng),
            BuiltWorker::Cuda(w) => w.walk(model, sampler, rng),
            BuiltWorker::Threaded(w) => w.walk(model, sampler, rng),
            BuiltWorker::Distributed(w) => w.walk(model, sampler, rng),
        }
    }

    fn resample(&mut self, sampler: &mut Sampler, tallies: &Tallies) {
        match self {
            BuiltWorker::Sequential(w) => w.resample(sampler, tallies),
            BuiltWorker::Cuda(w) => w.resample(sampler, tallies),
            BuiltWorker::Threaded(w) => w.resample(sampler, tallies),
            BuiltWorker::Distributed(w) => w.resample(sampler, tallies),
        }
    }

    fn bottom(&mut self) {
        match self {
            BuiltWorker::Sequential(w) => w.bottom(),
            BuiltWorker::Cuda(w) => w.bottom(),
            BuiltWorker::Threaded(w) => w.bottom(),
            BuiltWorker::Distributed(w) => w.bottom(),
        }
    }

    fn finish(&mut self) {
        match self {
            BuiltWorker::Sequential(w) => w.finish(),
            BuiltWorker::Cuda(w) => w.finish(),
            BuiltWorker::Threaded(w) => w.finish(),
            BuiltWorker::Distributed(w) => w.finish(),
        }
    }

    fn step(&self) -> &CoolingStep {
        match self {
            BuiltWorker::Sequential(w) => w.step(),
            BuiltWorker::Cuda(w) => w.step(),
            BuiltWorker::Threaded(w) => w.step(),
            BuiltWorker::Distributed(w) => w.step(),
        }
    }

    fn step_mut(&mut self) -> &mut CoolingStep {
        match self {
            BuiltWorker::Sequential(w) => w.step_mut(),
            BuiltWorker::Cuda(w) => w.step_mut(),
            BuiltWorker::Threaded(w) => w.step_mut(),
            BuiltWorker::Distributed(w) => w.step_mut(),
        }
    }

    fn workers(&self) -> usize {
        match self {
            BuiltWorker::Sequential(w) => w.workers(),
            BuiltWorker::Cuda(w) => w.workers(),
            BuiltWorker::Threaded(w) => w.workers(),
            BuiltWorker::Distributed(w) => w.workers(),
        }
    }
}
