//! The outer cooling loop (spec §4.1): the `Annealer` wires a scheduler,
//! a sampler, a dispatcher, an optional archiver, and one `Worker`
//! together and drives β from 0 to (within `tolerance` of) 1. Grounded
//! on `altar/bayesian/Annealer.py::posterior` -- the event ordering below
//! is copied exactly -- and `Controller.py`'s protocol shape.

use crate::archiver::Archiver;
use crate::config::RngAlgorithm;
use crate::cooling_step::CoolingStep;
use crate::dispatcher::{AnnealerContext, Dispatcher, Event, Monitor};
use crate::error::Result;
use crate::model::Model;
use crate::rng::rng_for_rank_with;
use crate::sampler::{Sampler, SamplerOps, Tallies};
use crate::scheduler::{Scheduler, SchedulerOps};
use crate::worker::Worker;
use rand::RngCore;

/// Snapshot of one completed β-step, retained in the [`AnnealerReport`]
/// for callers and tests that want the full cooling history rather
/// than just the final state.
#[derive(Clone, Debug)]
pub struct BetaStepSummary {
    pub iteration: usize,
    pub beta: f64,
    pub achieved_cov: f64,
    pub scheduler_converged: bool,
    pub proposal_scale: f64,
    pub tallies: Tallies,
}

/// What `Annealer::posterior` hands back in place of spec §4.1's bare
/// status code: the achieved-COV/tally history plus the final state,
/// which a thin CLI (out of scope here) can still reduce to an exit
/// code if it wants one.
#[derive(Clone, Debug)]
pub struct AnnealerReport {
    pub steps: Vec<BetaStepSummary>,
    pub final_step: CoolingStep,
}

impl AnnealerReport {
    /// Total number of β-steps taken to reach the stopping condition.
    pub fn iterations(&self) -> usize {
        self.steps.len()
    }
}

/// The cooling-loop controller. Owns the `Worker` that actually carries
/// out each step; `scheduler`/`sampler`/`dispatcher` are shared
/// collaborators driven once per β.
pub struct Annealer<W: Worker> {
    pub worker: W,
    pub scheduler: Scheduler,
    pub sampler: Sampler,
    pub dispatcher: Dispatcher,
    pub archiver: Option<Archiver>,
    pub tolerance: f64,
    rng: Box<dyn RngCore>,
}

impl<W: Worker> Annealer<W> {
    /// `seed` is the base seed for the manager's own RNG stream, drawn
    /// from the same rank-0 offset formula every worker uses (spec
    /// §4.4/§9) so a sequential run and a distributed run share the
    /// same rank-0 stream. Uses the default `rng.algorithm` (spec §6),
    /// `StdRng`; use [`Annealer::with_algorithm`] to pick
    /// `Xoshiro256StarStar` instead.
    pub fn new(worker: W, scheduler: Scheduler, sampler: Sampler, tolerance: f64, seed: u64) -> Self {
        Self::with_algorithm(worker, scheduler, sampler, tolerance, seed, RngAlgorithm::Standard)
    }

    /// Like [`Annealer::new`], but selecting the `rng.algorithm`
    /// configuration option (spec §6) explicitly.
    pub fn with_algorithm(
        worker: W,
        scheduler: Scheduler,
        sampler: Sampler,
        tolerance: f64,
        seed: u64,
        algorithm: RngAlgorithm,
    ) -> Self {
        Annealer {
            worker,
            scheduler,
            sampler,
            dispatcher: Dispatcher::new(),
            archiver: None,
            tolerance,
            rng: rng_for_rank_with(algorithm, seed, 0),
        }
    }

    pub fn with_archiver(mut self, archiver: Archiver) -> Self {
        self.archiver = Some(archiver);
        self
    }

    /// Subscribe `monitor`'s handlers to this annealer's dispatcher.
    pub fn register(&mut self, monitor: &dyn Monitor) {
        self.dispatcher.register(monitor);
    }

    fn notify(&mut self, event: Event, iteration: usize) {
        let step = self.worker.step();
        let ctx = AnnealerContext { step, iteration };
        self.dispatcher.notify(event, &ctx);
    }

    /// Run the cooling loop to completion for `model` and return a
    /// report of every β-step taken.
    ///
    /// Loop, per spec §4.1:
    /// `[simulationStart] start` then while `β + tolerance < 1`:
    /// `[betaStart] top → cool → [walkChainsStart] walk [walkChainsFinish]
    /// → [resampleStart] resample [resampleFinish] → bottom [betaFinish]`,
    /// then `[simulationFinish] finish` and archive the final state.
    pub fn posterior(&mut self, model: &dyn Model) -> Result<AnnealerReport> {
        self.notify(Event::SimulationStart, 0);
        self.worker.start(model, self.rng.as_mut());
        self.notify(Event::SamplePosteriorStart, 0);

        let mut steps = Vec::new();
        let mut iteration = 0usize;

        while self.worker.step().beta + self.tolerance < 1.0 {
            self.notify(Event::BetaStart, iteration);
            self.worker.top();
            model.top(self.worker.step());

            let converged = self.worker.cool(&mut self.scheduler, self.rng.as_mut());
            if !converged {
                log::warn!(
                    "COV root-finder did not converge within maxiter at iteration {} \
                     (achieved COV = {:.6}); proceeding with best beta found",
                    iteration,
                    self.scheduler.achieved_cov()
                );
            }

            self.notify(Event::WalkChainsStart, iteration);
            let tallies = self.worker.walk(model, &self.sampler, self.rng.as_mut())?;
            self.notify(Event::WalkChainsFinish, iteration);

            self.notify(Event::ResampleStart, iteration);
            self.worker.resample(&mut self.sampler, &tallies);
            self.notify(Event::ResampleFinish, iteration);

            self.worker.bottom();
            model.bottom(self.worker.step());
            self.notify(Event::BetaFinish, iteration);

            let proposal_scale = match &self.sampler {
                Sampler::Metropolis(inner) => inner.scale,
            };

            if let Some(archiver) = &self.archiver {
                archiver.write_checkpoint(self.worker.step())?;
            }

            steps.push(BetaStepSummary {
                iteration,
                beta: self.worker.step().beta,
                achieved_cov: self.scheduler.achieved_cov(),
                scheduler_converged: converged,
                proposal_scale,
                tallies,
            });

            iteration += 1;
        }

        self.notify(Event::SamplePosteriorFinish, iteration);
        self.worker.finish();
        self.notify(Event::SimulationFinish, iteration);

        let final_step = self.worker.step().clone();
        if let Some(archiver) = &self.archiver {
            archiver.write_final(&final_step)?;
        }

        Ok(AnnealerReport { steps, final_step })
    }
}
