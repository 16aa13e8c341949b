//! Wall-clock profiling monitor (spec §4.6), grounded on
//! `altar/bayesian/Profiler.py`: pairs every `*Start`/`*Finish` event,
//! records the elapsed `std::time::Instant` duration per β-iteration,
//! and writes a CSV keyed by (worker id, β, P, S, steps) on demand.

use crate::dispatcher::{AnnealerContext, Dispatcher, Event, Monitor};
use crate::error::Result;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

struct ProfilerRecord {
    iteration: usize,
    beta: f64,
    label: &'static str,
    samples: usize,
    parameters: usize,
    duration_secs: f64,
}

struct ProfilerState {
    starts: HashMap<(&'static str, usize), Instant>,
    records: Vec<ProfilerRecord>,
}

/// Records wall-clock durations between paired Start/Finish events.
/// `worker_id`/`steps` are informational, carried into every CSV row
/// (spec §6: "profiler CSVs keyed by (worker-id, β, P, S, steps)").
pub struct ProfilerMonitor {
    worker_id: usize,
    steps: usize,
    state: Arc<Mutex<ProfilerState>>,
}

impl ProfilerMonitor {
    pub fn new(worker_id: usize, steps: usize) -> Self {
        ProfilerMonitor {
            worker_id,
            steps,
            state: Arc::new(Mutex::new(ProfilerState {
                starts: HashMap::new(),
                records: Vec::new(),
            })),
        }
    }

    /// Write every paired duration recorded so far to `path` as CSV with
    /// header `worker_id,iteration,beta,label,samples,parameters,steps,duration_secs`.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let state = self.state.lock().unwrap();
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&[
            "worker_id",
            "iteration",
            "beta",
            "label",
            "samples",
            "parameters",
            "steps",
            "duration_secs",
        ])?;
        for record in &state.records {
            writer.write_record(&[
                self.worker_id.to_string(),
                record.iteration.to_string(),
                record.beta.to_string(),
                record.label.to_string(),
                record.samples.to_string(),
                record.parameters.to_string(),
                self.steps.to_string(),
                record.duration_secs.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }
}

impl Monitor for ProfilerMonitor {
    fn register(&self, dispatcher: &mut Dispatcher) {
        for &event in Event::ALL.iter() {
            let state = Arc::clone(&self.state);
            let is_start = event.is_start();
            dispatcher.on(
                event,
                Box::new(move |ctx: &AnnealerContext| {
                    let mut state = state.lock().unwrap();
                    let key = (event.base_name(), ctx.iteration);
                    if is_start {
                        state.starts.insert(key, Instant::now());
                    } else if let Some(started) = state.starts.remove(&key) {
                        state.records.push(ProfilerRecord {
                            iteration: ctx.iteration,
                            beta: ctx.step.beta,
                            label: event.base_name(),
                            samples: ctx.step.samples(),
                            parameters: ctx.step.parameters(),
                            duration_secs: started.elapsed().as_secs_f64(),
                        });
                    }
                }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cooling_step::CoolingStep;

    #[test]
    fn a_start_finish_pair_produces_one_record() {
        let profiler = ProfilerMonitor::new(0, 20);
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(&profiler);

        let step = CoolingStep::zeros(4, 1);
        let ctx = AnnealerContext { step: &step, iteration: 3 };
        dispatcher.notify(Event::BetaStart, &ctx);
        dispatcher.notify(Event::BetaFinish, &ctx);
        assert_eq!(profiler.record_count(), 1);
    }

    #[test]
    fn an_unmatched_finish_produces_no_record() {
        let profiler = ProfilerMonitor::new(0, 20);
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(&profiler);

        let step = CoolingStep::zeros(4, 1);
        let ctx = AnnealerContext { step: &step, iteration: 0 };
        dispatcher.notify(Event::BetaFinish, &ctx);
        assert_eq!(profiler.record_count(), 0);
    }

    #[test]
    fn write_csv_round_trips_through_a_temp_file() {
        let profiler = ProfilerMonitor::new(1, 5);
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(&profiler);
        let step = CoolingStep::zeros(4, 1);
        let ctx = AnnealerContext { step: &step, iteration: 0 };
        dispatcher.notify(Event::SimulationStart, &ctx);
        dispatcher.notify(Event::SimulationFinish, &ctx);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.csv");
        profiler.write_csv(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("simulation"));
    }
}
