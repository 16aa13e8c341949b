//! Forwards every dispatcher event to the ordinary `log` channel (spec
//! §4.6, supplementing the original's `Notifier.py` journal-logging
//! monitor). This is the ambient logging path underneath the
//! domain-specific dispatcher/monitor layer: even a build with no
//! profiler configured still gets event-level `debug!` traces.

use crate::dispatcher::{AnnealerContext, Dispatcher, Event, Monitor};

pub struct LogMonitor;

impl LogMonitor {
    pub fn new() -> Self {
        LogMonitor
    }
}

impl Default for LogMonitor {
    fn default() -> Self {
        LogMonitor::new()
    }
}

impl Monitor for LogMonitor {
    fn register(&self, dispatcher: &mut Dispatcher) {
        for &event in Event::ALL.iter() {
            dispatcher.on(
                event,
                Box::new(move |ctx: &AnnealerContext| {
                    log::debug!(
                        "{:?} at iteration {} (beta = {:.6})",
                        event,
                        ctx.iteration,
                        ctx.step.beta
                    );
                }),
            );
        }
    }
}
