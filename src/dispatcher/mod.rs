//! The event dispatcher (spec §4.6): a closed [`Event`] set mapped to
//! vectors of handler closures. Grounded on
//! `altar/simulations/Dispatcher.py` + `altar/bayesian/Notifier.py`'s
//! named-event observer pattern, realized here as the "vector of handler
//! closures per event" strategy from spec §9.

pub mod event;

pub use event::Event;

use crate::cooling_step::CoolingStep;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// The read-only view of simulation state a handler receives: the
/// current step and which β-iteration it belongs to.
pub struct AnnealerContext<'a> {
    pub step: &'a CoolingStep,
    pub iteration: usize,
}

pub type Handler = Box<dyn FnMut(&AnnealerContext) + Send>;

/// A monitor contributes zero or more handlers to a [`Dispatcher`] via
/// `register`. Typically a monitor owns its state behind an `Arc<Mutex<_>>`
/// and clones the handle into each closure it subscribes, since one
/// monitor commonly needs to react to more than one event (e.g. a
/// profiler pairs a `*Start` with its matching `*Finish`).
pub trait Monitor {
    fn register(&self, dispatcher: &mut Dispatcher);
}

/// Maps event names to subscribed handlers and notifies them in
/// subscription order. Handler panics are caught and logged rather than
/// propagated, per spec §7 ("Monitors never originate errors; handler
/// exceptions are logged and suppressed").
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<Event, Vec<Handler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher {
            handlers: HashMap::new(),
        }
    }

    /// Subscribe one handler closure to `event`.
    pub fn on(&mut self, event: Event, handler: Handler) {
        self.handlers.entry(event).or_insert_with(Vec::new).push(handler);
    }

    /// Let `monitor` subscribe whatever handlers it needs.
    pub fn register(&mut self, monitor: &dyn Monitor) {
        monitor.register(self);
    }

    /// Invoke every handler subscribed to `event`, in subscription
    /// order. A handler that panics is caught and logged; the rest still
    /// run.
    pub fn notify(&mut self, event: Event, ctx: &AnnealerContext) {
        if let Some(handlers) = self.handlers.get_mut(&event) {
            for handler in handlers.iter_mut() {
                let handler = AssertUnwindSafe(&mut *handler);
                if catch_unwind(move || (handler.0)(ctx)).is_err() {
                    log::error!("dispatcher handler for {:?} panicked; suppressing", event);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn notify_invokes_every_subscribed_handler_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        let c1 = Arc::clone(&calls);
        dispatcher.on(Event::BetaStart, Box::new(move |_ctx| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));
        let c2 = Arc::clone(&calls);
        dispatcher.on(Event::BetaStart, Box::new(move |_ctx| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        let step = CoolingStep::zeros(4, 1);
        let ctx = AnnealerContext { step: &step, iteration: 0 };
        dispatcher.notify(Event::BetaStart, &ctx);
        assert_eq!(calls.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn notify_on_unsubscribed_event_is_a_noop() {
        let mut dispatcher = Dispatcher::new();
        let step = CoolingStep::zeros(2, 1);
        let ctx = AnnealerContext { step: &step, iteration: 0 };
        dispatcher.notify(Event::SimulationFinish, &ctx);
    }

    #[test]
    fn a_panicking_handler_does_not_stop_the_rest() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        dispatcher.on(Event::SimulationStart, Box::new(|_ctx| {
            panic!("boom");
        }));
        let c = Arc::clone(&calls);
        dispatcher.on(Event::SimulationStart, Box::new(move |_ctx| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        let step = CoolingStep::zeros(2, 1);
        let ctx = AnnealerContext { step: &step, iteration: 0 };
        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));
        dispatcher.notify(Event::SimulationStart, &ctx);
        std::panic::set_hook(prev_hook);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
