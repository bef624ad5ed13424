//! Signal fan-out with per-subscriber fault isolation.

use std::panic::{AssertUnwindSafe, catch_unwind};

use super::GameSignal;
use crate::encounter::Encounter;

/// A consumer of game signals (overlay feed, timer engine, recap builder).
pub trait SignalHandler {
    fn handle_signal(&mut self, signal: &GameSignal, encounter: Option<&Encounter>);

    fn handle_signals(&mut self, signals: &[GameSignal], encounter: Option<&Encounter>) {
        for signal in signals {
            self.handle_signal(signal, encounter);
        }
    }
}

/// Deliver a signal batch to every handler.
///
/// A handler that panics is logged and skipped for this batch; the
/// remaining handlers still run, so one broken consumer can't break log
/// ingestion or starve its peers.
pub fn dispatch_signals(
    handlers: &mut [Box<dyn SignalHandler + Send>],
    signals: &[GameSignal],
    encounter: Option<&Encounter>,
) {
    if signals.is_empty() {
        return;
    }
    for (idx, handler) in handlers.iter_mut().enumerate() {
        let result = catch_unwind(AssertUnwindSafe(|| {
            handler.handle_signals(signals, encounter);
        }));
        if let Err(panic) = result {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(handler_idx = idx, %message, "signal handler panicked");
        }
    }
}
