//! Configuration for the dispatcher

use std::time::Duration;

/// Tunables for the dispatch loop
///
/// A batch fires when the pending backlog reaches `batch_size` or when
/// `interval` has elapsed since the last dispatch, whichever comes first.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Events per batch
    pub batch_size: usize,
    /// Maximum time between dispatches while events are pending
    pub interval: Duration,
    /// How long an idle iteration sleeps before re-checking the triggers
    pub idle_poll: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            interval: Duration::from_secs(5),
            idle_poll: Duration::from_secs(1),
        }
    }
}

impl DispatchConfig {
    /// Set the events-per-batch trigger
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the elapsed-time trigger
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the idle re-check cadence
    pub fn with_idle_poll(mut self, idle_poll: Duration) -> Self {
        self.idle_poll = idle_poll;
        self
    }
}
