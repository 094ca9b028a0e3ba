//! Configuration for the message queue

use std::time::Duration;

/// Configuration applied to every shard of a [`crate::MultiTypeQueue`]
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum pending rows per message type
    pub capacity: usize,
    /// How long a blocking push waits for space before giving up
    pub push_timeout: Duration,
    /// Module recorded for messages pushed without one; empty disables the
    /// substitution
    pub default_module: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            push_timeout: Duration::from_secs(1),
            default_module: String::new(),
        }
    }
}

impl QueueConfig {
    /// Set the per-shard capacity
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the blocking-push wait budget
    pub fn with_push_timeout(mut self, push_timeout: Duration) -> Self {
        self.push_timeout = push_timeout;
        self
    }

    /// Set the module recorded for unattributed messages
    pub fn with_default_module(mut self, default_module: impl Into<String>) -> Self {
        self.default_module = default_module.into();
        self
    }
}
