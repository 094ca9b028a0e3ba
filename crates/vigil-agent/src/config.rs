//! Configuration for the agent service

use std::path::PathBuf;
use std::time::Duration;

use vigil_dispatch::DispatchConfig;
use vigil_queue::QueueConfig;
use vigil_storage::SpoolConfig;

/// Configuration for an [`crate::Agent`]
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Base directory for all agent data
    pub data_dir: PathBuf,
    /// Spool directory; defaults to `<data_dir>/spool`
    pub persistence_path: PathBuf,
    /// Maximum pending messages per type
    pub queue_capacity: usize,
    /// How long a blocking push waits for space
    pub push_timeout: Duration,
    /// Module recorded for messages pushed without one
    pub default_module: String,
    /// Events per outbound batch
    pub dispatch_batch_size: usize,
    /// Maximum time between outbound batches while events are pending
    pub dispatch_interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::with_data_dir("./vigil-data")
    }
}

impl AgentConfig {
    /// Create a configuration rooted at a custom data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            persistence_path: data_dir.join("spool"),
            data_dir,
            queue_capacity: 10_000,
            push_timeout: Duration::from_secs(1),
            default_module: String::new(),
            dispatch_batch_size: 10,
            dispatch_interval: Duration::from_secs(5),
        }
    }

    /// Set the spool directory independently of the data directory
    pub fn with_persistence_path(mut self, persistence_path: impl Into<PathBuf>) -> Self {
        self.persistence_path = persistence_path.into();
        self
    }

    /// Set the per-type queue capacity
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
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

    /// Set the events-per-batch dispatch trigger
    pub fn with_dispatch_batch_size(mut self, dispatch_batch_size: usize) -> Self {
        self.dispatch_batch_size = dispatch_batch_size;
        self
    }

    /// Set the elapsed-time dispatch trigger
    pub fn with_dispatch_interval(mut self, dispatch_interval: Duration) -> Self {
        self.dispatch_interval = dispatch_interval;
        self
    }

    /// The spool configuration this agent opens its store with
    pub fn spool_config(&self) -> SpoolConfig {
        SpoolConfig::with_base_dir(&self.persistence_path)
    }

    /// The queue configuration derived from this agent configuration
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::default()
            .with_capacity(self.queue_capacity)
            .with_push_timeout(self.push_timeout)
            .with_default_module(self.default_module.clone())
    }

    /// The dispatcher configuration derived from this agent configuration
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig::default()
            .with_batch_size(self.dispatch_batch_size)
            .with_interval(self.dispatch_interval)
    }
}
