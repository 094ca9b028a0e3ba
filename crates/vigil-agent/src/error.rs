//! Error types for the agent service

use thiserror::Error;

use vigil_queue::QueueError;
use vigil_storage::StorageError;

/// Errors raised while starting the agent
#[derive(Debug, Error)]
pub enum AgentError {
    /// The spool directory or a partition could not be opened
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The queue could not recover its shards
    #[error(transparent)]
    Queue(#[from] QueueError),
}
