//! Error types for queue operations

use thiserror::Error;

use vigil_storage::StorageError;

/// Errors surfaced by queue operations
///
/// A full shard is not an error: a non-blocking push that would overflow
/// returns an enqueue count of zero instead.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The spool failed underneath the queue; rows on disk stay pending
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A suspended awaitable was resolved by queue shutdown
    #[error("operation cancelled by shutdown")]
    Cancelled,

    /// The operation was started after shutdown began
    #[error("queue is shutting down")]
    ShuttingDown,
}
