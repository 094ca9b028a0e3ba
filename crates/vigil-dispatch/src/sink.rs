//! Delivery sink seam
//!
//! The dispatcher hands each batch to an injected [`EventSink`]. Production
//! wires the manager-facing HTTP POST here; tests inject recording or
//! failing doubles. A successful return authorizes the dispatcher to delete
//! the batch, so a sink must only acknowledge what it has actually accepted.

use async_trait::async_trait;
use thiserror::Error;

/// A delivery attempt the sink could not complete
///
/// The batch stays pending and is retried on a later dispatch cycle.
#[derive(Debug, Error)]
#[error("delivery failed: {0}")]
pub struct SinkError(String);

impl SinkError {
    /// Describe a failed delivery
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Outbound delivery callback the dispatcher drains batches into
///
/// `events` is the batch blob: one serialized event envelope per line.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one batch; `Ok` authorizes deletion of its rows
    async fn deliver(&self, events: &str) -> Result<(), SinkError>;
}
