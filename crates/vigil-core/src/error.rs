//! Error types for message construction

use thiserror::Error;

/// Errors raised while building a [`crate::Message`]
#[derive(Debug, Error)]
pub enum MessageError {
    /// Payload text is not a syntactically valid JSON document
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}
