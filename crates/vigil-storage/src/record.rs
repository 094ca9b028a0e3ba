//! Row model for the spool
//!
//! A row is born pending and stays pending until it is removed, either by an
//! explicit pop or after the dispatcher's delivery is acknowledged. The
//! dispatched state is realized as deletion, so every row physically present
//! in a partition is pending.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vigil_core::MessageType;

/// A row submitted to a partition, not yet assigned an id
///
/// `payload` is the normalized `{"data", "module"}` envelope produced by
/// [`vigil_core::Message::normalized_rows`]; `module` is duplicated outside
/// the envelope so read-side filters never parse payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    /// Producing collector module, possibly empty
    pub module: String,
    /// Normalized payload envelope
    pub payload: Value,
}

impl NewMessage {
    /// Create a row for a partition
    pub fn new(module: impl Into<String>, payload: Value) -> Self {
        Self {
            module: module.into(),
            payload,
        }
    }
}

/// A pending row as persisted in a partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Partition-scoped id, strictly increasing, never reused
    pub id: u64,
    /// Partition the row lives in
    pub kind: MessageType,
    /// Producing collector module, possibly empty
    pub module: String,
    /// Normalized payload envelope
    pub payload: Value,
    /// Wall-clock enqueue time, observability only
    pub enqueued_at: DateTime<Utc>,
}

impl StoredMessage {
    /// Whether this row matches a read-side module filter
    pub fn matches_module(&self, filter: Option<&str>) -> bool {
        filter.is_none_or(|module| self.module == module)
    }
}
