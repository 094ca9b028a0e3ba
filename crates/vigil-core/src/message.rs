//! Messages and their routing types

use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::MessageError;

/// Routing class of a message; picks the spool partition it lands in
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Fire-and-forget telemetry (log events, alerts)
    #[display("stateless")]
    Stateless,
    /// Inventory and integrity state the manager reconciles
    #[display("stateful")]
    Stateful,
    /// Commands pulled down from the manager
    #[display("command")]
    Command,
}

impl MessageType {
    /// Every message type, in the order partitions are drained
    pub const ALL: [MessageType; 3] = [
        MessageType::Stateless,
        MessageType::Stateful,
        MessageType::Command,
    ];

    /// Stable name used for partition files and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Stateless => "stateless",
            MessageType::Stateful => "stateful",
            MessageType::Command => "command",
        }
    }
}

/// The unit producers push into the spool
///
/// `module` names the collector that produced the payload and may be empty.
/// A payload whose top level is an array is a multi-message: it fans out
/// into one stored row per element when pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Routing class
    pub kind: MessageType,
    /// Producing collector module, possibly empty
    pub module: String,
    /// JSON payload
    pub payload: Value,
}

impl Message {
    /// Create a message with no module attribution
    pub fn new(kind: MessageType, payload: Value) -> Self {
        Self {
            kind,
            module: String::new(),
            payload,
        }
    }

    /// Create a message attributed to a collector module
    pub fn with_module(kind: MessageType, payload: Value, module: impl Into<String>) -> Self {
        Self {
            kind,
            module: module.into(),
            payload,
        }
    }

    /// Parse a message payload from text, validating it is a JSON document
    pub fn parse(
        kind: MessageType,
        payload: &str,
        module: impl Into<String>,
    ) -> Result<Self, MessageError> {
        let payload = serde_json::from_str(payload)?;
        Ok(Self::with_module(kind, payload, module))
    }

    /// The empty-peek sentinel: requested type and module, `{}` payload
    ///
    /// Consumers distinguish "nothing queued" from real data by inspecting
    /// the payload, not by an error path.
    pub fn sentinel(kind: MessageType, module: impl Into<String>) -> Self {
        Self::with_module(kind, json!({}), module)
    }

    /// Whether this is the empty-peek sentinel
    pub fn is_sentinel(&self) -> bool {
        self.payload.as_object().is_some_and(|map| map.is_empty())
    }

    /// Number of stored rows a push of this message produces
    pub fn row_count(&self) -> usize {
        match &self.payload {
            Value::Array(items) => items.len(),
            _ => 1,
        }
    }

    /// Expand into per-row payloads, each wrapped in the storage envelope
    ///
    /// Array payloads yield one envelope per element; any other payload
    /// yields exactly one. Every envelope carries this message's module.
    pub fn normalized_rows(&self) -> Vec<Value> {
        match &self.payload {
            Value::Array(items) => items
                .iter()
                .map(|item| envelope(item, &self.module))
                .collect(),
            other => vec![envelope(other, &self.module)],
        }
    }
}

/// Wrap one payload element in the `{"data", "module"}` storage envelope
fn envelope(data: &Value, module: &str) -> Value {
    json!({ "data": data, "module": module })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_are_stable() {
        assert_eq!(MessageType::Stateless.as_str(), "stateless");
        assert_eq!(MessageType::Stateful.to_string(), "stateful");
        assert_eq!(MessageType::Command.as_str(), "command");
        assert_eq!(MessageType::ALL.len(), 3);
    }

    #[test]
    fn test_parse_valid_payload() {
        let msg = Message::parse(MessageType::Stateless, r#"{"data": "x"}"#, "inventory").unwrap();
        assert_eq!(msg.kind, MessageType::Stateless);
        assert_eq!(msg.module, "inventory");
        assert_eq!(msg.payload, json!({"data": "x"}));
    }

    #[test]
    fn test_parse_rejects_malformed_payload() {
        let err = Message::parse(MessageType::Command, "{broken", "");
        assert!(matches!(err, Err(MessageError::Payload(_))));
    }

    #[test]
    fn test_row_count_follows_array_rule() {
        let single = Message::new(MessageType::Stateful, json!({"one": 1}));
        assert_eq!(single.row_count(), 1);

        let multi = Message::new(MessageType::Stateless, json!(["a", "b", "c"]));
        assert_eq!(multi.row_count(), 3);

        let scalar = Message::new(MessageType::Stateless, json!("bare"));
        assert_eq!(scalar.row_count(), 1);
    }

    #[test]
    fn test_normalized_rows_envelope_each_element() {
        let msg = Message::with_module(
            MessageType::Stateless,
            json!(["content 1", "content 2"]),
            "scanner",
        );
        let rows = msg.normalized_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], json!({"data": "content 1", "module": "scanner"}));
        assert_eq!(rows[1], json!({"data": "content 2", "module": "scanner"}));
    }

    #[test]
    fn test_normalized_rows_single_object() {
        let msg = Message::new(MessageType::Stateful, json!({"cpu": 4}));
        let rows = msg.normalized_rows();
        assert_eq!(rows, vec![json!({"data": {"cpu": 4}, "module": ""})]);
    }

    #[test]
    fn test_sentinel_shape() {
        let sentinel = Message::sentinel(MessageType::Command, "updater");
        assert_eq!(sentinel.kind, MessageType::Command);
        assert_eq!(sentinel.module, "updater");
        assert_eq!(sentinel.payload, json!({}));
        assert!(sentinel.is_sentinel());

        let real = Message::new(MessageType::Command, json!({"data": 1}));
        assert!(!real.is_sentinel());
    }

    #[test]
    fn test_object_equality_ignores_key_order() {
        // Values compare by key set, while serialization preserves insertion
        // order. Both properties are load-bearing for the wire format.
        let a: Value = serde_json::from_str(r#"{"version": 1, "type": "integer"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"type": "integer", "version": 1}"#).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.to_string(), b.to_string());
    }
}
