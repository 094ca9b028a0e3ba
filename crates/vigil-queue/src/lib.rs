//! # Vigil Queue
//!
//! The persistent multi-type bounded message queue at the heart of the
//! agent.
//!
//! [`MultiTypeQueue`] partitions pending messages by [`MessageType`], one
//! durable bounded FIFO shard per type. Producers push with non-blocking,
//! bounded-blocking, or suspending semantics; consumers peek/pop or suspend
//! until data arrives; the dispatcher drains batches across all types and
//! acknowledges delivered rows. Pending messages survive restarts through
//! the [`vigil_storage::MessageStore`] the queue is opened over.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vigil_queue::{Message, MessageType, MultiTypeQueue, QueueConfig};
//! use vigil_storage::{RedbMessageStore, SpoolConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RedbMessageStore::open(SpoolConfig::default())?);
//! let queue = MultiTypeQueue::open(store, QueueConfig::default()).await?;
//!
//! let msg = Message::parse(MessageType::Stateless, r#"{"up": true}"#, "heartbeat")?;
//! queue.push(&msg, false).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod multi_queue;
mod typed_queue;

pub use config::QueueConfig;
pub use error::QueueError;
pub use multi_queue::{MessageRef, MultiTypeQueue};

// Re-export the message model for convenience
pub use vigil_core::{Message, MessageType};
