//! # Vigil Dispatch
//!
//! The batching dispatcher that relays spooled events to the manager.
//!
//! A [`Dispatcher`] runs as a background task over a
//! [`vigil_queue::MultiTypeQueue`]. Each cycle it checks the backlog size
//! and the elapsed interval; when either trigger fires it fetches a batch
//! across all message types, joins the serialized event envelopes into a
//! newline-separated blob, and hands it to the injected [`EventSink`].
//! Rows are acknowledged (and deleted) only after the sink accepts the blob,
//! so delivery is at-least-once and a flaky manager connection just delays
//! the spool instead of losing it.

pub mod config;
pub mod dispatcher;
pub mod sink;

pub use config::DispatchConfig;
pub use dispatcher::Dispatcher;
pub use sink::{EventSink, SinkError};
