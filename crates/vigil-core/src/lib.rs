//! # Vigil Core
//!
//! Message model shared by every crate of the Vigil agent.
//!
//! A [`Message`] is the unit producers hand to the spool: a routing
//! [`MessageType`], the name of the collector module that produced it, and a
//! JSON payload. Payloads whose top level is an array fan out into one stored
//! row per element; everything else stores as a single row. Stored rows carry
//! the payload normalized into a `{"data": …, "module": …}` envelope so
//! consumers parse one shape regardless of how the row was inserted.

pub mod error;
pub mod message;

pub use error::MessageError;
pub use message::{Message, MessageType};
