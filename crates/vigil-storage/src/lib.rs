//! # Vigil Storage
//!
//! Durable spool storage for pending agent messages.
//!
//! Each [`MessageType`] gets its own partition: an id-ordered set of pending
//! rows with a persisted next-id watermark. The queue layer is generic over
//! the [`MessageStore`] capability; two implementations ship here:
//!
//! - [`RedbMessageStore`]: one redb database file per partition under a
//!   base directory; survives restarts.
//! - [`InMemoryMessageStore`]: the same contract over a `BTreeMap`; used by
//!   tests and diskless deployments.
//!
//! Appends of several rows happen in one storage transaction, so a
//! multi-message fan-out lands whole or not at all.

pub mod error;
pub mod memory;
pub mod record;
pub mod spool;

pub use error::StorageError;
pub use memory::InMemoryMessageStore;
pub use record::{NewMessage, StoredMessage};
pub use spool::{RedbMessageStore, SpoolConfig};

use async_trait::async_trait;
use vigil_core::MessageType;

/// Capability the queue uses to persist pending messages
///
/// Rows within a partition are FIFO by id. `limit`/`module` parameters are
/// read-side only and never reorder storage. Implementations must be safe
/// for concurrent use from multiple tasks within one process; cross-process
/// sharing is out of scope.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Ensure the partition for `kind` exists; idempotent
    async fn open_partition(&self, kind: MessageType) -> Result<(), StorageError>;

    /// Append rows to a partition in one transaction, returning their ids
    ///
    /// Ids are assigned ascending in argument order. Either every row is
    /// persisted or none is.
    async fn append(
        &self,
        kind: MessageType,
        rows: Vec<NewMessage>,
    ) -> Result<Vec<u64>, StorageError>;

    /// Read up to `limit` lowest-id rows in ascending id order
    ///
    /// With a module filter, only rows whose module matches exactly are
    /// returned (still up to `limit` of them).
    async fn read_pending(
        &self,
        kind: MessageType,
        limit: usize,
        module: Option<&str>,
    ) -> Result<Vec<StoredMessage>, StorageError>;

    /// Count pending rows, optionally restricted to one module
    async fn count_pending(
        &self,
        kind: MessageType,
        module: Option<&str>,
    ) -> Result<usize, StorageError>;

    /// Delete rows by id; unknown ids are ignored
    ///
    /// Returns the number of rows actually removed.
    async fn remove(&self, kind: MessageType, ids: &[u64]) -> Result<usize, StorageError>;

    /// Mark rows delivered
    ///
    /// The spool realizes the dispatched state as deletion, so this is
    /// [`MessageStore::remove`] under its contract-level name. Idempotent on
    /// ids already removed.
    async fn mark_dispatched(&self, kind: MessageType, ids: &[u64]) -> Result<usize, StorageError> {
        self.remove(kind, ids).await
    }
}
