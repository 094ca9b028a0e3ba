//! redb-backed spool partitions
//!
//! One database file per message type under the spool directory. Each file
//! holds a message table (`id -> row`) and a meta table carrying the next-id
//! watermark, updated in the same write transaction as appends so ids are
//! never reused even when the tail of the partition has been drained.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, trace};

use vigil_core::MessageType;

use crate::error::StorageError;
use crate::record::{NewMessage, StoredMessage};
use crate::MessageStore;

// Key: partition-scoped row id, Value: serialized RowValue
const MESSAGES: TableDefinition<u64, &[u8]> = TableDefinition::new("messages");

// Key: meta field name, Value: counter
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_ID_KEY: &str = "next_id";

/// Configuration for the on-disk spool
#[derive(Debug, Clone)]
pub struct SpoolConfig {
    /// Directory holding one database file per message type
    pub base_dir: PathBuf,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./vigil-data/spool"),
        }
    }
}

impl SpoolConfig {
    /// Create a configuration rooted at a custom directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

/// On-disk value of one row; id is the table key, kind is the file
#[derive(Debug, Serialize, Deserialize)]
struct RowValue {
    module: String,
    payload: Value,
    enqueued_at: DateTime<Utc>,
}

impl RowValue {
    fn into_stored(self, id: u64, kind: MessageType) -> StoredMessage {
        StoredMessage {
            id,
            kind,
            module: self.module,
            payload: self.payload,
            enqueued_at: self.enqueued_at,
        }
    }
}

/// Persistent [`MessageStore`] over per-type redb files
pub struct RedbMessageStore {
    config: SpoolConfig,
    partitions: RwLock<HashMap<MessageType, Arc<Database>>>,
}

impl RedbMessageStore {
    /// Open the spool directory, creating it if needed
    ///
    /// Partition files open lazily on first use and keep whatever rows a
    /// previous run left pending.
    #[instrument(skip(config), fields(dir = %config.base_dir.display()))]
    pub fn open(config: SpoolConfig) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&config.base_dir)?;

        info!("Opened message spool");

        Ok(Self {
            config,
            partitions: RwLock::new(HashMap::new()),
        })
    }

    /// Path of the database file backing one partition
    fn partition_path(&self, kind: MessageType) -> PathBuf {
        self.config.base_dir.join(format!("{}.redb", kind.as_str()))
    }

    /// Get the open database for `kind`, opening and initializing it once
    async fn partition(&self, kind: MessageType) -> Result<Arc<Database>, StorageError> {
        if let Some(db) = self.partitions.read().await.get(&kind) {
            return Ok(Arc::clone(db));
        }

        let mut partitions = self.partitions.write().await;
        // Lost the race to another opener
        if let Some(db) = partitions.get(&kind) {
            return Ok(Arc::clone(db));
        }

        let path = self.partition_path(kind);
        let db = Database::create(&path).map_err(|e| StorageError::Database(e.to_string()))?;

        // Create tables so later read transactions never see a missing table
        let write_txn = db
            .begin_write()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        write_txn
            .open_table(MESSAGES)
            .map_err(|e| StorageError::Database(e.to_string()))?;
        write_txn
            .open_table(META)
            .map_err(|e| StorageError::Database(e.to_string()))?;
        write_txn
            .commit()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        debug!(kind = %kind, path = %path.display(), "Opened spool partition");

        let db = Arc::new(db);
        partitions.insert(kind, Arc::clone(&db));
        Ok(db)
    }
}

#[async_trait]
impl MessageStore for RedbMessageStore {
    async fn open_partition(&self, kind: MessageType) -> Result<(), StorageError> {
        self.partition(kind).await.map(|_| ())
    }

    async fn append(
        &self,
        kind: MessageType,
        rows: Vec<NewMessage>,
    ) -> Result<Vec<u64>, StorageError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let db = self.partition(kind).await?;
        let write_txn = db
            .begin_write()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let mut ids = Vec::with_capacity(rows.len());
        {
            let mut meta = write_txn
                .open_table(META)
                .map_err(|e| StorageError::Database(e.to_string()))?;
            let mut next = meta
                .get(NEXT_ID_KEY)
                .map_err(|e| StorageError::Database(e.to_string()))?
                .map(|guard| guard.value())
                .unwrap_or(1);

            let mut messages = write_txn
                .open_table(MESSAGES)
                .map_err(|e| StorageError::Database(e.to_string()))?;

            let enqueued_at = Utc::now();
            for row in rows {
                let value = RowValue {
                    module: row.module,
                    payload: row.payload,
                    enqueued_at,
                };
                let bytes = serde_json::to_vec(&value)?;
                messages
                    .insert(next, bytes.as_slice())
                    .map_err(|e| StorageError::Database(e.to_string()))?;
                ids.push(next);
                next += 1;
            }

            meta.insert(NEXT_ID_KEY, next)
                .map_err(|e| StorageError::Database(e.to_string()))?;
        }

        write_txn
            .commit()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        debug!(kind = %kind, rows = ids.len(), "Appended rows to spool");
        Ok(ids)
    }

    async fn read_pending(
        &self,
        kind: MessageType,
        limit: usize,
        module: Option<&str>,
    ) -> Result<Vec<StoredMessage>, StorageError> {
        let db = self.partition(kind).await?;
        let read_txn = db
            .begin_read()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        let messages = read_txn
            .open_table(MESSAGES)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let mut out = Vec::new();
        for entry in messages
            .iter()
            .map_err(|e| StorageError::Database(e.to_string()))?
        {
            if out.len() >= limit {
                break;
            }
            let (key, value) = entry.map_err(|e| StorageError::Database(e.to_string()))?;
            let row: RowValue = serde_json::from_slice(value.value())?;
            if module.is_none_or(|m| row.module == m) {
                out.push(row.into_stored(key.value(), kind));
            }
        }

        Ok(out)
    }

    async fn count_pending(
        &self,
        kind: MessageType,
        module: Option<&str>,
    ) -> Result<usize, StorageError> {
        let db = self.partition(kind).await?;
        let read_txn = db
            .begin_read()
            .map_err(|e| StorageError::Database(e.to_string()))?;
        let messages = read_txn
            .open_table(MESSAGES)
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let Some(module) = module else {
            let len = messages
                .len()
                .map_err(|e| StorageError::Database(e.to_string()))?;
            return Ok(len as usize);
        };

        let mut count = 0;
        for entry in messages
            .iter()
            .map_err(|e| StorageError::Database(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| StorageError::Database(e.to_string()))?;
            let row: RowValue = serde_json::from_slice(value.value())?;
            if row.module == module {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn remove(&self, kind: MessageType, ids: &[u64]) -> Result<usize, StorageError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let db = self.partition(kind).await?;
        let write_txn = db
            .begin_write()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let mut removed = 0;
        {
            let mut messages = write_txn
                .open_table(MESSAGES)
                .map_err(|e| StorageError::Database(e.to_string()))?;
            for id in ids {
                if messages
                    .remove(*id)
                    .map_err(|e| StorageError::Database(e.to_string()))?
                    .is_some()
                {
                    removed += 1;
                }
            }
        }

        write_txn
            .commit()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        trace!(kind = %kind, requested = ids.len(), removed, "Removed rows from spool");
        Ok(removed)
    }
}
