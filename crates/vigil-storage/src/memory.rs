//! In-memory spool implementation
//!
//! Backs the same [`MessageStore`] contract with a `BTreeMap` per partition.
//! Nothing survives a restart; intended for tests and diskless deployments.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use vigil_core::MessageType;

use crate::error::StorageError;
use crate::record::{NewMessage, StoredMessage};
use crate::MessageStore;

struct MemPartition {
    next_id: u64,
    rows: BTreeMap<u64, StoredMessage>,
}

impl MemPartition {
    fn new() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

/// Volatile [`MessageStore`] for tests and diskless deployments
#[derive(Default)]
pub struct InMemoryMessageStore {
    partitions: Mutex<HashMap<MessageType, MemPartition>>,
}

impl InMemoryMessageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn open_partition(&self, kind: MessageType) -> Result<(), StorageError> {
        self.partitions
            .lock()
            .await
            .entry(kind)
            .or_insert_with(MemPartition::new);
        Ok(())
    }

    async fn append(
        &self,
        kind: MessageType,
        rows: Vec<NewMessage>,
    ) -> Result<Vec<u64>, StorageError> {
        let mut partitions = self.partitions.lock().await;
        let partition = partitions.entry(kind).or_insert_with(MemPartition::new);

        let enqueued_at = Utc::now();
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let id = partition.next_id;
            partition.next_id += 1;
            partition.rows.insert(
                id,
                StoredMessage {
                    id,
                    kind,
                    module: row.module,
                    payload: row.payload,
                    enqueued_at,
                },
            );
            ids.push(id);
        }
        Ok(ids)
    }

    async fn read_pending(
        &self,
        kind: MessageType,
        limit: usize,
        module: Option<&str>,
    ) -> Result<Vec<StoredMessage>, StorageError> {
        let mut partitions = self.partitions.lock().await;
        let partition = partitions.entry(kind).or_insert_with(MemPartition::new);

        Ok(partition
            .rows
            .values()
            .filter(|row| row.matches_module(module))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_pending(
        &self,
        kind: MessageType,
        module: Option<&str>,
    ) -> Result<usize, StorageError> {
        let mut partitions = self.partitions.lock().await;
        let partition = partitions.entry(kind).or_insert_with(MemPartition::new);

        Ok(match module {
            None => partition.rows.len(),
            Some(_) => partition
                .rows
                .values()
                .filter(|row| row.matches_module(module))
                .count(),
        })
    }

    async fn remove(&self, kind: MessageType, ids: &[u64]) -> Result<usize, StorageError> {
        let mut partitions = self.partitions.lock().await;
        let partition = partitions.entry(kind).or_insert_with(MemPartition::new);

        let mut removed = 0;
        for id in ids {
            if partition.rows.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(module: &str, data: &str) -> NewMessage {
        NewMessage::new(module, json!({"data": data, "module": module}))
    }

    #[tokio::test]
    async fn test_append_and_read_fifo() {
        let store = InMemoryMessageStore::new();

        store
            .append(
                MessageType::Stateless,
                vec![row("", "first"), row("", "second")],
            )
            .await
            .unwrap();

        let pending = store
            .read_pending(MessageType::Stateless, 10, None)
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].payload["data"], "first");
        assert_eq!(pending[1].payload["data"], "second");
        assert!(pending[0].id < pending[1].id);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_drain() {
        let store = InMemoryMessageStore::new();

        let ids = store
            .append(MessageType::Command, vec![row("", "a")])
            .await
            .unwrap();
        store.remove(MessageType::Command, &ids).await.unwrap();

        let next = store
            .append(MessageType::Command, vec![row("", "b")])
            .await
            .unwrap();
        assert!(next[0] > ids[0]);
    }

    #[tokio::test]
    async fn test_module_counts_partition_the_total() {
        let store = InMemoryMessageStore::new();

        store
            .append(
                MessageType::Stateful,
                vec![row("a", "1"), row("b", "2"), row("a", "3")],
            )
            .await
            .unwrap();

        let total = store.count_pending(MessageType::Stateful, None).await.unwrap();
        let of_a = store
            .count_pending(MessageType::Stateful, Some("a"))
            .await
            .unwrap();
        let of_b = store
            .count_pending(MessageType::Stateful, Some("b"))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(of_a + of_b, total);
    }

    #[tokio::test]
    async fn test_remove_unknown_ids_is_a_no_op() {
        let store = InMemoryMessageStore::new();
        assert_eq!(store.remove(MessageType::Stateless, &[7, 8]).await.unwrap(), 0);
    }
}
