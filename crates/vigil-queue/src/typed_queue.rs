//! Per-type queue shards
//!
//! A shard is the bounded FIFO for one message type: a spool partition, a
//! cached pending count, and the wakeup sources suspended producers and
//! consumers re-check their predicates against. Every read and write on a
//! shard is serialized by its mutex, and the cached count moves only by the
//! row deltas the store reports, so count and partition never drift.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, Notify, watch};
use tokio::time::Instant;
use tracing::{debug, trace};

use vigil_core::{Message, MessageType};
use vigil_storage::{MessageStore, NewMessage, StoredMessage};

use crate::error::QueueError;

struct ShardState {
    pending: usize,
}

/// Bounded persistent FIFO for a single message type
///
/// Internal to [`crate::MultiTypeQueue`], which routes by message type and
/// layers shutdown semantics on top.
pub(crate) struct TypedQueue {
    kind: MessageType,
    capacity: usize,
    push_timeout: Duration,
    store: Arc<dyn MessageStore>,
    state: Mutex<ShardState>,
    not_full: Notify,
    not_empty: Notify,
}

impl TypedQueue {
    /// Open the shard over its spool partition, recovering the pending count
    pub(crate) async fn open(
        kind: MessageType,
        store: Arc<dyn MessageStore>,
        capacity: usize,
        push_timeout: Duration,
    ) -> Result<Self, QueueError> {
        store.open_partition(kind).await?;
        let pending = store.count_pending(kind, None).await?;

        debug!(kind = %kind, pending, capacity, "Opened queue shard");

        Ok(Self {
            kind,
            capacity,
            push_timeout,
            store,
            state: Mutex::new(ShardState { pending }),
            not_full: Notify::new(),
            not_empty: Notify::new(),
        })
    }

    /// Append the whole row batch if it fits, under one lock acquisition
    ///
    /// Returns `None` when the batch would overflow the shard. The append
    /// happens in a single store transaction, so a multi-message lands whole
    /// or not at all.
    async fn try_append(
        &self,
        module: &str,
        rows: &[Value],
    ) -> Result<Option<usize>, QueueError> {
        let mut state = self.state.lock().await;
        if state.pending + rows.len() > self.capacity {
            return Ok(None);
        }

        let new_rows = rows
            .iter()
            .map(|payload| NewMessage::new(module, payload.clone()))
            .collect();
        let ids = self.store.append(self.kind, new_rows).await?;
        state.pending += ids.len();
        drop(state);

        self.not_empty.notify_waiters();
        Ok(Some(ids.len()))
    }

    /// Read the first `n` rows once at least `n` are pending
    ///
    /// Predicate check and row read share one lock acquisition, so no other
    /// consumer of this shard slips between them.
    async fn try_read(&self, n: usize) -> Result<Option<Vec<StoredMessage>>, QueueError> {
        let state = self.state.lock().await;
        if state.pending < n {
            return Ok(None);
        }
        let rows = self.store.read_pending(self.kind, n, None).await?;
        Ok(Some(rows))
    }

    /// Push a message, fanning out array payloads
    ///
    /// Non-blocking pushes reject an overflowing batch outright. Blocking
    /// pushes wait up to the configured timeout for space, then give up the
    /// same way. Both report the number of rows enqueued, zero on rejection.
    pub(crate) async fn push(&self, msg: &Message, block: bool) -> Result<usize, QueueError> {
        let rows = msg.normalized_rows();
        if rows.is_empty() || rows.len() > self.capacity {
            // An oversized batch can never fit; waiting would not help
            return Ok(0);
        }

        let deadline = Instant::now() + self.push_timeout;
        loop {
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            // Register as a waiter before the predicate check: notify_waiters
            // only wakes registered waiters, so a pop landing between the
            // check and the await would otherwise be lost
            notified.as_mut().enable();
            if let Some(count) = self.try_append(&msg.module, &rows).await? {
                return Ok(count);
            }
            if !block {
                trace!(kind = %self.kind, rows = rows.len(), "Rejected push on full shard");
                return Ok(0);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                trace!(kind = %self.kind, rows = rows.len(), "Blocking push timed out");
                return Ok(0);
            }
        }
    }

    /// Push that suspends until the whole batch fits
    ///
    /// Resolves `Cancelled` without enqueuing if the queue shuts down while
    /// suspended.
    pub(crate) async fn push_awaitable(
        &self,
        msg: &Message,
        mut closed: watch::Receiver<bool>,
    ) -> Result<usize, QueueError> {
        let rows = msg.normalized_rows();
        if rows.is_empty() || rows.len() > self.capacity {
            return Ok(0);
        }

        loop {
            let notified = self.not_full.notified();
            tokio::pin!(notified);
            // Register before the predicate check so no wakeup is lost
            notified.as_mut().enable();
            if let Some(count) = self.try_append(&msg.module, &rows).await? {
                return Ok(count);
            }
            tokio::select! {
                _ = notified => {}
                _ = closed.changed() => return Err(QueueError::Cancelled),
            }
        }
    }

    /// Suspend until `n` rows are pending, then return them
    async fn wait_read(
        &self,
        n: usize,
        mut closed: watch::Receiver<bool>,
    ) -> Result<Vec<StoredMessage>, QueueError> {
        loop {
            let notified = self.not_empty.notified();
            tokio::pin!(notified);
            // Register before the predicate check so no wakeup is lost
            notified.as_mut().enable();
            if let Some(rows) = self.try_read(n).await? {
                return Ok(rows);
            }
            tokio::select! {
                _ = notified => {}
                _ = closed.changed() => return Err(QueueError::Cancelled),
            }
        }
    }

    /// Suspend until one row is pending, then return it
    pub(crate) async fn next_awaitable(
        &self,
        closed: watch::Receiver<bool>,
    ) -> Result<Message, QueueError> {
        let rows = self.wait_read(1, closed).await?;
        Ok(rows
            .into_iter()
            .next()
            .map(to_message)
            .unwrap_or_else(|| Message::sentinel(self.kind, "")))
    }

    /// Suspend until `n` rows are pending, then return them combined
    ///
    /// The result is one message whose payload array concatenates the first
    /// `n` normalized row payloads in FIFO order.
    pub(crate) async fn next_n_awaitable(
        &self,
        n: usize,
        closed: watch::Receiver<bool>,
    ) -> Result<Message, QueueError> {
        let rows = self.wait_read(n, closed).await?;
        let payload = Value::Array(rows.into_iter().map(|row| row.payload).collect());
        Ok(Message::new(self.kind, payload))
    }

    /// Peek the lowest-id pending row matching the filter
    ///
    /// Returns the sentinel (requested type and module, `{}` payload) when
    /// nothing matches.
    pub(crate) async fn peek_next(&self, module: Option<&str>) -> Result<Message, QueueError> {
        let _state = self.state.lock().await;
        let rows = self.store.read_pending(self.kind, 1, module).await?;
        Ok(rows
            .into_iter()
            .next()
            .map(to_message)
            .unwrap_or_else(|| Message::sentinel(self.kind, module.unwrap_or(""))))
    }

    /// Peek up to `n` lowest-id pending rows matching the filter
    pub(crate) async fn peek_next_n(
        &self,
        n: usize,
        module: Option<&str>,
    ) -> Result<Vec<Message>, QueueError> {
        let _state = self.state.lock().await;
        let rows = self.store.read_pending(self.kind, n, module).await?;
        Ok(rows.into_iter().map(to_message).collect())
    }

    /// Read up to `n` lowest-id pending rows with their ids, dispatcher-facing
    pub(crate) async fn fetch_pending(&self, n: usize) -> Result<Vec<StoredMessage>, QueueError> {
        let _state = self.state.lock().await;
        Ok(self.store.read_pending(self.kind, n, None).await?)
    }

    /// Delete the lowest-id pending row; `false` when the shard is empty
    pub(crate) async fn pop(&self) -> Result<bool, QueueError> {
        Ok(self.pop_n(1).await? == 1)
    }

    /// Delete up to `n` lowest-id pending rows, returning how many went
    pub(crate) async fn pop_n(&self, n: usize) -> Result<usize, QueueError> {
        let mut state = self.state.lock().await;
        let rows = self.store.read_pending(self.kind, n, None).await?;
        let ids: Vec<u64> = rows.iter().map(|row| row.id).collect();
        let removed = self.store.remove(self.kind, &ids).await?;
        state.pending -= removed;
        drop(state);

        if removed > 0 {
            self.not_full.notify_waiters();
        }
        Ok(removed)
    }

    /// Delete specific rows by id, dispatcher-facing; unknown ids are ignored
    pub(crate) async fn remove_ids(&self, ids: &[u64]) -> Result<usize, QueueError> {
        let mut state = self.state.lock().await;
        let removed = self.store.mark_dispatched(self.kind, ids).await?;
        state.pending -= removed;
        drop(state);

        if removed > 0 {
            self.not_full.notify_waiters();
        }
        Ok(removed)
    }

    /// Cached pending count
    pub(crate) async fn pending(&self) -> usize {
        self.state.lock().await.pending
    }

    /// Pending count, optionally restricted to one module
    pub(crate) async fn stored_items(&self, module: Option<&str>) -> Result<usize, QueueError> {
        let state = self.state.lock().await;
        match module {
            None => Ok(state.pending),
            Some(_) => Ok(self.store.count_pending(self.kind, module).await?),
        }
    }

    /// Whether no rows are pending
    pub(crate) async fn is_empty(&self) -> bool {
        self.pending().await == 0
    }

    /// Whether the shard is at capacity
    pub(crate) async fn is_full(&self) -> bool {
        self.pending().await >= self.capacity
    }
}

/// Turn a stored row back into the message shape consumers parse
fn to_message(row: StoredMessage) -> Message {
    Message::with_module(row.kind, row.payload, row.module)
}
