//! The multi-type queue façade
//!
//! Routes every operation to the shard owning the message's type and layers
//! cross-shard concerns on top: batch pushes, the dispatcher-facing
//! fetch/acknowledge pair, and shutdown. Shards never see each other; there
//! is no global lock.

use std::borrow::Cow;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use vigil_core::{Message, MessageType};
use vigil_storage::{MessageStore, StoredMessage};

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::typed_queue::TypedQueue;

/// Reference to a stored row, used to acknowledge delivery
pub type MessageRef = (MessageType, u64);

/// Persistent bounded queue partitioned by [`MessageType`]
///
/// Producers push [`Message`] values; consumers peek/pop or suspend on the
/// awaitable variants; the dispatcher drains batches across all types with
/// [`MultiTypeQueue::fetch_pending_events`] and acknowledges them with
/// [`MultiTypeQueue::update_event_status`]. Pending rows survive restarts
/// through the injected [`MessageStore`].
pub struct MultiTypeQueue {
    stateless: TypedQueue,
    stateful: TypedQueue,
    command: TypedQueue,
    default_module: String,
    closed_tx: watch::Sender<bool>,
    closed_rx: watch::Receiver<bool>,
}

impl MultiTypeQueue {
    /// Open one shard per message type over the store, recovering counts
    pub async fn open(
        store: Arc<dyn MessageStore>,
        config: QueueConfig,
    ) -> Result<Self, QueueError> {
        let stateless = TypedQueue::open(
            MessageType::Stateless,
            Arc::clone(&store),
            config.capacity,
            config.push_timeout,
        )
        .await?;
        let stateful = TypedQueue::open(
            MessageType::Stateful,
            Arc::clone(&store),
            config.capacity,
            config.push_timeout,
        )
        .await?;
        let command = TypedQueue::open(
            MessageType::Command,
            store,
            config.capacity,
            config.push_timeout,
        )
        .await?;

        let (closed_tx, closed_rx) = watch::channel(false);

        info!(capacity = config.capacity, "Message queue open");

        Ok(Self {
            stateless,
            stateful,
            command,
            default_module: config.default_module,
            closed_tx,
            closed_rx,
        })
    }

    fn shard(&self, kind: MessageType) -> &TypedQueue {
        match kind {
            MessageType::Stateless => &self.stateless,
            MessageType::Stateful => &self.stateful,
            MessageType::Command => &self.command,
        }
    }

    fn ensure_open(&self) -> Result<(), QueueError> {
        if *self.closed_rx.borrow() {
            Err(QueueError::ShuttingDown)
        } else {
            Ok(())
        }
    }

    /// Apply the default module to messages pushed without attribution
    fn attributed<'a>(&self, msg: &'a Message) -> Cow<'a, Message> {
        if msg.module.is_empty() && !self.default_module.is_empty() {
            Cow::Owned(Message::with_module(
                msg.kind,
                msg.payload.clone(),
                self.default_module.clone(),
            ))
        } else {
            Cow::Borrowed(msg)
        }
    }

    /// Push a message to its type's shard
    ///
    /// Array payloads fan out into one row per element, atomically. Returns
    /// the number of rows enqueued; zero when a non-blocking push meets a
    /// full shard or a blocking push exhausts its wait budget.
    pub async fn push(&self, msg: &Message, block: bool) -> Result<usize, QueueError> {
        self.ensure_open()?;
        let msg = self.attributed(msg);
        self.shard(msg.kind).push(&msg, block).await
    }

    /// Push a batch of messages in order, returning total rows enqueued
    ///
    /// Fan-out stays atomic per message; there is no atomicity across batch
    /// elements.
    pub async fn push_batch(&self, msgs: &[Message], block: bool) -> Result<usize, QueueError> {
        self.ensure_open()?;
        let mut total = 0;
        for msg in msgs {
            total += self.push(msg, block).await?;
        }
        Ok(total)
    }

    /// Push that suspends until the target shard has room for the whole
    /// message, then enqueues it exactly once
    pub async fn push_awaitable(&self, msg: &Message) -> Result<usize, QueueError> {
        self.ensure_open()?;
        let msg = self.attributed(msg);
        self.shard(msg.kind)
            .push_awaitable(&msg, self.closed_rx.clone())
            .await
    }

    /// Peek the oldest pending message of a type, sentinel when none matches
    pub async fn get_next(
        &self,
        kind: MessageType,
        module: Option<&str>,
    ) -> Result<Message, QueueError> {
        self.ensure_open()?;
        self.shard(kind).peek_next(module).await
    }

    /// Peek up to `n` oldest pending messages of a type
    pub async fn get_next_n(
        &self,
        kind: MessageType,
        n: usize,
        module: Option<&str>,
    ) -> Result<Vec<Message>, QueueError> {
        self.ensure_open()?;
        self.shard(kind).peek_next_n(n, module).await
    }

    /// Suspend until a message of this type is pending, then return it
    pub async fn get_next_awaitable(&self, kind: MessageType) -> Result<Message, QueueError> {
        self.ensure_open()?;
        self.shard(kind).next_awaitable(self.closed_rx.clone()).await
    }

    /// Suspend until `n` messages are pending, then return them combined
    ///
    /// The combined message's payload array concatenates the first `n`
    /// normalized payloads in FIFO order.
    pub async fn get_next_n_awaitable(
        &self,
        kind: MessageType,
        n: usize,
    ) -> Result<Message, QueueError> {
        self.ensure_open()?;
        self.shard(kind)
            .next_n_awaitable(n, self.closed_rx.clone())
            .await
    }

    /// Delete the oldest pending message; `false` when the shard was empty
    pub async fn pop(&self, kind: MessageType) -> Result<bool, QueueError> {
        self.ensure_open()?;
        self.shard(kind).pop().await
    }

    /// Delete up to `n` oldest pending messages, returning how many went
    pub async fn pop_n(&self, kind: MessageType, n: usize) -> Result<usize, QueueError> {
        self.ensure_open()?;
        self.shard(kind).pop_n(n).await
    }

    /// Whether a shard has no pending messages
    pub async fn is_empty(&self, kind: MessageType) -> bool {
        self.shard(kind).is_empty().await
    }

    /// Whether a shard is at capacity
    pub async fn is_full(&self, kind: MessageType) -> bool {
        self.shard(kind).is_full().await
    }

    /// Pending count for a shard, optionally restricted to one module
    pub async fn stored_items(
        &self,
        kind: MessageType,
        module: Option<&str>,
    ) -> Result<usize, QueueError> {
        self.shard(kind).stored_items(module).await
    }

    /// Total pending rows across all shards
    pub async fn pending_event_count(&self) -> usize {
        let mut total = 0;
        for kind in MessageType::ALL {
            total += self.shard(kind).pending().await;
        }
        total
    }

    /// Read up to `n` pending rows across all types, dispatcher-facing
    ///
    /// Rows come out round-robin over the types in declaration order, FIFO
    /// within each type, so one chatty type cannot starve the rest. Rows are
    /// not removed; acknowledge them with
    /// [`MultiTypeQueue::update_event_status`].
    pub async fn fetch_pending_events(
        &self,
        n: usize,
    ) -> Result<Vec<StoredMessage>, QueueError> {
        self.ensure_open()?;

        let mut per_kind = Vec::with_capacity(MessageType::ALL.len());
        for kind in MessageType::ALL {
            let rows = self.shard(kind).fetch_pending(n).await?;
            per_kind.push(rows.into_iter());
        }

        let mut batch = Vec::with_capacity(n);
        while batch.len() < n {
            let mut progressed = false;
            for rows in per_kind.iter_mut() {
                if batch.len() >= n {
                    break;
                }
                if let Some(row) = rows.next() {
                    batch.push(row);
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }

        Ok(batch)
    }

    /// Mark rows delivered, removing them from their shards
    ///
    /// Idempotent on rows already removed; returns how many went this time.
    pub async fn update_event_status(&self, refs: &[MessageRef]) -> Result<usize, QueueError> {
        self.ensure_open()?;

        let mut removed = 0;
        for kind in MessageType::ALL {
            let ids: Vec<u64> = refs
                .iter()
                .filter(|(row_kind, _)| *row_kind == kind)
                .map(|(_, id)| *id)
                .collect();
            if !ids.is_empty() {
                removed += self.shard(kind).remove_ids(&ids).await?;
            }
        }

        debug!(acknowledged = refs.len(), removed, "Updated event status");
        Ok(removed)
    }

    /// Begin shutdown: wake every suspended awaitable with `Cancelled` and
    /// fail operations entered from now on with `ShuttingDown`
    ///
    /// Idempotent; later calls are no-ops.
    pub fn close(&self) {
        let was_closed = self.closed_tx.send_replace(true);
        if !was_closed {
            info!("Message queue closed");
        }
    }

    /// Whether shutdown has begun
    pub fn is_closed(&self) -> bool {
        *self.closed_rx.borrow()
    }
}
