//! Background dispatch loop
//!
//! Drains the queue in batches and relays them to the injected sink. A batch
//! fires when the backlog reaches the batch size or the dispatch interval
//! elapses, whichever comes first. Rows are deleted only after the sink
//! acknowledges, so a failed delivery leaves the batch pending for the next
//! cycle and delivery stays at-least-once.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use vigil_queue::{MessageRef, MultiTypeQueue, QueueError};

use crate::config::DispatchConfig;
use crate::sink::EventSink;

/// Background task that relays queued events to an [`EventSink`]
pub struct Dispatcher {
    queue: Arc<MultiTypeQueue>,
    sink: Arc<dyn EventSink>,
    config: DispatchConfig,
    shutdown_rx: broadcast::Receiver<()>,
}

impl Dispatcher {
    /// Create a dispatcher over a queue and sink
    pub fn new(
        queue: Arc<MultiTypeQueue>,
        sink: Arc<dyn EventSink>,
        config: DispatchConfig,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            queue,
            sink,
            config,
            shutdown_rx,
        }
    }

    /// Spawn the dispatch loop as a background task
    pub fn spawn(
        queue: Arc<MultiTypeQueue>,
        sink: Arc<dyn EventSink>,
        config: DispatchConfig,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let task = Self::new(queue, sink, config, shutdown_rx);
        tokio::spawn(task.run())
    }

    /// Run the dispatch loop until shutdown
    async fn run(mut self) {
        info!(
            batch_size = self.config.batch_size,
            interval_secs = self.config.interval.as_secs_f64(),
            "Dispatcher started"
        );

        let mut last_dispatch = Instant::now();

        loop {
            if self.shutdown_requested() {
                break;
            }

            let now = Instant::now();
            let pending = self.queue.pending_event_count().await;

            if pending < self.config.batch_size
                && now.duration_since(last_dispatch) < self.config.interval
            {
                tokio::select! {
                    _ = self.shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(self.config.idle_poll) => {}
                }
                continue;
            }

            match self.dispatch_batch().await {
                Ok(()) => {}
                Err(QueueError::ShuttingDown) => {
                    info!("Queue closed, dispatcher stopping");
                    break;
                }
                Err(error) => {
                    warn!(error = %error, "Dispatch iteration failed");
                }
            }

            // Advances even when nothing was dispatched
            last_dispatch = now;
        }

        info!("Dispatcher stopped");
    }

    /// Whether a shutdown signal has arrived
    fn shutdown_requested(&mut self) -> bool {
        // Anything but an empty channel (a signal, a lagged signal, or a
        // dropped sender) means stop
        !matches!(
            self.shutdown_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        )
    }

    /// Fetch one batch, deliver it, and acknowledge on success
    async fn dispatch_batch(&self) -> Result<(), QueueError> {
        let batch = self
            .queue
            .fetch_pending_events(self.config.batch_size)
            .await?;
        if batch.is_empty() {
            return Ok(());
        }

        let refs: Vec<MessageRef> = batch.iter().map(|row| (row.kind, row.id)).collect();
        let events = batch
            .iter()
            .map(|row| row.payload.to_string())
            .collect::<Vec<_>>()
            .join("\n");

        match self.sink.deliver(&events).await {
            Ok(()) => {
                let removed = self.queue.update_event_status(&refs).await?;
                debug!(events = refs.len(), removed, "Dispatched batch");
            }
            Err(error) => {
                warn!(
                    error = %error,
                    events = refs.len(),
                    "Delivery failed, batch stays pending"
                );
            }
        }

        Ok(())
    }
}
