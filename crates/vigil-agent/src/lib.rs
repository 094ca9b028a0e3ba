//! # Vigil Agent
//!
//! Service wiring for the agent's message spool.
//!
//! An [`Agent`] owns the whole pipeline under one scope: it opens the
//! on-disk spool, recovers the queue shards, and spawns the dispatcher over
//! an injected [`vigil_dispatch::EventSink`]. [`Agent::shutdown`] tears the
//! pipeline down in order: the dispatcher is signalled and joined, then the
//! queue is closed so suspended awaitables wake. `Drop` aborts the
//! dispatcher as a last resort so no background task outlives its owner.

pub mod config;
pub mod error;
pub mod logging;

pub use config::AgentConfig;
pub use error::AgentError;

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use vigil_dispatch::{Dispatcher, EventSink};
use vigil_queue::MultiTypeQueue;
use vigil_storage::RedbMessageStore;

/// The running agent service: spool, queue, and dispatcher under one owner
pub struct Agent {
    queue: Arc<MultiTypeQueue>,
    dispatcher: Option<JoinHandle<()>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Agent {
    /// Open the spool, recover the queue, and start the dispatcher
    pub async fn start(
        config: AgentConfig,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, AgentError> {
        let store = Arc::new(RedbMessageStore::open(config.spool_config())?);
        let queue = Arc::new(MultiTypeQueue::open(store, config.queue_config()).await?);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let dispatcher = Dispatcher::spawn(
            Arc::clone(&queue),
            sink,
            config.dispatch_config(),
            shutdown_rx,
        );

        info!(spool = %config.persistence_path.display(), "Agent started");

        Ok(Self {
            queue,
            dispatcher: Some(dispatcher),
            shutdown_tx,
        })
    }

    /// Handle producers and consumers use to reach the queue
    pub fn queue(&self) -> Arc<MultiTypeQueue> {
        Arc::clone(&self.queue)
    }

    /// Stop the pipeline: signal the dispatcher, join it, close the queue
    ///
    /// Pending rows stay in the spool and are picked up by the next start.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(dispatcher) = self.dispatcher.take() {
            if let Err(error) = dispatcher.await {
                warn!(error = %error, "Dispatcher did not join cleanly");
            }
        }
        self.queue.close();
        info!("Agent stopped");
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        // Shutdown not called: kill the dispatcher rather than leak it
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.abort();
        }
        self.queue.close();
    }
}
