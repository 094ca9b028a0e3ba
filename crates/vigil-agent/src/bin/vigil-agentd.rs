//! Minimal agent daemon: runs the spool and dispatcher with a logging sink
//!
//! Stands in for the full agent while the manager-facing HTTP relay lives
//! elsewhere; every dispatched event is logged instead of POSTed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use tracing::info;

use vigil_agent::{Agent, AgentConfig, logging};
use vigil_dispatch::{EventSink, SinkError};

#[derive(Parser)]
#[command(name = "vigil-agentd", about = "Vigil host-monitoring agent spool daemon")]
struct Cli {
    /// Data directory for the spool
    #[arg(long, default_value = "./vigil-data")]
    data_dir: PathBuf,

    /// Events per outbound batch
    #[arg(long, default_value_t = 10)]
    batch_size: usize,

    /// Seconds between outbound batches
    #[arg(long, default_value_t = 5)]
    interval_secs: u64,

    /// Force debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

/// Sink that logs each relayed event envelope
struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn deliver(&self, events: &str) -> Result<(), SinkError> {
        for line in events.lines() {
            info!(event = line, "Relaying event");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let config = AgentConfig::with_data_dir(&cli.data_dir)
        .with_dispatch_batch_size(cli.batch_size)
        .with_dispatch_interval(Duration::from_secs(cli.interval_secs));

    let agent = Agent::start(config, Arc::new(LogSink)).await?;
    info!("Agent running, Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    agent.shutdown().await;

    Ok(())
}
