//! Tracing setup for agent binaries

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global tracing subscriber
///
/// `verbose` forces debug-level output; otherwise `RUST_LOG` applies with an
/// info-level default. Call once per process, before any spans are entered.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
