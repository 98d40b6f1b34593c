//! Conclave - deadline-driven group decision engine
//!
//! Bootstraps the lifecycle engine and recovers in-flight timers. The
//! HTTP/routing layer mounts on top of the exported [`conclave::AppState`];
//! this binary demonstrates the required ordering: configuration, logging,
//! store, scheduler, timer recovery, then traffic.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conclave::{AppState, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("conclave={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Conclave - group decision engine");
    info!("======================================");
    info!("Node ID: {}", args.node_id);

    let state = AppState::with_defaults();

    // Timers are not durably persisted; rebuild them from stored deadlines
    // before anything can accept traffic.
    state.recover();
    info!(
        pending_timers = state.scheduler.pending_timers(),
        "lifecycle engine ready"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    state.scheduler.shutdown();

    Ok(())
}
