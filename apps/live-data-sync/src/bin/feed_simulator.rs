//! Feed Simulator Binary
//!
//! Serves randomized market data, personalized insights, and a push socket
//! for local development against `live-data-sync`.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin feed-simulator
//! LIVE_DATA_ORIGIN=http://localhost:3000 cargo run --bin live-data-sync
//! ```
//!
//! # Environment Variables
//!
//! - `FEED_SIMULATOR_PORT`: Listen port (default: 3000)
//! - `FEED_SIMULATOR_PUSH_INTERVAL_MS`: Push interval per socket (default: 5000)
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;

use anyhow::Context;
use live_data_sync::infrastructure::telemetry::{self, TelemetryConfig};
use live_data_sync::{FeedSimulator, SimulatorConfig};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _telemetry_guard =
        telemetry::init_with_config(TelemetryConfig::from_env_with_service("feed-simulator"));

    let config = SimulatorConfig::from_env();
    tracing::info!(
        port = config.port,
        push_interval_ms = u64::try_from(config.push_interval.as_millis()).unwrap_or(u64::MAX),
        "Starting feed simulator"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        tracing::info!("Received Ctrl+C, initiating shutdown");
        signal_token.cancel();
    });

    FeedSimulator::new(&config, shutdown_token)
        .serve(listener)
        .await?;

    Ok(())
}
