//! Live Data Sync Binary
//!
//! Keeps a dashboard view's market data and insights fresh and reports
//! its state over HTTP.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin live-data-sync
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `LIVE_DATA_ORIGIN`: Dashboard origin, e.g. `http://localhost:3000`
//!
//! ## Optional
//! - `LIVE_DATA_USER_ID`: User the insights are requested for
//! - `LIVE_DATA_CHANNELS`: Comma-separated push channels (default: market-data,insights,trends)
//! - `LIVE_DATA_POLL_INTERVAL_SECS`: Polling interval while push is down (default: 30)
//! - `LIVE_DATA_RECONNECT_BASE_SECS`: First reconnect delay (default: 2)
//! - `LIVE_DATA_MAX_RECONNECT_ATTEMPTS`: Reconnect attempts before giving up (default: 5)
//! - `LIVE_DATA_PUSH_ENABLED`: Attempt push at all (default: true)
//! - `LIVE_DATA_HEALTH_PORT`: Status HTTP port (default: 8083)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: live-data-sync)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use anyhow::Context;
use live_data_sync::application::ports::{PushTransport, SnapshotSource};
use live_data_sync::infrastructure::health::{HealthServer, HealthServerState};
use live_data_sync::infrastructure::telemetry;
use live_data_sync::{
    DashboardState, HttpSnapshotSource, LiveDataSync, MarketDashboard, SyncConfig,
    WebSocketTransport, init_metrics,
};
use tokio::signal;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Live Data Sync");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics().context("failed to install metrics recorder")?;

    let config = SyncConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Push session and polling fallback
    let transport: Arc<dyn PushTransport> = Arc::new(WebSocketTransport::new());
    let source: Arc<dyn SnapshotSource> = Arc::new(HttpSnapshotSource::new(&config.endpoints));
    let sync = LiveDataSync::new(config.live_sync_config(), transport);
    let dashboard = Arc::new(MarketDashboard::new(
        sync,
        source,
        config.dashboard_config(),
    ));

    // Spawn status server
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        Arc::clone(&dashboard),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );
    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Status server error");
        }
    });

    // Spawn state logger
    let updates = dashboard.subscribe();
    let logger_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        log_state_changes(updates, logger_shutdown).await;
    });

    dashboard.start();

    tracing::info!("Live data sync ready");

    await_shutdown(shutdown_token).await;

    dashboard.shutdown().await;

    tracing::info!("Live data sync stopped");
    Ok(())
}

/// Log connection transitions and data arrivals.
async fn log_state_changes(rx: watch::Receiver<DashboardState>, cancel: CancellationToken) {
    let mut updates = WatchStream::new(rx);
    let mut last: Option<DashboardState> = None;

    loop {
        let current = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            next = updates.next() => match next {
                Some(state) => state,
                None => return,
            },
        };

        if let Some(last) = &last {
            log_transition(last, &current);
        }
        last = Some(current);
    }
}

fn log_transition(last: &DashboardState, current: &DashboardState) {
    if current.connection_status != last.connection_status {
        tracing::info!(
            from = %last.connection_status,
            to = %current.connection_status,
            "Connection status changed"
        );
    }
    if current.last_update != last.last_update {
        tracing::info!(
            last_update = ?current.last_update,
            trends = current.market_data.as_ref().map_or(0, |m| m.trends.len()),
            insights = current.insights.len(),
            "Market data updated"
        );
    }
    if current.error != last.error
        && let Some(error) = &current.error
    {
        tracing::warn!(error = %error, "Dashboard error");
    }
}

/// Log the parsed configuration.
fn log_config(config: &SyncConfig) {
    tracing::info!(
        push_enabled = config.push_enabled,
        poll_interval_secs = config.poll_interval.as_secs(),
        max_reconnect_attempts = config.reconnect.max_attempts,
        health_port = config.server.health_port,
        "Configuration loaded"
    );
    tracing::debug!(
        push_url = %config.endpoints.push_url,
        market_data_url = %config.endpoints.market_data_url,
        insights_url = %config.endpoints.insights_url,
        channels = ?config.channels,
        "Endpoints"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!("Graceful shutdown started");
}
