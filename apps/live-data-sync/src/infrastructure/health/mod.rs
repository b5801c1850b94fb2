//! Status and Metrics Endpoint
//!
//! HTTP endpoint reporting the dashboard's data freshness and push status.
//!
//! # Endpoints
//!
//! - `GET /health` - JSON health status
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (ready once market data has arrived)
//! - `GET /state` - Current dashboard state as JSON
//! - `GET /metrics` - Prometheus metrics in text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::{DashboardState, MarketDashboard};
use crate::domain::connection::ConnectionState;
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Binary version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Push connection status.
    pub connection: ConnectionState,
    /// Whether push has given up and polling is permanent.
    pub push_exhausted: bool,
    /// Whether any market data has been received.
    pub has_market_data: bool,
    /// When market data was last applied.
    pub last_update: Option<DateTime<Utc>>,
    /// Last user-facing error.
    pub error: Option<String>,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Push connected.
    Healthy,
    /// Serving polled data.
    Degraded,
    /// No data at all.
    Unhealthy,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the status server.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    dashboard: Arc<MarketDashboard>,
}

impl HealthServerState {
    /// Create new status server state.
    #[must_use]
    pub fn new(version: String, dashboard: Arc<MarketDashboard>) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            dashboard,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Build the status router.
pub fn router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/state", get(state_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Status HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new status server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Status server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Status server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.dashboard.snapshot().market_data.is_some() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn state_handler(State(state): State<Arc<HealthServerState>>) -> Json<DashboardState> {
    Json(state.dashboard.snapshot())
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let dashboard = state.dashboard.snapshot();

    HealthResponse {
        status: determine_health_status(&dashboard),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        connection: dashboard.connection_status,
        push_exhausted: state.dashboard.sync().is_exhausted(),
        has_market_data: dashboard.market_data.is_some(),
        last_update: dashboard.last_update,
        error: dashboard.error,
    }
}

fn determine_health_status(dashboard: &DashboardState) -> HealthStatus {
    if dashboard.is_connected {
        HealthStatus::Healthy
    } else if dashboard.market_data.is_some() {
        HealthStatus::Degraded
    } else {
        HealthStatus::Unhealthy
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Status server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
