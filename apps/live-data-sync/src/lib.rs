#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Live Data Sync - Dashboard Data Refresh Client
//!
//! Keeps market data and personalized insights fresh for a dashboard view.
//! A push (WebSocket) subscription delivers updates as they happen; while
//! push is down the dashboard polls the HTTP endpoints on a fixed interval.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Data shapes and connection rules
//!   - `connection`: connection status, close codes, reconnect backoff
//!   - `market`: market snapshots
//!   - `insight`: ranked insights
//!   - `streaming`: push envelopes and control messages
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: push transport and snapshot source interfaces
//!   - `services`: `LiveDataSync` push session, `MarketDashboard` fallback
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `push`: tokio-tungstenite transport, JSON codec, scripted mock
//!   - `http`: reqwest snapshot source and mock
//!   - `config`: environment configuration
//!   - `health`: status HTTP endpoint
//!   - `simulator`: local feed server for demos and tests
//!
//! # Data Flow
//!
//! ```text
//! push socket ──► LiveDataSync ──► SyncState ──┐
//!                                              ├──► MarketDashboard ──► DashboardState
//! HTTP endpoints ◄── poll every 30 s ──────────┘     (while push is down)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Data shapes and connection rules with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::connection::{CloseCode, ConnectionState, ReconnectConfig, ReconnectPolicy};
pub use domain::insight::{Insight, InsightKind, InsightRequest, InsightSet, InsightsResponse};
pub use domain::market::MarketSnapshot;
pub use domain::streaming::{ClientMessage, PushMessage};

// Services
pub use application::services::{
    DashboardConfig, DashboardState, LiveDataSync, LiveSyncConfig, MarketDashboard, StartOptions,
    SyncState,
};

// Infrastructure config
pub use infrastructure::config::{ConfigError, Endpoints, SimulatorConfig, SyncConfig};

// Status server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Adapters
pub use infrastructure::http::HttpSnapshotSource;
pub use infrastructure::push::WebSocketTransport;
pub use infrastructure::simulator::{FeedSimulator, SimulatorError};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
