//! Prometheus Metrics Module
//!
//! Exposes push and polling activity in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Push**: messages by kind, malformed frames, transport errors
//! - **Connection**: reconnect attempts, exhaustion, current state
//! - **Polling**: fetches by endpoint and outcome
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the status server port. Recording
//! before [`init_metrics`] is a no-op.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::application::ports::SourceEndpoint;
use crate::domain::connection::ConnectionState;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Repeated calls return the handle installed by the first one.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();

    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Push channel
    describe_counter!(
        "live_data_push_messages_total",
        "Push messages received, by kind"
    );
    describe_counter!(
        "live_data_push_malformed_total",
        "Push frames dropped because they did not decode"
    );
    describe_counter!(
        "live_data_push_errors_total",
        "Push transport errors, including failed connects"
    );
    describe_counter!(
        "live_data_sends_dropped_total",
        "Outbound push messages dropped because the connection was not open"
    );

    // Connection lifecycle
    describe_counter!(
        "live_data_reconnects_total",
        "Push reconnection attempts scheduled"
    );
    describe_counter!(
        "live_data_push_exhausted_total",
        "Push sessions that gave up after the attempt bound"
    );
    describe_gauge!(
        "live_data_connection_state",
        "Push connection state (0 disconnected, 1 connecting, 2 connected, 3 error)"
    );

    // Polling
    describe_counter!(
        "live_data_polls_total",
        "Polling fetches, by endpoint and outcome"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Outcome label for polling fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Fetch succeeded and was applied.
    Success,
    /// Fetch failed.
    Failure,
}

impl PollOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

const fn state_value(state: ConnectionState) -> f64 {
    match state {
        ConnectionState::Disconnected => 0.0,
        ConnectionState::Connecting => 1.0,
        ConnectionState::Connected => 2.0,
        ConnectionState::Error => 3.0,
    }
}

/// Record a decoded push message.
pub fn record_push_message(kind: &'static str) {
    counter!("live_data_push_messages_total", "kind" => kind).increment(1);
}

/// Record a push frame that failed to decode.
pub fn record_push_malformed() {
    counter!("live_data_push_malformed_total").increment(1);
}

/// Record a push transport error.
pub fn record_push_error() {
    counter!("live_data_push_errors_total").increment(1);
}

/// Record a scheduled reconnection attempt.
pub fn record_reconnect() {
    counter!("live_data_reconnects_total").increment(1);
}

/// Record a session giving up on push.
pub fn record_push_exhausted() {
    counter!("live_data_push_exhausted_total").increment(1);
}

/// Record an outbound message dropped while not connected.
pub fn record_send_dropped() {
    counter!("live_data_sends_dropped_total").increment(1);
}

/// Update the connection state gauge.
pub fn set_connection_state(state: ConnectionState) {
    gauge!("live_data_connection_state").set(state_value(state));
}

/// Record a polling fetch.
pub fn record_poll(endpoint: SourceEndpoint, outcome: PollOutcome) {
    counter!(
        "live_data_polls_total",
        "endpoint" => endpoint.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================
