//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Configuration loading.
pub mod config;

/// Status HTTP endpoint.
pub mod health;

/// HTTP polling adapters.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// WebSocket push adapters.
pub mod push;

/// Local feed simulator (HTTP and push).
pub mod simulator;

/// OpenTelemetry tracing integration.
pub mod telemetry;
