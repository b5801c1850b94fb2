//! Domain Layer - Live dashboard data types.
//!
//! Pure types with serialization support and no I/O: connection status and
//! reconnect bookkeeping, market snapshots, insight sets, and the tagged push
//! messages that carry them.

/// Connection status, close codes, and reconnect policy.
pub mod connection;

/// Personalized insights and the insights endpoint contract.
pub mod insight;

/// Market snapshot types (trends, sentiment, competitor activity, metrics).
pub mod market;

/// Push channel message types.
pub mod streaming;
