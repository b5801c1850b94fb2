//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the push session and dashboard services and the
//! port interfaces that define how they reach the network.

/// Port interfaces for external systems (push transport, snapshot source).
pub mod ports;

/// Application services for live sync and the polling dashboard.
pub mod services;
