//! Configuration Module
//!
//! Configuration loading for the monitor and the feed simulator.

mod settings;

pub use settings::{
    ConfigError, Endpoints, INSIGHTS_PATH, MARKET_DATA_PATH, PUSH_PATH, ServerSettings,
    SimulatorConfig, SyncConfig,
};
