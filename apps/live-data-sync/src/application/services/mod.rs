//! Application Services
//!
//! - `LiveDataSync`: push session with bounded reconnects
//! - `MarketDashboard`: dashboard state with a polling fallback

mod dashboard;
mod live_sync;

pub use dashboard::{
    DashboardConfig, DashboardState, FETCH_ERROR, MarketDashboard, PUSH_ERROR, REFRESH_ERROR,
};
pub use live_sync::{
    DataCallback, ErrorCallback, LiveDataSync, LiveSyncConfig, StartOptions, SyncState,
};
