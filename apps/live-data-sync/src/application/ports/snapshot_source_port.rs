//! Snapshot Source Port (Driven Port)
//!
//! Interface for pulling market snapshots and personalized insights.

use std::fmt;

use async_trait::async_trait;

use crate::domain::insight::{InsightRequest, InsightsResponse};
use crate::domain::market::MarketSnapshot;

/// Which polled endpoint an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceEndpoint {
    /// Market snapshot endpoint.
    MarketData,
    /// Personalized insights endpoint.
    Insights,
}

impl SourceEndpoint {
    /// Metric label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MarketData => "market_data",
            Self::Insights => "insights",
        }
    }
}

impl fmt::Display for SourceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot source error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Request could not be sent or the body could not be read.
    #[error("{endpoint} request failed: {message}")]
    Network {
        /// Endpoint involved.
        endpoint: SourceEndpoint,
        /// Error details.
        message: String,
    },

    /// Non-success HTTP status.
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// Endpoint involved.
        endpoint: SourceEndpoint,
        /// Status code.
        status: u16,
    },

    /// Body was not the expected JSON.
    #[error("{endpoint} response decode failed: {message}")]
    Decode {
        /// Endpoint involved.
        endpoint: SourceEndpoint,
        /// Error details.
        message: String,
    },
}

impl SourceError {
    /// Endpoint the error came from.
    #[must_use]
    pub const fn endpoint(&self) -> SourceEndpoint {
        match self {
            Self::Network { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Decode { endpoint, .. } => *endpoint,
        }
    }
}

/// Port for on-demand fetches used by polling and manual refresh.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current market snapshot.
    async fn fetch_market_snapshot(&self) -> Result<MarketSnapshot, SourceError>;

    /// Fetch personalized insights.
    async fn fetch_insights(&self, request: &InsightRequest)
    -> Result<InsightsResponse, SourceError>;
}
