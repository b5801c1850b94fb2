//! Mock snapshot source for testing.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::application::ports::{SnapshotSource, SourceEndpoint, SourceError};
use crate::domain::insight::{InsightRequest, InsightsResponse};
use crate::domain::market::MarketSnapshot;
use crate::infrastructure::simulator::generator;

/// In-memory snapshot source serving the demo fixtures.
#[derive(Debug, Default)]
pub struct MockSnapshotSource {
    market_failing: Mutex<bool>,
    insights_failing: Mutex<bool>,
    snapshot: Mutex<Option<MarketSnapshot>>,
    market_fetches: Mutex<Vec<Instant>>,
    insight_fetches: Mutex<Vec<Instant>>,
    last_insight_request: Mutex<Option<InsightRequest>>,
}

impl MockSnapshotSource {
    /// Create a source that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make both endpoints fail (or recover).
    pub fn set_failing(&self, failing: bool) {
        *self.market_failing.lock() = failing;
        *self.insights_failing.lock() = failing;
    }

    /// Make only the market data endpoint fail (or recover).
    pub fn set_market_failing(&self, failing: bool) {
        *self.market_failing.lock() = failing;
    }

    /// Make only the insights endpoint fail (or recover).
    pub fn set_insights_failing(&self, failing: bool) {
        *self.insights_failing.lock() = failing;
    }

    /// Serve `snapshot` instead of the demo snapshot.
    pub fn set_snapshot(&self, snapshot: MarketSnapshot) {
        *self.snapshot.lock() = Some(snapshot);
    }

    /// Number of market snapshot fetches.
    #[must_use]
    pub fn market_fetch_count(&self) -> usize {
        self.market_fetches.lock().len()
    }

    /// Number of insight fetches.
    #[must_use]
    pub fn insight_fetch_count(&self) -> usize {
        self.insight_fetches.lock().len()
    }

    /// When each market snapshot fetch started.
    #[must_use]
    pub fn market_fetch_times(&self) -> Vec<Instant> {
        self.market_fetches.lock().clone()
    }

    /// Body of the most recent insights request.
    #[must_use]
    pub fn last_insight_request(&self) -> Option<InsightRequest> {
        self.last_insight_request.lock().clone()
    }
}

#[async_trait]
impl SnapshotSource for MockSnapshotSource {
    async fn fetch_market_snapshot(&self) -> Result<MarketSnapshot, SourceError> {
        self.market_fetches.lock().push(Instant::now());

        if *self.market_failing.lock() {
            return Err(SourceError::Status {
                endpoint: SourceEndpoint::MarketData,
                status: 503,
            });
        }

        let custom = self.snapshot.lock().clone();
        Ok(custom.unwrap_or_else(|| generator::demo_snapshot(Utc::now())))
    }

    async fn fetch_insights(
        &self,
        request: &InsightRequest,
    ) -> Result<InsightsResponse, SourceError> {
        self.insight_fetches.lock().push(Instant::now());
        *self.last_insight_request.lock() = Some(request.clone());

        if *self.insights_failing.lock() {
            return Err(SourceError::Network {
                endpoint: SourceEndpoint::Insights,
                message: "connection refused".to_string(),
            });
        }

        let now = Utc::now();
        let insights = generator::demo_insights();
        Ok(InsightsResponse {
            total_insights: Some(insights.len()),
            insights,
            generated_at: now,
            next_update: now + generator::INSIGHT_REFRESH,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_demo_fixtures() {
        let source = MockSnapshotSource::new();

        let snapshot = source.fetch_market_snapshot().await.unwrap();
        let insights = source
            .fetch_insights(&InsightRequest::for_user(Some("u".into())))
            .await
            .unwrap();

        assert!(!snapshot.trends.is_empty());
        assert_eq!(insights.total_insights, Some(insights.insights.len()));
        assert_eq!(source.market_fetch_count(), 1);
        assert_eq!(source.insight_fetch_count(), 1);
        assert_eq!(
            source.last_insight_request().unwrap().user_id.as_deref(),
            Some("u")
        );
    }

    #[tokio::test]
    async fn failing_endpoints_are_independent() {
        let source = MockSnapshotSource::new();
        source.set_insights_failing(true);

        assert!(source.fetch_market_snapshot().await.is_ok());
        let err = source
            .fetch_insights(&InsightRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.endpoint(), SourceEndpoint::Insights);
    }
}
