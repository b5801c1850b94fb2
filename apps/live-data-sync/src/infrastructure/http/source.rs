//! HTTP snapshot source.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::application::ports::{SnapshotSource, SourceEndpoint, SourceError};
use crate::domain::insight::{InsightRequest, InsightsResponse};
use crate::domain::market::MarketSnapshot;
use crate::infrastructure::config::Endpoints;

/// Fetches snapshots and insights from the dashboard API.
///
/// No request timeout is set: a hung poll is abandoned by the poller, not here.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: Client,
    market_data_url: String,
    insights_url: String,
}

impl HttpSnapshotSource {
    /// Create a source for the given endpoints.
    #[must_use]
    pub fn new(endpoints: &Endpoints) -> Self {
        Self::with_client(Client::new(), endpoints)
    }

    /// Create a source sharing an existing client.
    #[must_use]
    pub fn with_client(client: Client, endpoints: &Endpoints) -> Self {
        Self {
            client,
            market_data_url: endpoints.market_data_url.clone(),
            insights_url: endpoints.insights_url.clone(),
        }
    }

    async fn read_json<T: DeserializeOwned>(
        endpoint: SourceEndpoint,
        response: reqwest::Response,
    ) -> Result<T, SourceError> {
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|e| SourceError::Network {
            endpoint,
            message: e.to_string(),
        })?;

        serde_json::from_str(&text).map_err(|e| SourceError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch_market_snapshot(&self) -> Result<MarketSnapshot, SourceError> {
        let endpoint = SourceEndpoint::MarketData;

        let response = self
            .client
            .get(&self.market_data_url)
            .send()
            .await
            .map_err(|e| SourceError::Network {
                endpoint,
                message: e.to_string(),
            })?;

        Self::read_json(endpoint, response).await
    }

    async fn fetch_insights(
        &self,
        request: &InsightRequest,
    ) -> Result<InsightsResponse, SourceError> {
        let endpoint = SourceEndpoint::Insights;

        let response = self
            .client
            .post(&self.insights_url)
            .json(request)
            .send()
            .await
            .map_err(|e| SourceError::Network {
                endpoint,
                message: e.to_string(),
            })?;

        Self::read_json(endpoint, response).await
    }
}
