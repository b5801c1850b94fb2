//! Feed Simulator
//!
//! Local stand-in for the dashboard backend, used for demos and
//! end-to-end tests.
//!
//! # Endpoints
//!
//! - `GET /api/market-data/live` - randomized market snapshot
//! - `POST /api/insights/personalized` - six personalized insights
//! - `GET /api/market-data/ws` - push socket; after a `subscribe` message
//!   the subscribed channels are pushed immediately and then every
//!   `push_interval`

pub mod generator;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tokio::net::TcpListener;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::domain::connection::CloseCode;
use crate::domain::insight::{InsightRequest, InsightsResponse};
use crate::domain::market::MarketSnapshot;
use crate::domain::streaming::{ClientMessage, INSIGHTS_CHANNEL, MARKET_DATA_CHANNEL, PushMessage};
use crate::infrastructure::config::{INSIGHTS_PATH, MARKET_DATA_PATH, PUSH_PATH, SimulatorConfig};
use crate::infrastructure::push::{CodecError, JsonCodec};

// =============================================================================
// Server
// =============================================================================

struct SimulatorState {
    push_interval: Duration,
    codec: JsonCodec,
    cancel: CancellationToken,
}

/// Feed simulator HTTP and WebSocket server.
pub struct FeedSimulator {
    state: Arc<SimulatorState>,
}

impl FeedSimulator {
    /// Create a simulator; open sockets are closed when `cancel` fires.
    #[must_use]
    pub fn new(config: &SimulatorConfig, cancel: CancellationToken) -> Self {
        Self {
            state: Arc::new(SimulatorState {
                push_interval: config.push_interval,
                codec: JsonCodec::new(),
                cancel,
            }),
        }
    }

    /// Build the simulator router.
    pub fn router(&self) -> Router {
        Router::new()
            .route(MARKET_DATA_PATH, get(market_data_handler))
            .route(INSIGHTS_PATH, post(insights_handler))
            .route(PUSH_PATH, get(push_handler))
            .with_state(Arc::clone(&self.state))
    }

    /// Serve on `listener` until the cancellation token fires.
    ///
    /// # Errors
    ///
    /// Returns `SimulatorError::ServerFailed` if the HTTP server fails.
    pub async fn serve(self, listener: TcpListener) -> Result<(), SimulatorError> {
        let addr = listener
            .local_addr()
            .map_err(|e| SimulatorError::ServerFailed(e.to_string()))?;
        tracing::info!(%addr, "Feed simulator listening");

        let shutdown = self.state.cancel.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(|e| SimulatorError::ServerFailed(e.to_string()))?;

        tracing::info!("Feed simulator stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn market_data_handler() -> Json<MarketSnapshot> {
    Json(generator::live_snapshot(&mut rand::rng(), Utc::now()))
}

async fn insights_handler(Json(request): Json<InsightRequest>) -> Json<InsightsResponse> {
    tracing::debug!(user_id = ?request.user_id, "Generating personalized insights");
    Json(generator::personalized_insights(Utc::now()))
}

async fn push_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<SimulatorState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| push_session(socket, state))
}

// =============================================================================
// Push Session
// =============================================================================

async fn push_session(mut socket: WebSocket, state: Arc<SimulatorState>) {
    let mut channels = BTreeSet::new();
    let mut ticker = interval_at(Instant::now() + state.push_interval, state.push_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::debug!("Push client connected");

    loop {
        tokio::select! {
            biased;

            () = state.cancel.cancelled() => {
                let frame = CloseFrame {
                    code: CloseCode::GOING_AWAY.as_u16(),
                    reason: Utf8Bytes::from_static("simulator shutting down"),
                };
                let _ = socket.send(Message::Close(Some(frame))).await;
                return;
            }

            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(text.as_str()) {
                        Ok(ClientMessage::Subscribe { channels: added }) => {
                            channels.extend(added);
                            tracing::debug!(?channels, "Push client subscribed");
                            if push_all(&mut socket, &state.codec, &channels).await.is_err() {
                                return;
                            }
                        }
                        Ok(ClientMessage::Unsubscribe { channels: removed }) => {
                            for channel in &removed {
                                channels.remove(channel);
                            }
                        }
                        Err(e) => tracing::debug!(error = %e, "Ignoring client message"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!("Push client disconnected");
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Push socket error");
                    return;
                }
            },

            _ = ticker.tick() => {
                if push_all(&mut socket, &state.codec, &channels).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Push one message per subscribed routable channel.
async fn push_all(
    socket: &mut WebSocket,
    codec: &JsonCodec,
    channels: &BTreeSet<String>,
) -> Result<(), SimulatorError> {
    for text in frames_for(codec, channels)? {
        socket
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| SimulatorError::SendFailed(e.to_string()))?;
    }
    Ok(())
}

fn frames_for(codec: &JsonCodec, channels: &BTreeSet<String>) -> Result<Vec<String>, CodecError> {
    let now = Utc::now();
    let mut frames = Vec::with_capacity(2);

    if channels.contains(MARKET_DATA_CHANNEL) {
        let snapshot = generator::live_snapshot(&mut rand::rng(), now);
        frames.push(codec.encode_push(&PushMessage::MarketData(Arc::new(snapshot)))?);
    }
    if channels.contains(INSIGHTS_CHANNEL) {
        let insights = generator::personalized_insights(now).insights;
        frames.push(codec.encode_push(&PushMessage::Insights(Arc::new(insights)))?);
    }

    Ok(frames)
}

// =============================================================================
// Errors
// =============================================================================

/// Feed simulator errors.
#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),

    /// Encoding a push frame failed.
    #[error("encode error: {0}")]
    Encode(#[from] CodecError),

    /// Writing to a push socket failed.
    #[error("send failed: {0}")]
    SendFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    fn simulator() -> FeedSimulator {
        FeedSimulator::new(&SimulatorConfig::default(), CancellationToken::new())
    }

    #[test]
    fn frames_follow_subscribed_channels() {
        let codec = JsonCodec::new();
        let mut channels = BTreeSet::new();
        assert!(frames_for(&codec, &channels).unwrap().is_empty());

        channels.insert("trends".to_string());
        assert!(frames_for(&codec, &channels).unwrap().is_empty());

        channels.insert(INSIGHTS_CHANNEL.to_string());
        let frames = frames_for(&codec, &channels).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(matches!(codec.decode(&frames[0]).unwrap(), PushMessage::Insights(_)));

        channels.insert(MARKET_DATA_CHANNEL.to_string());
        let frames = frames_for(&codec, &channels).unwrap();
        assert!(matches!(codec.decode(&frames[0]).unwrap(), PushMessage::MarketData(_)));
        assert!(matches!(codec.decode(&frames[1]).unwrap(), PushMessage::Insights(_)));
    }

    #[tokio::test]
    async fn serves_live_market_data() {
        let response = simulator()
            .router()
            .oneshot(Request::get(MARKET_DATA_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let snapshot: MarketSnapshot = serde_json::from_slice(&body).unwrap();
        assert_eq!(snapshot.industry.as_deref(), Some("Technology"));
    }

    #[tokio::test]
    async fn serves_personalized_insights() {
        let request = Request::post(INSIGHTS_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"userId":"u-1","preferences":{}}"#))
            .unwrap();
        let response = simulator().router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let insights: InsightsResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(insights.insights.len(), 6);
        assert_eq!(insights.insights[0].relevance_score, 94.0);
    }
}
