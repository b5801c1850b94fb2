//! Market Dashboard
//!
//! Consumer-facing view over [`LiveDataSync`] with a polling fallback. While
//! no push socket is open and none is being opened, both endpoints are
//! fetched at most once per poll interval. Polling stops as soon as push goes
//! live, so the two paths are never active together. A push error on a socket
//! that stays open does not start polling.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::live_sync::{LiveDataSync, StartOptions, SyncState};
use crate::application::ports::{SnapshotSource, SourceEndpoint, SourceError};
use crate::domain::connection::ConnectionState;
use crate::domain::insight::{InsightRequest, InsightSet, InsightsResponse};
use crate::domain::market::MarketSnapshot;
use crate::domain::streaming::PushMessage;
use crate::infrastructure::metrics::{self, PollOutcome};

/// Error shown when the push transport reports a failure.
pub const PUSH_ERROR: &str = "push connection failed";
/// Error shown when a scheduled poll fails.
pub const FETCH_ERROR: &str = "failed to fetch market data";
/// Error shown when a manual refresh fails.
pub const REFRESH_ERROR: &str = "failed to refresh data";

/// Shortest gap between scheduled polls.
const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// Configuration and State
// =============================================================================

/// Dashboard configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// User the insights are requested for.
    pub user_id: Option<String>,
    /// Preferences sent with insight requests.
    pub preferences: Value,
    /// Polling interval while push is down, floored at one second.
    pub poll_interval: Duration,
    /// Whether to attempt push at all.
    pub push_enabled: bool,
}

impl DashboardConfig {
    /// Default polling interval.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

    fn insight_request(&self) -> InsightRequest {
        InsightRequest {
            user_id: self.user_id.clone(),
            preferences: self.preferences.clone(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            preferences: Value::Object(serde_json::Map::new()),
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            push_enabled: true,
        }
    }
}

/// Everything a dashboard view renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    /// Most recent market snapshot.
    pub market_data: Option<Arc<MarketSnapshot>>,
    /// Most recent insights, highest relevance first.
    pub insights: Arc<InsightSet>,
    /// True until the first poll completes or push goes live.
    pub is_loading: bool,
    /// Last user-facing error, if any.
    pub error: Option<String>,
    /// When market data was last applied.
    pub last_update: Option<DateTime<Utc>>,
    /// Whether a push socket is open.
    pub is_connected: bool,
    /// Push connection status.
    pub connection_status: ConnectionState,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            market_data: None,
            insights: Arc::new(InsightSet::default()),
            is_loading: true,
            error: None,
            last_update: None,
            is_connected: false,
            connection_status: ConnectionState::Disconnected,
        }
    }
}

impl DashboardState {
    fn apply_snapshot(&mut self, snapshot: Arc<MarketSnapshot>) {
        self.market_data = Some(snapshot);
        self.last_update = Some(Utc::now());
    }
}

/// Apply `update` unless `cancel` has fired.
fn publish(
    state: &watch::Sender<DashboardState>,
    cancel: &CancellationToken,
    update: impl FnOnce(&mut DashboardState) -> bool,
) -> bool {
    state.send_if_modified(|s| !cancel.is_cancelled() && update(s))
}

// =============================================================================
// Dashboard
// =============================================================================

struct Poller {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Live market dashboard: push first, polling while push is unavailable.
pub struct MarketDashboard {
    sync: LiveDataSync,
    source: Arc<dyn SnapshotSource>,
    config: Arc<DashboardConfig>,
    state: Arc<watch::Sender<DashboardState>>,
    poller: Mutex<Option<Poller>>,
}

impl MarketDashboard {
    /// Create an idle dashboard over `sync` and `source`.
    #[must_use]
    pub fn new(sync: LiveDataSync, source: Arc<dyn SnapshotSource>, config: DashboardConfig) -> Self {
        let (state, _) = watch::channel(DashboardState::default());
        Self {
            sync,
            source,
            config: Arc::new(config),
            state: Arc::new(state),
            poller: Mutex::new(None),
        }
    }

    /// Start push and the poller. No-op while already started.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(&self) {
        let mut poller = self.poller.lock();
        if poller.as_ref().is_some_and(|p| !p.handle.is_finished()) {
            return;
        }

        let cancel = CancellationToken::new();
        self.sync.start(self.start_options(&cancel));

        let task = PollTask {
            sync_state: self.sync.subscribe(),
            source: Arc::clone(&self.source),
            config: Arc::clone(&self.config),
            state: Arc::clone(&self.state),
            cancel: cancel.clone(),
        };

        tracing::info!(
            sync_id = %self.sync.id(),
            poll_interval_secs = self.config.poll_interval.as_secs(),
            push_enabled = self.config.push_enabled,
            "Dashboard started"
        );

        *poller = Some(Poller {
            cancel,
            handle: tokio::spawn(task.run()),
        });
    }

    fn start_options(&self, cancel: &CancellationToken) -> StartOptions {
        let data_state = Arc::clone(&self.state);
        let data_cancel = cancel.clone();
        let error_state = Arc::clone(&self.state);
        let error_cancel = cancel.clone();

        StartOptions::enabled(self.config.push_enabled)
            .on_data(move |message| {
                publish(&data_state, &data_cancel, |s| match message {
                    PushMessage::MarketData(snapshot) => {
                        s.apply_snapshot(Arc::clone(snapshot));
                        true
                    }
                    PushMessage::Insights(insights) => {
                        s.insights = Arc::clone(insights);
                        true
                    }
                    PushMessage::Unknown { .. } => false,
                });
            })
            .on_error(move |_| {
                publish(&error_state, &error_cancel, |s| {
                    s.error = Some(PUSH_ERROR.to_string());
                    true
                });
            })
    }

    /// Stop push and polling.
    ///
    /// In-flight polls are abandoned and their results are never applied.
    pub fn stop(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(2);

        if let Some(poller) = self.poller.lock().take() {
            poller.cancel.cancel();
            handles.push(poller.handle);
        }
        handles.extend(self.sync.stop());

        self.state.send_if_modified(|s| {
            let changed = s.is_connected || s.connection_status != ConnectionState::Disconnected;
            s.is_connected = false;
            s.connection_status = ConnectionState::Disconnected;
            changed
        });

        tracing::info!(sync_id = %self.sync.id(), "Dashboard stopped");
        handles
    }

    /// Stop and wait for background tasks to finish.
    pub async fn shutdown(&self) {
        for handle in self.stop() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Dashboard task failed");
            }
        }
    }

    /// Fetch both endpoints now, regardless of connection state.
    ///
    /// Failures set the `error` field; nothing is returned to the caller.
    pub async fn refresh_data(&self) {
        let cancel = self
            .poller
            .lock()
            .as_ref()
            .map_or_else(CancellationToken::new, |p| p.cancel.clone());

        publish(&self.state, &cancel, |s| {
            let changed = !s.is_loading;
            s.is_loading = true;
            changed
        });

        let request = self.config.insight_request();
        let (market, insights) = tokio::join!(
            self.source.fetch_market_snapshot(),
            self.source.fetch_insights(&request)
        );

        let failed = log_failures(&market, &insights, "Manual refresh failed");

        publish(&self.state, &cancel, |s| {
            apply_results(s, market, insights);
            if failed {
                s.error = Some(REFRESH_ERROR.to_string());
            }
            s.is_loading = false;
            true
        });
    }

    /// Watch the dashboard state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    /// Current dashboard state.
    #[must_use]
    pub fn snapshot(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    /// Underlying push client.
    #[must_use]
    pub const fn sync(&self) -> &LiveDataSync {
        &self.sync
    }
}

impl Drop for MarketDashboard {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.get_mut().take() {
            poller.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for MarketDashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDashboard")
            .field("sync", &self.sync)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Fetch Results
// =============================================================================

fn log_failures(
    market: &Result<MarketSnapshot, SourceError>,
    insights: &Result<InsightsResponse, SourceError>,
    message: &'static str,
) -> bool {
    let mut failed = false;
    for error in [market.as_ref().err(), insights.as_ref().err()]
        .into_iter()
        .flatten()
    {
        tracing::warn!(endpoint = %error.endpoint(), error = %error, "{message}");
        failed = true;
    }
    failed
}

fn apply_results(
    state: &mut DashboardState,
    market: Result<MarketSnapshot, SourceError>,
    insights: Result<InsightsResponse, SourceError>,
) {
    if let Ok(snapshot) = market {
        state.apply_snapshot(Arc::new(snapshot));
    }
    if let Ok(response) = insights {
        state.insights = Arc::new(response.insights);
    }
}

fn outcome<T>(result: &Result<T, SourceError>) -> PollOutcome {
    if result.is_ok() {
        PollOutcome::Success
    } else {
        PollOutcome::Failure
    }
}

// =============================================================================
// Poll Task
// =============================================================================

struct PollTask {
    sync_state: watch::Receiver<SyncState>,
    source: Arc<dyn SnapshotSource>,
    config: Arc<DashboardConfig>,
    state: Arc<watch::Sender<DashboardState>>,
    cancel: CancellationToken,
}

impl PollTask {
    async fn run(mut self) {
        let interval = self.config.poll_interval.max(MIN_POLL_INTERVAL);
        let mut last_poll: Option<Instant> = None;
        let mut fetches = JoinSet::new();

        loop {
            let (connection, open, push_active) = {
                let sync = self.sync_state.borrow_and_update();
                (sync.connection, sync.open, sync.push_active())
            };
            self.mirror(connection, open, push_active);

            if push_active {
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => break,
                    changed = self.sync_state.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    Some(_) = fetches.join_next() => {}
                }
                continue;
            }

            let due = last_poll.map_or_else(Instant::now, |at| at + interval);

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                changed = self.sync_state.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                Some(_) = fetches.join_next() => {}
                () = tokio::time::sleep_until(due) => {
                    last_poll = Some(Instant::now());
                    tracing::debug!(connection = %connection, "Polling market data");
                    fetches.spawn(poll_once(
                        Arc::clone(&self.source),
                        self.config.insight_request(),
                        Arc::clone(&self.state),
                        self.cancel.clone(),
                    ));
                }
            }
        }

        fetches.abort_all();
    }

    fn mirror(&self, connection: ConnectionState, open: bool, push_active: bool) {
        publish(&self.state, &self.cancel, |s| {
            let before = (s.connection_status, s.is_connected, s.is_loading);
            s.connection_status = connection;
            s.is_connected = open;
            if push_active {
                s.is_loading = false;
            }
            before != (s.connection_status, s.is_connected, s.is_loading)
        });
    }
}

async fn poll_once(
    source: Arc<dyn SnapshotSource>,
    request: InsightRequest,
    state: Arc<watch::Sender<DashboardState>>,
    cancel: CancellationToken,
) {
    publish(&state, &cancel, |s| s.error.take().is_some());

    let (market, insights) = tokio::join!(
        source.fetch_market_snapshot(),
        source.fetch_insights(&request)
    );

    metrics::record_poll(SourceEndpoint::MarketData, outcome(&market));
    metrics::record_poll(SourceEndpoint::Insights, outcome(&insights));
    let failed = log_failures(&market, &insights, "Poll failed");

    publish(&state, &cancel, |s| {
        apply_results(s, market, insights);
        if failed {
            s.error = Some(FETCH_ERROR.to_string());
        }
        s.is_loading = false;
        true
    });
}
