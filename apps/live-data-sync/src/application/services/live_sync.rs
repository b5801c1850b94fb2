//! Live Data Sync
//!
//! Owns at most one push session per instance. A session connects, subscribes
//! on open, routes decoded messages into [`SyncState`], and on an abnormal
//! close retries with bounded exponential backoff. Once the attempt bound is
//! used up the instance never tries push again.
//!
//! The socket being open is tracked apart from the displayed status: a
//! transport error shows `error` but leaves an open socket usable until the
//! peer closes it.
//!
//! State is published through a `watch` channel. Every publish from a session
//! checks the session's cancellation token while holding the channel's write
//! lock, so nothing a session does is visible after [`LiveDataSync::stop`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::ports::{PushConnection, PushEvent, PushTransport, TransportError};
use crate::domain::connection::{CloseCode, ConnectionState, ReconnectConfig, ReconnectPolicy};
use crate::domain::insight::InsightSet;
use crate::domain::market::MarketSnapshot;
use crate::domain::streaming::{ClientMessage, PushMessage, default_channels};
use crate::infrastructure::metrics;
use crate::infrastructure::push::JsonCodec;

/// Outbound messages queued while connected.
const OUTBOUND_CAPACITY: usize = 32;

/// Close reason sent when the client stops a session.
const CLIENT_CLOSE_REASON: &str = "client disconnect";

/// Called for every decoded push message.
pub type DataCallback = Arc<dyn Fn(&PushMessage) + Send + Sync>;

/// Called for every transport error, including failed connects.
pub type ErrorCallback = Arc<dyn Fn(&TransportError) + Send + Sync>;

// =============================================================================
// Configuration
// =============================================================================

/// Push session configuration.
#[derive(Debug, Clone)]
pub struct LiveSyncConfig {
    /// Push endpoint URL.
    pub url: String,
    /// Channels subscribed on every open.
    pub channels: Vec<String>,
    /// Reconnect backoff.
    pub reconnect: ReconnectConfig,
}

impl LiveSyncConfig {
    /// Configuration for `url` with the default channels and backoff.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            channels: default_channels(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Options for [`LiveDataSync::start`].
#[derive(Clone)]
pub struct StartOptions {
    /// When false, `start` does nothing.
    pub enabled: bool,
    /// Invoked for each decoded message.
    pub on_data: Option<DataCallback>,
    /// Invoked for each transport error.
    pub on_error: Option<ErrorCallback>,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            on_data: None,
            on_error: None,
        }
    }
}

impl StartOptions {
    /// Options with `enabled` set.
    #[must_use]
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    /// Set the data callback.
    #[must_use]
    pub fn on_data<F>(mut self, callback: F) -> Self
    where
        F: Fn(&PushMessage) + Send + Sync + 'static,
    {
        self.on_data = Some(Arc::new(callback));
        self
    }

    /// Set the error callback.
    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&TransportError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for StartOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartOptions")
            .field("enabled", &self.enabled)
            .field("on_data", &self.on_data.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

// =============================================================================
// Observable State
// =============================================================================

/// What a consumer can observe about a push session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// Connection status.
    pub connection: ConnectionState,
    /// Whether a push socket is open. Cleared only when it closes.
    pub open: bool,
    /// Most recent market snapshot.
    pub market_data: Option<Arc<MarketSnapshot>>,
    /// Most recent insight set.
    pub insights: Option<Arc<InsightSet>>,
    /// When market data was last received.
    pub last_update: Option<DateTime<Utc>>,
}

impl SyncState {
    /// Whether push is delivering or about to.
    ///
    /// Polling only runs while this is false.
    #[must_use]
    pub const fn push_active(&self) -> bool {
        self.open || matches!(self.connection, ConnectionState::Connecting)
    }
}

// =============================================================================
// Live Data Sync
// =============================================================================

struct Session {
    cancel: CancellationToken,
    outbound: mpsc::Sender<String>,
    handle: JoinHandle<()>,
}

/// Push-first live data client.
///
/// # Example
///
/// ```ignore
/// let sync = LiveDataSync::new(config, Arc::new(WebSocketTransport::new()));
/// sync.start(StartOptions::default());
///
/// let mut updates = sync.subscribe();
/// while updates.changed().await.is_ok() {
///     let state = updates.borrow_and_update().clone();
///     // render state.market_data
/// }
/// ```
pub struct LiveDataSync {
    id: Uuid,
    config: Arc<LiveSyncConfig>,
    transport: Arc<dyn PushTransport>,
    codec: JsonCodec,
    state: Arc<watch::Sender<SyncState>>,
    exhausted: Arc<AtomicBool>,
    session: Mutex<Option<Session>>,
}

impl LiveDataSync {
    /// Create an idle instance.
    #[must_use]
    pub fn new(config: LiveSyncConfig, transport: Arc<dyn PushTransport>) -> Self {
        let (state, _) = watch::channel(SyncState::default());
        Self {
            id: Uuid::new_v4(),
            config: Arc::new(config),
            transport,
            codec: JsonCodec::new(),
            state: Arc::new(state),
            exhausted: Arc::new(AtomicBool::new(false)),
            session: Mutex::new(None),
        }
    }

    /// Instance identifier, attached to every log line as `sync_id`.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Begin connecting.
    ///
    /// No-op when disabled, while a session is running, or after push has
    /// been exhausted for this instance. Must be called within a Tokio runtime.
    pub fn start(&self, options: StartOptions) {
        if !options.enabled {
            tracing::debug!(sync_id = %self.id, "Push disabled, not starting");
            return;
        }

        if self.exhausted.load(Ordering::Acquire) {
            tracing::debug!(sync_id = %self.id, "Push exhausted, not restarting");
            return;
        }

        let mut session = self.session.lock();
        if session.as_ref().is_some_and(|s| !s.handle.is_finished()) {
            return;
        }

        let cancel = CancellationToken::new();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);

        self.state.send_modify(|s| s.connection = ConnectionState::Connecting);
        metrics::set_connection_state(ConnectionState::Connecting);

        tracing::info!(sync_id = %self.id, url = %self.config.url, "Starting push session");

        let runner = SessionRunner {
            id: self.id,
            config: Arc::clone(&self.config),
            transport: Arc::clone(&self.transport),
            codec: self.codec.clone(),
            state: Arc::clone(&self.state),
            exhausted: Arc::clone(&self.exhausted),
            cancel: cancel.clone(),
            outbound: outbound_rx,
            options,
        };

        *session = Some(Session {
            cancel,
            outbound: outbound_tx,
            handle: tokio::spawn(runner.run()),
        });
    }

    /// Stop the session.
    ///
    /// Cancels any pending reconnect, closes an open connection with code
    /// 1000, and publishes `disconnected`. Nothing from the stopped session
    /// is published afterwards. Returns the session task for callers that
    /// want to wait for the close handshake.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let session = self.session.lock().take();

        if let Some(session) = &session {
            session.cancel.cancel();
            tracing::info!(sync_id = %self.id, "Push session stopped");
        }

        let changed = self.state.send_if_modified(|s| {
            let changed = s.open || s.connection != ConnectionState::Disconnected;
            s.open = false;
            s.connection = ConnectionState::Disconnected;
            changed
        });
        if changed {
            metrics::set_connection_state(ConnectionState::Disconnected);
        }

        session.map(|s| s.handle)
    }

    /// Stop and wait for the session task to finish.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.stop()
            && let Err(e) = handle.await
        {
            tracing::warn!(sync_id = %self.id, error = %e, "Push session task failed");
        }
    }

    /// Send a JSON message over the open connection.
    ///
    /// Returns false (and sends nothing) unless a socket is open. An open
    /// socket that has reported an error still accepts messages.
    pub fn send<T: Serialize>(&self, message: &T) -> bool {
        if !self.state.borrow().open {
            metrics::record_send_dropped();
            return false;
        }

        let text = match self.codec.encode(message) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(sync_id = %self.id, error = %e, "Failed to encode outbound message");
                return false;
            }
        };

        let session = self.session.lock();
        let queued = session
            .as_ref()
            .is_some_and(|s| s.outbound.try_send(text).is_ok());
        if !queued {
            metrics::record_send_dropped();
        }
        queued
    }

    /// Watch the observable state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Current observable state.
    #[must_use]
    pub fn snapshot(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Current connection status.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.borrow().connection
    }

    /// Most recent market snapshot.
    #[must_use]
    pub fn market_data(&self) -> Option<Arc<MarketSnapshot>> {
        self.state.borrow().market_data.clone()
    }

    /// Most recent insight set.
    #[must_use]
    pub fn insights(&self) -> Option<Arc<InsightSet>> {
        self.state.borrow().insights.clone()
    }

    /// When market data was last received.
    #[must_use]
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.state.borrow().last_update
    }

    /// Whether push has given up for this instance's lifetime.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Acquire)
    }
}

impl Drop for LiveDataSync {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.cancel.cancel();
        }
    }
}

impl fmt::Debug for LiveDataSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveDataSync")
            .field("id", &self.id)
            .field("url", &self.config.url)
            .field("connection", &self.connection_state())
            .field("exhausted", &self.is_exhausted())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Session Task
// =============================================================================

struct SessionRunner {
    id: Uuid,
    config: Arc<LiveSyncConfig>,
    transport: Arc<dyn PushTransport>,
    codec: JsonCodec,
    state: Arc<watch::Sender<SyncState>>,
    exhausted: Arc<AtomicBool>,
    cancel: CancellationToken,
    outbound: mpsc::Receiver<String>,
    options: StartOptions,
}

impl SessionRunner {
    async fn run(mut self) {
        let mut policy = ReconnectPolicy::new(self.config.reconnect.clone());

        loop {
            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return,
                result = self.transport.connect(&self.config.url) => result,
            };

            let code = match result {
                Ok(connection) => match self.drive(connection, &mut policy).await {
                    Some(code) => code,
                    None => return,
                },
                Err(e) => {
                    self.report_error(&e);
                    CloseCode::ABNORMAL
                }
            };

            if code.is_normal() {
                tracing::info!(sync_id = %self.id, "Push closed normally, not reconnecting");
                self.set_connection(ConnectionState::Disconnected);
                return;
            }

            let Some(delay) = policy.next_delay() else {
                tracing::warn!(
                    sync_id = %self.id,
                    attempts = policy.max_attempts(),
                    "Push reconnect attempts exhausted, relying on polling"
                );
                self.exhausted.store(true, Ordering::Release);
                metrics::record_push_exhausted();
                self.set_connection(ConnectionState::Disconnected);
                return;
            };

            let attempt = policy.attempt_count();
            tracing::info!(
                sync_id = %self.id,
                attempt,
                delay_ms = delay.as_millis(),
                code = code.as_u16(),
                "Reconnecting push stream"
            );
            metrics::record_reconnect();
            self.set_connection(ConnectionState::Connecting);

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    tracing::debug!(sync_id = %self.id, "Cancelled during reconnect delay");
                    return;
                }
                () = tokio::time::sleep(delay) => {}
            }

            // Messages queued for a dead connection are not replayed.
            while self.outbound.try_recv().is_ok() {}
        }
    }

    /// Run one open connection. Returns its close code, or `None` if cancelled.
    async fn drive(
        &mut self,
        mut connection: Box<dyn PushConnection>,
        policy: &mut ReconnectPolicy,
    ) -> Option<CloseCode> {
        if self.cancel.is_cancelled() {
            connection.close(CloseCode::NORMAL, CLIENT_CLOSE_REASON).await;
            return None;
        }

        tracing::info!(sync_id = %self.id, "Push connected");
        policy.reset();
        self.set_open(true);
        self.set_connection(ConnectionState::Connected);

        let subscribe = ClientMessage::subscribe(self.config.channels.clone());
        match self.codec.encode(&subscribe) {
            Ok(text) => {
                if let Err(e) = connection.send_text(text).await {
                    self.report_error(&e);
                }
            }
            Err(e) => tracing::warn!(sync_id = %self.id, error = %e, "Failed to encode subscribe"),
        }

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    connection.close(CloseCode::NORMAL, CLIENT_CLOSE_REASON).await;
                    return None;
                }
                event = connection.next_event() => match event {
                    PushEvent::Message(message) => self.handle_message(message),
                    PushEvent::Malformed(reason) => {
                        tracing::warn!(sync_id = %self.id, reason = %reason, "Dropping malformed push message");
                        metrics::record_push_malformed();
                    }
                    PushEvent::Error(e) => self.report_error(&e),
                    PushEvent::Closed { code, reason } => {
                        tracing::info!(sync_id = %self.id, code = code.as_u16(), reason = %reason, "Push connection closed");
                        self.set_open(false);
                        return Some(code);
                    }
                },
                Some(text) = self.outbound.recv() => {
                    if let Err(e) = connection.send_text(text).await {
                        self.report_error(&e);
                    }
                }
            }
        }
    }

    fn handle_message(&self, message: PushMessage) {
        metrics::record_push_message(message.label());

        match &message {
            PushMessage::MarketData(snapshot) => {
                let id = self.id;
                self.publish(|s| {
                    if let Some(previous) = &s.market_data
                        && snapshot.is_older_than(previous)
                    {
                        tracing::debug!(
                            sync_id = %id,
                            incoming = %snapshot.last_updated,
                            current = %previous.last_updated,
                            "Older snapshot replaces newer one"
                        );
                    }
                    s.market_data = Some(Arc::clone(snapshot));
                    s.last_update = Some(Utc::now());
                    true
                });
            }
            PushMessage::Insights(insights) => {
                self.publish(|s| {
                    s.insights = Some(Arc::clone(insights));
                    true
                });
            }
            PushMessage::Unknown { kind } => {
                tracing::debug!(sync_id = %self.id, kind = %kind, "Ignoring unrouted push message");
            }
        }

        if let Some(on_data) = &self.options.on_data
            && !self.cancel.is_cancelled()
        {
            on_data(&message);
        }
    }

    fn report_error(&self, error: &TransportError) {
        tracing::warn!(sync_id = %self.id, error = %error, "Push transport error");
        metrics::record_push_error();
        self.set_connection(ConnectionState::Error);

        if let Some(on_error) = &self.options.on_error
            && !self.cancel.is_cancelled()
        {
            on_error(error);
        }
    }

    fn set_open(&self, open: bool) {
        self.publish(|s| {
            let changed = s.open != open;
            s.open = open;
            changed
        });
    }

    fn set_connection(&self, connection: ConnectionState) {
        let changed = self.publish(|s| {
            let changed = s.connection != connection;
            s.connection = connection;
            changed
        });
        if changed {
            metrics::set_connection_state(connection);
        }
    }

    /// Apply `update` unless this session was cancelled.
    fn publish(&self, update: impl FnOnce(&mut SyncState) -> bool) -> bool {
        let cancel = &self.cancel;
        self.state
            .send_if_modified(|state| !cancel.is_cancelled() && update(state))
    }
}
