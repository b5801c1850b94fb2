//! Push Session Integration Tests
//!
//! Drives `LiveDataSync` against the scripted mock transport on a paused
//! clock: subscription on open, message routing, backoff, and shutdown.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::time::{Instant, sleep};

use live_data_sync::application::ports::PushTransport;
use live_data_sync::infrastructure::push::{JsonCodec, MockPushTransport};
use live_data_sync::infrastructure::simulator::generator;
use live_data_sync::{
    CloseCode, ConnectionState, LiveDataSync, LiveSyncConfig, PushMessage, ReconnectConfig,
    StartOptions,
};

const URL: &str = "ws://dashboard.test/api/market-data/ws";

fn sync_with(transport: &Arc<MockPushTransport>) -> LiveDataSync {
    LiveDataSync::new(
        LiveSyncConfig::new(URL),
        Arc::clone(transport) as Arc<dyn PushTransport>,
    )
}

/// Let spawned tasks run without crossing any backoff boundary.
async fn settle() {
    sleep(Duration::from_millis(10)).await;
}

fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
    let count = Arc::new(AtomicUsize::new(0));
    let read = {
        let count = Arc::clone(&count);
        move || count.load(Ordering::SeqCst)
    };
    (count, read)
}

fn market_data_frame() -> String {
    let snapshot = generator::demo_snapshot(Utc::now());
    JsonCodec::new()
        .encode_push(&PushMessage::MarketData(Arc::new(snapshot)))
        .unwrap()
}

fn insights_frame() -> String {
    JsonCodec::new()
        .encode_push(&PushMessage::Insights(Arc::new(generator::demo_insights())))
        .unwrap()
}

fn gaps(times: &[Instant]) -> Vec<u64> {
    times.windows(2).map(|w| (w[1] - w[0]).as_secs()).collect()
}

// =============================================================================
// Backoff
// =============================================================================

#[tokio::test(start_paused = true)]
async fn refused_connects_back_off_then_give_up() {
    let transport = Arc::new(MockPushTransport::new());
    let sync = sync_with(&transport);
    let (errors, error_count) = counter();

    sync.start(StartOptions::default().on_error(move |_| {
        errors.fetch_add(1, Ordering::SeqCst);
    }));
    sleep(Duration::from_secs(120)).await;

    assert_eq!(transport.connect_count(), 6);
    assert_eq!(gaps(&transport.connect_times()), [2, 4, 8, 16, 32]);
    assert!(transport.connect_urls().iter().all(|url| url == URL));
    assert_eq!(error_count(), 6);
    assert_eq!(sync.connection_state(), ConnectionState::Disconnected);
    assert!(sync.is_exhausted());
}

#[tokio::test(start_paused = true)]
async fn waits_in_connecting_between_attempts() {
    let transport = Arc::new(MockPushTransport::new());
    let sync = sync_with(&transport);

    sync.start(StartOptions::default());
    settle().await;

    assert_eq!(transport.connect_count(), 1);
    assert_eq!(sync.connection_state(), ConnectionState::Connecting);
    assert!(!sync.is_exhausted());

    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn zero_attempts_gives_up_after_first_failure() {
    let transport = Arc::new(MockPushTransport::new());
    let mut config = LiveSyncConfig::new(URL);
    config.reconnect = ReconnectConfig {
        max_attempts: 0,
        ..ReconnectConfig::default()
    };
    let sync = LiveDataSync::new(config, Arc::clone(&transport) as Arc<dyn PushTransport>);

    sync.start(StartOptions::default());
    sleep(Duration::from_secs(60)).await;

    assert_eq!(transport.connect_count(), 1);
    assert!(sync.is_exhausted());
    assert_eq!(sync.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn successful_open_resets_backoff() {
    let transport = Arc::new(MockPushTransport::new());
    transport.refuse("first");
    transport.refuse("second");
    let peer = transport.accept();
    let sync = sync_with(&transport);

    sync.start(StartOptions::default());
    sleep(Duration::from_secs(7)).await;
    assert_eq!(sync.connection_state(), ConnectionState::Connected);
    assert_eq!(gaps(&transport.connect_times()), [2, 4]);

    let closed_at = Instant::now();
    peer.close(CloseCode::ABNORMAL);
    sleep(Duration::from_secs(3)).await;

    let times = transport.connect_times();
    assert_eq!(times.len(), 4);
    assert_eq!((times[3] - closed_at).as_secs(), 2);

    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn error_then_abnormal_close_reconnects() {
    let transport = Arc::new(MockPushTransport::new());
    let first = transport.accept();
    let second = transport.accept();
    let sync = sync_with(&transport);
    let (errors, error_count) = counter();

    sync.start(StartOptions::default().on_error(move |_| {
        errors.fetch_add(1, Ordering::SeqCst);
    }));
    settle().await;

    first.push_error("connection reset");
    settle().await;
    assert_eq!(sync.connection_state(), ConnectionState::Error);
    assert_eq!(error_count(), 1);

    first.close(CloseCode::ABNORMAL);
    settle().await;
    assert_eq!(sync.connection_state(), ConnectionState::Connecting);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(sync.connection_state(), ConnectionState::Connected);
    assert_eq!(transport.connect_count(), 2);
    assert_eq!(second.sent().len(), 1);

    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn error_without_close_keeps_socket_open() {
    let transport = Arc::new(MockPushTransport::new());
    let peer = transport.accept();
    let sync = sync_with(&transport);

    sync.start(StartOptions::default());
    settle().await;
    assert!(sync.snapshot().open);

    peer.push_error("transient");
    settle().await;

    let state = sync.snapshot();
    assert_eq!(state.connection, ConnectionState::Error);
    assert!(state.open);
    assert!(state.push_active());

    assert!(sync.send(&json!({"type": "ping"})));
    peer.push_text(&market_data_frame());
    settle().await;
    assert_eq!(peer.sent().len(), 2);
    assert!(sync.market_data().is_some());

    peer.close(CloseCode::ABNORMAL);
    settle().await;

    let state = sync.snapshot();
    assert!(!state.open);
    assert_eq!(state.connection, ConnectionState::Connecting);
    assert!(!sync.send(&json!({"type": "ping"})));
    assert_eq!(transport.connect_count(), 1);

    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn dropped_connection_counts_as_abnormal() {
    let transport = Arc::new(MockPushTransport::new());
    let peer = transport.accept();
    let sync = sync_with(&transport);

    sync.start(StartOptions::default());
    settle().await;
    drop(peer);
    settle().await;

    assert_eq!(sync.connection_state(), ConnectionState::Connecting);
    sleep(Duration::from_secs(3)).await;
    assert_eq!(transport.connect_count(), 2);

    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn normal_close_does_not_retry() {
    let transport = Arc::new(MockPushTransport::new());
    let peer = transport.accept();
    let sync = sync_with(&transport);

    sync.start(StartOptions::default());
    settle().await;
    peer.close(CloseCode::NORMAL);
    sleep(Duration::from_secs(60)).await;

    assert_eq!(transport.connect_count(), 1);
    assert_eq!(sync.connection_state(), ConnectionState::Disconnected);
    assert!(!sync.is_exhausted());
}

// =============================================================================
// Messages
// =============================================================================

#[tokio::test(start_paused = true)]
async fn subscribes_on_open() {
    let transport = Arc::new(MockPushTransport::new());
    let peer = transport.accept();
    let sync = sync_with(&transport);

    sync.start(StartOptions::default());
    settle().await;

    assert_eq!(sync.connection_state(), ConnectionState::Connected);
    let sent = peer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&sent[0]).unwrap(),
        json!({"type": "subscribe", "channels": ["market-data", "insights", "trends"]})
    );

    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn routes_market_data_and_insights() {
    let transport = Arc::new(MockPushTransport::new());
    let peer = transport.accept();
    let sync = sync_with(&transport);
    let (received, received_count) = counter();

    sync.start(StartOptions::default().on_data(move |_| {
        received.fetch_add(1, Ordering::SeqCst);
    }));
    settle().await;

    peer.push_text(&market_data_frame());
    settle().await;

    let state = sync.snapshot();
    let market = state.market_data.expect("market data applied");
    assert_eq!(market.industry.as_deref(), Some("General"));
    assert!(state.insights.is_none());
    let stamped = state.last_update.expect("last update set");

    sleep(Duration::from_secs(1)).await;
    peer.push_text(&insights_frame());
    settle().await;

    let ids: Vec<_> = sync
        .insights()
        .expect("insights applied")
        .iter()
        .map(|i| i.id.clone())
        .collect();
    assert_eq!(ids, ["1", "3", "2"]);
    assert_eq!(sync.last_update(), Some(stamped));
    assert_eq!(sync.market_data(), Some(market));
    assert_eq!(received_count(), 2);

    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn malformed_and_unknown_messages_leave_state_alone() {
    let transport = Arc::new(MockPushTransport::new());
    let peer = transport.accept();
    let sync = sync_with(&transport);
    let (received, received_count) = counter();

    sync.start(StartOptions::default().on_data(move |_| {
        received.fetch_add(1, Ordering::SeqCst);
    }));
    settle().await;
    let before = sync.snapshot();

    peer.push_text("not json");
    peer.push_text(r#"{"payload": {}}"#);
    peer.push_text(r#"{"type": "market-data", "payload": {"trends": "nope"}}"#);
    peer.push_text(r#"{"type": "heartbeat", "payload": {}}"#);
    settle().await;

    assert_eq!(sync.snapshot(), before);
    assert_eq!(sync.connection_state(), ConnectionState::Connected);
    assert_eq!(received_count(), 1);

    sync.shutdown().await;
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn stop_closes_normally_and_never_reconnects() {
    let transport = Arc::new(MockPushTransport::new());
    let peer = transport.accept();
    let sync = sync_with(&transport);

    sync.start(StartOptions::default());
    settle().await;
    sync.shutdown().await;

    assert_eq!(
        peer.closed_with(),
        Some((CloseCode::NORMAL, "client disconnect".to_string()))
    );
    sleep(Duration::from_secs(60)).await;
    assert_eq!(transport.connect_count(), 1);
    assert_eq!(sync.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn stop_during_backoff_cancels_pending_attempt() {
    let transport = Arc::new(MockPushTransport::new());
    let sync = sync_with(&transport);

    sync.start(StartOptions::default());
    settle().await;
    sync.stop();
    sleep(Duration::from_secs(60)).await;

    assert_eq!(transport.connect_count(), 1);
    assert_eq!(sync.connection_state(), ConnectionState::Disconnected);
    assert!(!sync.is_exhausted());
}

#[tokio::test(start_paused = true)]
async fn nothing_is_delivered_after_stop() {
    let transport = Arc::new(MockPushTransport::new());
    let peer = transport.accept();
    let sync = sync_with(&transport);
    let (received, received_count) = counter();

    sync.start(StartOptions::default().on_data(move |_| {
        received.fetch_add(1, Ordering::SeqCst);
    }));
    settle().await;
    sync.stop();

    peer.push_text(&market_data_frame());
    settle().await;

    assert_eq!(received_count(), 0);
    assert!(sync.snapshot().market_data.is_none());
    assert_eq!(sync.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent_while_running() {
    let transport = Arc::new(MockPushTransport::new());
    let _peer = transport.accept();
    let sync = sync_with(&transport);

    sync.start(StartOptions::default());
    sync.start(StartOptions::default());
    settle().await;
    sync.start(StartOptions::default());
    settle().await;

    assert_eq!(transport.connect_count(), 1);
    assert_eq!(sync.connection_state(), ConnectionState::Connected);

    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn restart_after_stop_opens_new_session() {
    let transport = Arc::new(MockPushTransport::new());
    let _first = transport.accept();
    let second = transport.accept();
    let sync = sync_with(&transport);

    sync.start(StartOptions::default());
    settle().await;
    sync.shutdown().await;

    sync.start(StartOptions::default());
    settle().await;

    assert_eq!(transport.connect_count(), 2);
    assert_eq!(sync.connection_state(), ConnectionState::Connected);
    assert_eq!(second.sent().len(), 1);

    sync.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn exhausted_instance_never_restarts() {
    let transport = Arc::new(MockPushTransport::new());
    let sync = sync_with(&transport);

    sync.start(StartOptions::default());
    sleep(Duration::from_secs(120)).await;
    assert!(sync.is_exhausted());

    let _peer = transport.accept();
    sync.start(StartOptions::default());
    sleep(Duration::from_secs(10)).await;

    assert_eq!(transport.connect_count(), 6);
    assert_eq!(sync.connection_state(), ConnectionState::Disconnected);
}

// =============================================================================
// Sending
// =============================================================================

#[tokio::test(start_paused = true)]
async fn send_requires_open_connection() {
    let transport = Arc::new(MockPushTransport::new());
    let peer = transport.accept();
    let sync = sync_with(&transport);

    assert!(!sync.send(&json!({"type": "ping"})));

    sync.start(StartOptions::default());
    settle().await;

    assert!(sync.send(&json!({"type": "ping"})));
    settle().await;

    let sent = peer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1], r#"{"type":"ping"}"#);

    sync.shutdown().await;
    assert!(!sync.send(&json!({"type": "ping"})));
}

#[tokio::test(start_paused = true)]
async fn send_is_refused_while_reconnecting() {
    let transport = Arc::new(MockPushTransport::new());
    let sync = sync_with(&transport);

    sync.start(StartOptions::default());
    settle().await;

    assert_eq!(sync.connection_state(), ConnectionState::Connecting);
    assert!(!sync.send(&json!({"type": "ping"})));

    sync.shutdown().await;
}
