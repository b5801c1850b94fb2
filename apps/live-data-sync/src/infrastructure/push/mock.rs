//! Mock push transport for testing.
//!
//! Connect attempts are answered from a script. An accepted connection hands
//! the test a [`MockPeer`] that plays the server side: it injects frames,
//! errors, and closes, and records what the client sent.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::codec::JsonCodec;
use crate::application::ports::{PushConnection, PushEvent, PushTransport, TransportError};
use crate::domain::connection::CloseCode;
use crate::domain::streaming::PushMessage;

enum Scripted {
    Refuse(String),
    Accept(MockConnection),
}

/// Scripted push transport. Unscripted attempts are refused.
#[derive(Default)]
pub struct MockPushTransport {
    script: Mutex<VecDeque<Scripted>>,
    attempts: Mutex<Vec<(Instant, String)>>,
}

impl std::fmt::Debug for MockPushTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPushTransport")
            .field("scripted", &self.script.lock().len())
            .field("attempts", &self.attempts.lock().len())
            .finish()
    }
}

impl MockPushTransport {
    /// Create a transport that refuses every attempt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next unscripted attempt to fail.
    pub fn refuse(&self, message: &str) {
        self.script
            .lock()
            .push_back(Scripted::Refuse(message.to_string()));
    }

    /// Script the next unscripted attempt to open, returning the server side.
    #[must_use]
    pub fn accept(&self) -> MockPeer {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(PeerShared::default());

        self.script.lock().push_back(Scripted::Accept(MockConnection {
            events: rx,
            shared: Arc::clone(&shared),
            closed: None,
        }));

        MockPeer {
            events: tx,
            shared,
            codec: JsonCodec::new(),
        }
    }

    /// Number of connect attempts so far.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.attempts.lock().len()
    }

    /// When each connect attempt was made.
    #[must_use]
    pub fn connect_times(&self) -> Vec<Instant> {
        self.attempts.lock().iter().map(|(at, _)| *at).collect()
    }

    /// URLs passed to each connect attempt.
    #[must_use]
    pub fn connect_urls(&self) -> Vec<String> {
        self.attempts
            .lock()
            .iter()
            .map(|(_, url)| url.clone())
            .collect()
    }
}

#[async_trait]
impl PushTransport for MockPushTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn PushConnection>, TransportError> {
        self.attempts.lock().push((Instant::now(), url.to_string()));

        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Accept(connection)) => Ok(Box::new(connection)),
            Some(Scripted::Refuse(message)) => Err(TransportError::ConnectFailed { message }),
            None => Err(TransportError::ConnectFailed {
                message: "connection refused".to_string(),
            }),
        }
    }
}

#[derive(Debug, Default)]
struct PeerShared {
    sent: Mutex<Vec<String>>,
    closed_with: Mutex<Option<(CloseCode, String)>>,
}

/// Client side of a scripted connection.
struct MockConnection {
    events: mpsc::UnboundedReceiver<PushEvent>,
    shared: Arc<PeerShared>,
    closed: Option<(CloseCode, String)>,
}

#[async_trait]
impl PushConnection for MockConnection {
    async fn next_event(&mut self) -> PushEvent {
        if let Some((code, reason)) = &self.closed {
            return PushEvent::Closed {
                code: *code,
                reason: reason.clone(),
            };
        }

        match self.events.recv().await {
            Some(PushEvent::Closed { code, reason }) => {
                self.closed = Some((code, reason.clone()));
                PushEvent::Closed { code, reason }
            }
            Some(event) => event,
            None => {
                self.closed = Some((CloseCode::ABNORMAL, String::new()));
                PushEvent::Closed {
                    code: CloseCode::ABNORMAL,
                    reason: String::new(),
                }
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed.is_some() {
            return Err(TransportError::SendFailed {
                message: "connection closed".to_string(),
            });
        }
        self.shared.sent.lock().push(text);
        Ok(())
    }

    async fn close(&mut self, code: CloseCode, reason: &str) {
        if self.closed.is_some() {
            return;
        }
        *self.shared.closed_with.lock() = Some((code, reason.to_string()));
        self.closed = Some((code, reason.to_string()));
    }
}

/// Server side of a scripted connection.
#[derive(Debug, Clone)]
pub struct MockPeer {
    events: mpsc::UnboundedSender<PushEvent>,
    shared: Arc<PeerShared>,
    codec: JsonCodec,
}

impl MockPeer {
    /// Deliver a raw text frame, decoded as the WebSocket adapter would.
    pub fn push_text(&self, text: &str) {
        let event = match self.codec.decode(text) {
            Ok(message) => PushEvent::Message(message),
            Err(e) => PushEvent::Malformed(e.to_string()),
        };
        let _ = self.events.send(event);
    }

    /// Deliver a decoded message.
    pub fn push_message(&self, message: PushMessage) {
        let _ = self.events.send(PushEvent::Message(message));
    }

    /// Deliver a transport error.
    pub fn push_error(&self, message: &str) {
        let _ = self.events.send(PushEvent::Error(TransportError::WebSocket {
            message: message.to_string(),
        }));
    }

    /// Close from the server side.
    pub fn close(&self, code: CloseCode) {
        let _ = self.events.send(PushEvent::Closed {
            code,
            reason: String::new(),
        });
    }

    /// Text frames the client sent.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.shared.sent.lock().clone()
    }

    /// Code and reason the client closed with, if it closed.
    #[must_use]
    pub fn closed_with(&self) -> Option<(CloseCode, String)> {
        self.shared.closed_with.lock().clone()
    }
}
