//! Push Transport Port (Driven Port)
//!
//! Interface for opening a push connection and reading decoded events from it.

use async_trait::async_trait;

use crate::domain::connection::CloseCode;
use crate::domain::streaming::PushMessage;

/// Push transport error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be opened.
    #[error("push connect failed: {message}")]
    ConnectFailed {
        /// Error details.
        message: String,
    },

    /// The open connection reported a protocol or I/O error.
    #[error("push transport error: {message}")]
    WebSocket {
        /// Error details.
        message: String,
    },

    /// An outbound frame could not be written.
    #[error("push send failed: {message}")]
    SendFailed {
        /// Error details.
        message: String,
    },
}

/// Event read from an open push connection.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// A well-formed envelope.
    Message(PushMessage),
    /// A text frame that did not decode; the connection stays open.
    Malformed(String),
    /// Transport-level error; a `Closed` event normally follows.
    Error(TransportError),
    /// The connection is closed. No further events follow.
    Closed {
        /// Close code (1006 when the peer vanished without a close frame).
        code: CloseCode,
        /// Close reason, possibly empty.
        reason: String,
    },
}

/// An open push connection.
#[async_trait]
pub trait PushConnection: Send {
    /// Next event, in delivery order.
    ///
    /// Returns `Closed` once the connection is gone, and keeps returning it.
    async fn next_event(&mut self) -> PushEvent;

    /// Send a text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Close with `code` and `reason`. Errors are swallowed.
    async fn close(&mut self, code: CloseCode, reason: &str);
}

/// Opens push connections.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Open a connection to `url`.
    async fn connect(&self, url: &str) -> Result<Box<dyn PushConnection>, TransportError>;
}
