//! WebSocket Push Client
//!
//! `tokio-tungstenite` adapter for [`PushTransport`]. Text frames are decoded
//! with [`JsonCodec`]; control frames are handled here so the session only
//! ever sees messages, errors, and a single close.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::codec::JsonCodec;
use crate::application::ports::{PushConnection, PushEvent, PushTransport, TransportError};
use crate::domain::connection::CloseCode;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =============================================================================
// Transport
// =============================================================================

/// Opens push connections over `ws://` or `wss://`.
#[derive(Debug, Default, Clone)]
pub struct WebSocketTransport {
    codec: JsonCodec,
}

impl WebSocketTransport {
    /// Create a new transport.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            codec: JsonCodec::new(),
        }
    }
}

#[async_trait]
impl PushTransport for WebSocketTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn PushConnection>, TransportError> {
        tracing::debug!(url, "Opening push connection");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            TransportError::ConnectFailed {
                message: e.to_string(),
            }
        })?;

        Ok(Box::new(WebSocketConnection {
            stream,
            codec: self.codec.clone(),
            closed: None,
        }))
    }
}

// =============================================================================
// Connection
// =============================================================================

/// An open WebSocket push connection.
pub struct WebSocketConnection {
    stream: WsStream,
    codec: JsonCodec,
    closed: Option<(CloseCode, String)>,
}

impl WebSocketConnection {
    fn mark_closed(&mut self, code: CloseCode, reason: String) -> PushEvent {
        self.closed = Some((code, reason.clone()));
        PushEvent::Closed { code, reason }
    }
}

#[async_trait]
impl PushConnection for WebSocketConnection {
    async fn next_event(&mut self) -> PushEvent {
        loop {
            if let Some((code, reason)) = &self.closed {
                return PushEvent::Closed {
                    code: *code,
                    reason: reason.clone(),
                };
            }

            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return match self.codec.decode(text.as_str()) {
                        Ok(message) => PushEvent::Message(message),
                        Err(e) => PushEvent::Malformed(e.to_string()),
                    };
                }
                Some(Ok(Message::Binary(_))) => {
                    return PushEvent::Malformed("binary frame".to_string());
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = self.stream.send(Message::Pong(data)).await {
                        tracing::debug!(error = %e, "Failed to answer ping");
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame.map_or_else(
                        || (CloseCode::NO_STATUS, String::new()),
                        |f| (CloseCode::new(u16::from(f.code)), f.reason.to_string()),
                    );
                    tracing::debug!(code = code.as_u16(), reason = %reason, "Server sent close frame");
                    return self.mark_closed(code, reason);
                }
                Some(Ok(_)) => {
                    // Pong and raw frames
                }
                Some(Err(e)) => {
                    // Browsers report an error and then an abnormal close.
                    self.closed = Some((CloseCode::ABNORMAL, String::new()));
                    return PushEvent::Error(TransportError::WebSocket {
                        message: e.to_string(),
                    });
                }
                None => {
                    return self.mark_closed(CloseCode::ABNORMAL, String::new());
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

        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::SendFailed {
                message: e.to_string(),
            })
    }

    async fn close(&mut self, code: CloseCode, reason: &str) {
        if self.closed.is_some() {
            return;
        }

        let frame = CloseFrame {
            code: WsCloseCode::from(code.as_u16()),
            reason: reason.to_owned().into(),
        };

        if let Err(e) = self.stream.close(Some(frame)).await {
            tracing::debug!(error = %e, "Close handshake failed");
        }
        self.closed = Some((code, reason.to_owned()));
    }
}
