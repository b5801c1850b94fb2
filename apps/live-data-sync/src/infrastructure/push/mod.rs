//! Push Adapters
//!
//! - **Codec**: `{type, payload}` envelopes to [`PushMessage`](crate::domain::streaming::PushMessage)
//! - **Client**: `tokio-tungstenite` transport
//! - **Mock**: scripted in-memory transport for tests

pub mod client;
pub mod codec;
pub mod mock;

pub use client::{WebSocketConnection, WebSocketTransport};
pub use codec::{CodecError, JsonCodec};
pub use mock::{MockPeer, MockPushTransport};
