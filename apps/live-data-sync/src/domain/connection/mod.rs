//! Connection State
//!
//! Status of a push session as seen by consumers, the close codes that decide
//! whether a closed connection is retried, and the reconnect policy.

mod reconnect;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use reconnect::{ReconnectConfig, ReconnectPolicy};

/// Connection status of a push session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No push connection and none being attempted.
    #[default]
    Disconnected,
    /// Opening a connection or waiting out a reconnect delay.
    Connecting,
    /// Push connection open and subscribed.
    Connected,
    /// The transport reported an error; a close event usually follows.
    Error,
}

impl ConnectionState {
    /// Lowercase name, as shown on status indicators.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WebSocket close code (RFC 6455 section 7.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloseCode(u16);

impl CloseCode {
    /// Clean, expected closure.
    pub const NORMAL: Self = Self(1000);
    /// Endpoint going away (server shutdown, page navigation).
    pub const GOING_AWAY: Self = Self(1001);
    /// Close frame carried no status code.
    pub const NO_STATUS: Self = Self(1005);
    /// Connection dropped without a close frame.
    pub const ABNORMAL: Self = Self(1006);

    /// Wrap a raw close code.
    #[must_use]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Raw numeric code.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Only a normal closure is exempt from reconnection.
    #[must_use]
    pub const fn is_normal(self) -> bool {
        self.0 == Self::NORMAL.0
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
