//! Push Channel Messages
//!
//! Inbound messages are tagged `{type, payload}` envelopes; outbound control
//! messages are `{type, channels}`. Decoding lives in the push codec, which
//! inspects the tag before touching the payload.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::insight::InsightSet;
use crate::domain::market::MarketSnapshot;

/// Channel carrying market snapshots.
pub const MARKET_DATA_CHANNEL: &str = "market-data";
/// Channel carrying insight sets.
pub const INSIGHTS_CHANNEL: &str = "insights";
/// Channel carrying trend updates (subscribed to, never routed).
pub const TRENDS_CHANNEL: &str = "trends";

/// Channels subscribed to on every connection open.
#[must_use]
pub fn default_channels() -> Vec<String> {
    [MARKET_DATA_CHANNEL, INSIGHTS_CHANNEL, TRENDS_CHANNEL]
        .into_iter()
        .map(String::from)
        .collect()
}

/// A decoded inbound push message.
#[derive(Debug, Clone, PartialEq)]
pub enum PushMessage {
    /// Replacement market snapshot.
    MarketData(Arc<MarketSnapshot>),
    /// Replacement insight set.
    Insights(Arc<InsightSet>),
    /// Well-formed envelope with a type this client does not route.
    Unknown {
        /// The envelope's `type` tag.
        kind: String,
    },
}

impl PushMessage {
    /// The envelope's `type` tag.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::MarketData(_) => MARKET_DATA_CHANNEL,
            Self::Insights(_) => INSIGHTS_CHANNEL,
            Self::Unknown { kind } => kind,
        }
    }

    /// Bounded label for metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::MarketData(_) => MARKET_DATA_CHANNEL,
            Self::Insights(_) => INSIGHTS_CHANNEL,
            Self::Unknown { .. } => "unknown",
        }
    }
}

/// Outbound control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Start receiving the named channels.
    Subscribe {
        /// Channel names.
        channels: Vec<String>,
    },
    /// Stop receiving the named channels.
    Unsubscribe {
        /// Channel names.
        channels: Vec<String>,
    },
}

impl ClientMessage {
    /// Subscribe to `channels`.
    #[must_use]
    pub const fn subscribe(channels: Vec<String>) -> Self {
        Self::Subscribe { channels }
    }

    /// Channels named by the message.
    #[must_use]
    pub fn channels(&self) -> &[String] {
        match self {
            Self::Subscribe { channels } | Self::Unsubscribe { channels } => channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscribe_wire_format() {
        let msg = ClientMessage::subscribe(default_channels());
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "subscribe", "channels": ["market-data", "insights", "trends"]})
        );
    }

    #[test]
    fn client_message_roundtrip_from_wire() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"unsubscribe","channels":["trends"]}"#).unwrap();
        assert_eq!(msg.channels(), ["trends".to_string()]);
        assert!(matches!(msg, ClientMessage::Unsubscribe { .. }));
    }

    #[test]
    fn unknown_kind_label_is_bounded() {
        let msg = PushMessage::Unknown {
            kind: "heartbeat".into(),
        };
        assert_eq!(msg.kind(), "heartbeat");
        assert_eq!(msg.label(), "unknown");
    }
}
