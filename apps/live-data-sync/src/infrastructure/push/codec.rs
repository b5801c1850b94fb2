//! Push Codec
//!
//! JSON encoding and decoding of push envelopes:
//!
//! ```json
//! {"type":"market-data","payload":{"trends":[...],"lastUpdated":"..."}}
//! {"type":"insights","payload":[{"id":"...","relevanceScore":94,...}]}
//! ```
//!
//! The `type` tag is inspected before the payload is decoded, so an unknown
//! tag never fails on its payload.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::domain::insight::{InsightSet, InsightsResponse};
use crate::domain::market::MarketSnapshot;
use crate::domain::streaming::{INSIGHTS_CHANNEL, MARKET_DATA_CHANNEL, PushMessage};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Envelope has no string `type` field.
    #[error("message has no type tag")]
    MissingType,

    /// Known type with a payload that does not match it.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        /// The envelope's type tag.
        kind: String,
        /// Underlying decode error.
        source: serde_json::Error,
    },

    /// Invalid message format.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for push envelopes.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a JSON object with a string
    /// `type`, or if a routed type carries a payload of the wrong shape.
    pub fn decode(&self, text: &str) -> Result<PushMessage, CodecError> {
        let trimmed = text.trim();

        if !trimmed.starts_with('{') {
            return Err(CodecError::InvalidFormat(format!(
                "expected JSON object, got: {}...",
                trimmed.chars().take(50).collect::<String>()
            )));
        }

        let mut value: Value = serde_json::from_str(trimmed)?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(CodecError::MissingType)?
            .to_string();

        let payload = value
            .get_mut("payload")
            .map(Value::take)
            .unwrap_or(Value::Null);

        match kind.as_str() {
            MARKET_DATA_CHANNEL => {
                let snapshot: MarketSnapshot = serde_json::from_value(payload)
                    .map_err(|source| CodecError::InvalidPayload { kind, source })?;
                Ok(PushMessage::MarketData(Arc::new(snapshot)))
            }
            INSIGHTS_CHANNEL => {
                let insights = Self::decode_insights(payload)
                    .map_err(|source| CodecError::InvalidPayload { kind, source })?;
                Ok(PushMessage::Insights(Arc::new(insights)))
            }
            _ => Ok(PushMessage::Unknown { kind }),
        }
    }

    /// Insights arrive either as a bare array or as a full endpoint response.
    fn decode_insights(payload: Value) -> Result<InsightSet, serde_json::Error> {
        if payload.is_object() {
            let response: InsightsResponse = serde_json::from_value(payload)?;
            Ok(response.insights)
        } else {
            serde_json::from_value(payload)
        }
    }

    /// Encode a push message as a `{type, payload}` envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode_push(&self, message: &PushMessage) -> Result<String, CodecError> {
        let payload = match message {
            PushMessage::MarketData(snapshot) => serde_json::to_value(snapshot.as_ref())?,
            PushMessage::Insights(insights) => serde_json::to_value(insights.as_ref())?,
            PushMessage::Unknown { .. } => Value::Null,
        };

        self.encode(&serde_json::json!({
            "type": message.kind(),
            "payload": payload,
        }))
    }

    /// Encode a value to JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}
