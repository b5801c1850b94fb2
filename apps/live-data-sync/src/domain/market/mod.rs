//! Market Snapshot
//!
//! A point-in-time bundle of trend scores, audience sentiment, competitor
//! activity, brand mentions, and real-time metrics. Snapshots are never
//! merged: each one received replaces the previous one wholesale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Snapshot
// ============================================================================

/// Full market data view, as served by the live endpoint and pushed on the
/// `market-data` channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    /// Industry the snapshot was computed for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// Keyword trend scores.
    pub trends: Vec<TrendScore>,
    /// Audience sentiment breakdown.
    pub sentiment: SentimentBreakdown,
    /// Recent competitor moves.
    #[serde(default)]
    pub competitor_activity: Vec<CompetitorActivity>,
    /// Recent brand mentions.
    #[serde(default)]
    pub brand_mentions: Vec<BrandMention>,
    /// Derived real-time metrics, absent on older feeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_time_metrics: Option<RealTimeMetrics>,
    /// When the producer computed this snapshot.
    pub last_updated: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Whether this snapshot was computed before `other`.
    ///
    /// Used only for logging: replacement is last-write-wins regardless.
    #[must_use]
    pub fn is_older_than(&self, other: &Self) -> bool {
        self.last_updated < other.last_updated
    }
}

// ============================================================================
// Trends
// ============================================================================

/// Score for one tracked keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendScore {
    /// Tracked keyword.
    pub keyword: String,
    /// Interest score (0-100).
    pub score: f64,
    /// Change over the timeframe, in points.
    pub change: f64,
    /// Direction of the trend.
    pub category: TrendDirection,
    /// Window the score covers.
    pub timeframe: TrendTimeframe,
}

/// Direction a trend is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// Gaining interest.
    Rising,
    /// Losing interest.
    Falling,
    /// Roughly flat.
    Stable,
}

/// Window a trend score covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendTimeframe {
    /// Last 24 hours.
    #[serde(rename = "24h")]
    Day,
    /// Last 7 days.
    #[serde(rename = "7d")]
    Week,
    /// Last 30 days.
    #[serde(rename = "30d")]
    Month,
}

// ============================================================================
// Sentiment, Competitors, Mentions
// ============================================================================

/// Share of positive/neutral/negative mentions, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentBreakdown {
    /// Positive share.
    pub positive: f64,
    /// Neutral share.
    pub neutral: f64,
    /// Negative share.
    pub negative: f64,
    /// Aggregate score (0-100).
    pub overall_score: f64,
    /// Most discussed topics.
    #[serde(default)]
    pub key_topics: Vec<String>,
}

/// Expected impact of an event or insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    /// High impact.
    High,
    /// Medium impact.
    Medium,
    /// Low impact.
    Low,
}

/// A competitor move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorActivity {
    /// Competitor name.
    pub name: String,
    /// What they did.
    pub activity: String,
    /// Expected impact.
    pub impact: Impact,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

/// Tone of a brand mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionSentiment {
    /// Positive.
    Positive,
    /// Neutral.
    Neutral,
    /// Negative.
    Negative,
}

/// A single brand mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandMention {
    /// Platform the mention came from.
    pub source: String,
    /// Mention text.
    pub content: String,
    /// Tone.
    pub sentiment: MentionSentiment,
    /// Estimated audience.
    pub reach: u64,
    /// When it was posted.
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Real-Time Metrics
// ============================================================================

/// Current values with deltas for the headline dashboard tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealTimeMetrics {
    /// Site visitors.
    pub website_traffic: MetricDelta,
    /// Social interactions.
    pub social_engagement: MetricDelta,
    /// Brand sentiment score.
    pub brand_sentiment: MetricDelta,
}

/// A metric value and its change in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    /// Current value. Sentiment feeds name this `score`.
    #[serde(alias = "score")]
    pub current: f64,
    /// Change in percent.
    pub change: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const LIVE_PAYLOAD: &str = r#"{
        "industry": "Technology",
        "trends": [
            {"keyword": "ai automation", "score": 81, "change": -4, "category": "falling", "timeframe": "24h"},
            {"keyword": "data privacy", "score": 90, "change": 3, "category": "rising", "timeframe": "30d"}
        ],
        "sentiment": {"positive": 70, "neutral": 20, "negative": 10, "overallScore": 88, "keyTopics": ["security"]},
        "competitorActivity": [
            {"name": "TechCorp Inc.", "activity": "Launched a bot", "impact": "high", "timestamp": "2026-01-05T10:00:00Z"}
        ],
        "brandMentions": [
            {"source": "Reddit", "content": "Needs docs", "sentiment": "neutral", "reach": 640, "timestamp": "2026-01-05T11:00:00Z"}
        ],
        "lastUpdated": "2026-01-05T12:00:00.000Z",
        "realTimeMetrics": {
            "websiteTraffic": {"current": 812, "change": 12},
            "socialEngagement": {"current": 230, "change": -8},
            "brandSentiment": {"score": 91, "change": 2}
        }
    }"#;

    #[test]
    fn decodes_live_endpoint_payload() {
        let snapshot: MarketSnapshot = serde_json::from_str(LIVE_PAYLOAD).unwrap();

        assert_eq!(snapshot.industry.as_deref(), Some("Technology"));
        assert_eq!(snapshot.trends.len(), 2);
        assert_eq!(snapshot.trends[0].category, TrendDirection::Falling);
        assert_eq!(snapshot.trends[1].timeframe, TrendTimeframe::Month);
        assert!((snapshot.sentiment.overall_score - 88.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.competitor_activity[0].impact, Impact::High);
        assert_eq!(
            snapshot.brand_mentions[0].sentiment,
            MentionSentiment::Neutral
        );

        let metrics = snapshot.real_time_metrics.unwrap();
        assert!((metrics.brand_sentiment.current - 91.0).abs() < f64::EPSILON);
        assert!((metrics.social_engagement.change + 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn optional_sections_may_be_absent() {
        let json = r#"{
            "trends": [],
            "sentiment": {"positive": 1, "neutral": 1, "negative": 1, "overallScore": 1},
            "lastUpdated": "2026-01-05T12:00:00Z"
        }"#;
        let snapshot: MarketSnapshot = serde_json::from_str(json).unwrap();

        assert!(snapshot.industry.is_none());
        assert!(snapshot.competitor_activity.is_empty());
        assert!(snapshot.brand_mentions.is_empty());
        assert!(snapshot.real_time_metrics.is_none());
        assert!(snapshot.sentiment.key_topics.is_empty());
    }

    #[test]
    fn serializes_camel_case() {
        let snapshot: MarketSnapshot = serde_json::from_str(LIVE_PAYLOAD).unwrap();
        let value = serde_json::to_value(&snapshot).unwrap();

        assert!(value.get("lastUpdated").is_some());
        assert!(value.get("competitorActivity").is_some());
        assert_eq!(value["trends"][0]["timeframe"], "24h");
        assert_eq!(value["realTimeMetrics"]["brandSentiment"]["current"], 91.0);
    }

    #[test]
    fn older_snapshot_detection() {
        let newer: MarketSnapshot = serde_json::from_str(LIVE_PAYLOAD).unwrap();
        let mut older = newer.clone();
        older.last_updated = newer.last_updated - Duration::minutes(5);

        assert!(older.is_older_than(&newer));
        assert!(!newer.is_older_than(&older));
        assert!(!newer.is_older_than(&newer));
    }
}
