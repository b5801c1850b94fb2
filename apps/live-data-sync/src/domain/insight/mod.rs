//! Personalized Insights
//!
//! Insight records and the ordered set a dashboard renders. An [`InsightSet`]
//! is always sorted by relevance, highest first, and is replaced wholesale on
//! each refresh.

use std::cmp::Ordering;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::market::Impact;

/// Kind of insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    /// Something worth acting on.
    Opportunity,
    /// Something going wrong.
    Warning,
    /// A shift in audience behavior.
    Trend,
    /// A suggested change.
    Recommendation,
}

/// A single personalized insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    /// Producer-assigned identifier.
    pub id: String,
    /// Kind of insight.
    #[serde(rename = "type")]
    pub kind: InsightKind,
    /// Headline.
    pub title: String,
    /// Body text.
    pub description: String,
    /// Expected impact.
    pub impact: Impact,
    /// Suggested next steps.
    #[serde(default)]
    pub action_items: Vec<String>,
    /// Sort key, higher is more relevant.
    pub relevance_score: f64,
    /// Human-readable window, e.g. "Next 7 days".
    pub timeframe: String,
    /// Free-form supporting figures.
    #[serde(default)]
    pub data: Value,
}

/// Insights ordered by descending relevance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Insight>", into = "Vec<Insight>")]
pub struct InsightSet(Vec<Insight>);

impl InsightSet {
    /// Build a set, sorting by relevance (stable for ties).
    #[must_use]
    pub fn new(mut insights: Vec<Insight>) -> Self {
        insights.sort_by(by_relevance_desc);
        Self(insights)
    }
}

fn by_relevance_desc(a: &Insight, b: &Insight) -> Ordering {
    b.relevance_score.total_cmp(&a.relevance_score)
}

impl From<Vec<Insight>> for InsightSet {
    fn from(insights: Vec<Insight>) -> Self {
        Self::new(insights)
    }
}

impl From<InsightSet> for Vec<Insight> {
    fn from(set: InsightSet) -> Self {
        set.0
    }
}

impl FromIterator<Insight> for InsightSet {
    fn from_iter<I: IntoIterator<Item = Insight>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Deref for InsightSet {
    type Target = [Insight];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Body of the personalized insights endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsResponse {
    /// Insights, re-sorted on decode.
    pub insights: InsightSet,
    /// When the set was generated.
    pub generated_at: DateTime<Utc>,
    /// When the producer expects to regenerate.
    pub next_update: DateTime<Utc>,
    /// Count reported by the producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_insights: Option<usize>,
}

/// Request body for the personalized insights endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRequest {
    /// User the insights are for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Free-form preferences, `{}` when none.
    #[serde(default = "empty_object")]
    pub preferences: Value,
}

impl InsightRequest {
    /// Request for `user_id` with no preferences.
    #[must_use]
    pub fn for_user(user_id: Option<String>) -> Self {
        Self {
            user_id,
            preferences: empty_object(),
        }
    }
}

impl Default for InsightRequest {
    fn default() -> Self {
        Self::for_user(None)
    }
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn insight(id: &str, score: f64) -> Insight {
        Insight {
            id: id.to_string(),
            kind: InsightKind::Trend,
            title: format!("insight {id}"),
            description: String::new(),
            impact: Impact::Low,
            action_items: vec![],
            relevance_score: score,
            timeframe: "This week".to_string(),
            data: Value::Null,
        }
    }

    #[test]
    fn sorted_by_relevance_descending() {
        let set = InsightSet::new(vec![
            insight("a", 71.0),
            insight("b", 94.0),
            insight("c", 82.0),
        ]);

        let ids: Vec<_> = set.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
        assert_eq!(set.first().map(|i| i.id.as_str()), Some("b"));
    }

    #[test]
    fn ties_keep_delivery_order() {
        let set: InsightSet = [insight("first", 80.0), insight("second", 80.0)]
            .into_iter()
            .collect();
        assert_eq!(set[0].id, "first");
        assert_eq!(set[1].id, "second");
    }

    #[test]
    fn decode_resorts_unsorted_payload() {
        let body = json!({
            "insights": [
                {"id": "1", "type": "warning", "title": "t", "description": "d", "impact": "medium",
                 "actionItems": ["x"], "relevanceScore": 60, "timeframe": "now", "data": {}},
                {"id": "2", "type": "opportunity", "title": "t", "description": "d", "impact": "high",
                 "actionItems": [], "relevanceScore": 90, "timeframe": "now", "data": {"k": 1}}
            ],
            "generatedAt": "2026-01-05T12:00:00Z",
            "nextUpdate": "2026-01-05T16:00:00Z"
        });

        let response: InsightsResponse = serde_json::from_value(body).unwrap();

        assert_eq!(response.insights[0].id, "2");
        assert_eq!(response.insights[0].kind, InsightKind::Opportunity);
        assert_eq!(response.insights[1].kind, InsightKind::Warning);
        assert!(response.total_insights.is_none());
    }

    #[test]
    fn insight_serializes_type_tag() {
        let value = serde_json::to_value(insight("x", 1.0)).unwrap();
        assert_eq!(value["type"], "trend");
        assert_eq!(value["relevanceScore"], 1.0);
        assert!(value.get("actionItems").is_some());
    }

    #[test]
    fn request_body_shape() {
        let anonymous = serde_json::to_value(InsightRequest::default()).unwrap();
        assert_eq!(anonymous, json!({"preferences": {}}));

        let named = serde_json::to_value(InsightRequest::for_user(Some("u-1".into()))).unwrap();
        assert_eq!(named, json!({"userId": "u-1", "preferences": {}}));
    }
}
