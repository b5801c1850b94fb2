//! Feed data generators.
//!
//! `live_snapshot` and `personalized_insights` produce the randomized and
//! time-stamped bodies the simulator serves. `demo_snapshot` and
//! `demo_insights` are fixed fixtures for tests and the mock source.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde_json::json;

use crate::domain::insight::{Insight, InsightKind, InsightSet, InsightsResponse};
use crate::domain::market::{
    BrandMention, CompetitorActivity, Impact, MarketSnapshot, MentionSentiment, MetricDelta,
    RealTimeMetrics, SentimentBreakdown, TrendDirection, TrendScore, TrendTimeframe,
};

/// How far ahead producers promise the next insight refresh.
pub const INSIGHT_REFRESH: Duration = Duration::hours(4);

fn trend(
    keyword: &str,
    score: f64,
    change: f64,
    category: TrendDirection,
    timeframe: TrendTimeframe,
) -> TrendScore {
    TrendScore {
        keyword: keyword.to_string(),
        score,
        change,
        category,
        timeframe,
    }
}

fn competitor(name: &str, activity: &str, impact: Impact, at: DateTime<Utc>) -> CompetitorActivity {
    CompetitorActivity {
        name: name.to_string(),
        activity: activity.to_string(),
        impact,
        timestamp: at,
    }
}

fn mention(
    source: &str,
    content: &str,
    sentiment: MentionSentiment,
    reach: u64,
    at: DateTime<Utc>,
) -> BrandMention {
    BrandMention {
        source: source.to_string(),
        content: content.to_string(),
        sentiment,
        reach,
        timestamp: at,
    }
}

#[allow(clippy::too_many_arguments)]
fn insight(
    id: String,
    kind: InsightKind,
    title: &str,
    description: &str,
    impact: Impact,
    action_items: &[&str],
    relevance_score: f64,
    timeframe: &str,
    data: serde_json::Value,
) -> Insight {
    Insight {
        id,
        kind,
        title: title.to_string(),
        description: description.to_string(),
        impact,
        action_items: action_items.iter().map(|s| (*s).to_string()).collect(),
        relevance_score,
        timeframe: timeframe.to_string(),
        data,
    }
}

// =============================================================================
// Randomized Feed
// =============================================================================

/// Uniform integer in `[low, low + span)` as f64.
fn between<R: Rng + ?Sized>(rng: &mut R, low: i32, span: i32) -> f64 {
    f64::from(rng.random_range(low..low + span))
}

fn hours_ago<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>, max_hours: i64) -> DateTime<Utc> {
    now - Duration::hours(rng.random_range(0..max_hours))
}

fn minutes_ago<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>, max_minutes: i64) -> DateTime<Utc> {
    now - Duration::minutes(rng.random_range(0..max_minutes))
}

/// Randomized live market snapshot computed at `now`.
pub fn live_snapshot<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> MarketSnapshot {
    let ai_direction = if rng.random_bool(0.5) {
        TrendDirection::Rising
    } else {
        TrendDirection::Falling
    };
    let collaboration_direction = if rng.random_bool(0.7) {
        TrendDirection::Stable
    } else {
        TrendDirection::Falling
    };

    let trends = vec![
        trend(
            "ai automation",
            between(rng, 60, 40),
            between(rng, -15, 30),
            ai_direction,
            TrendTimeframe::Day,
        ),
        trend(
            "sustainable tech",
            between(rng, 50, 40),
            between(rng, -10, 20),
            TrendDirection::Rising,
            TrendTimeframe::Week,
        ),
        trend(
            "remote collaboration",
            between(rng, 45, 30),
            between(rng, -12, 25),
            collaboration_direction,
            TrendTimeframe::Day,
        ),
        trend(
            "data privacy",
            between(rng, 65, 35),
            between(rng, -9, 18),
            TrendDirection::Rising,
            TrendTimeframe::Month,
        ),
    ];

    let sentiment = SentimentBreakdown {
        positive: between(rng, 55, 30),
        neutral: between(rng, 15, 20),
        negative: between(rng, 5, 15),
        overall_score: between(rng, 70, 25),
        key_topics: [
            "innovation",
            "sustainability",
            "user experience",
            "automation",
            "security",
        ]
        .into_iter()
        .map(String::from)
        .collect(),
    };

    let competitor_activity = vec![
        competitor(
            "TechCorp Inc.",
            "Launched AI-powered customer service bot",
            Impact::High,
            hours_ago(rng, now, 6),
        ),
        competitor(
            "InnovateLabs",
            "Partnership with sustainability nonprofit",
            Impact::Medium,
            hours_ago(rng, now, 12),
        ),
        competitor(
            "FutureTech Solutions",
            "New data privacy certification",
            Impact::Medium,
            hours_ago(rng, now, 24),
        ),
    ];

    let brand_mentions = vec![
        mention(
            "Twitter",
            "Impressed with the latest tech innovations!",
            MentionSentiment::Positive,
            rng.random_range(1000..6000),
            minutes_ago(rng, now, 60),
        ),
        mention(
            "LinkedIn",
            "Great thought leadership content on AI trends",
            MentionSentiment::Positive,
            rng.random_range(500..3500),
            minutes_ago(rng, now, 120),
        ),
        mention(
            "Reddit",
            "Need better documentation for this tool",
            MentionSentiment::Neutral,
            rng.random_range(200..2200),
            minutes_ago(rng, now, 180),
        ),
    ];

    let real_time_metrics = RealTimeMetrics {
        website_traffic: MetricDelta {
            current: between(rng, 500, 1000),
            change: between(rng, -20, 40),
        },
        social_engagement: MetricDelta {
            current: between(rng, 100, 500),
            change: between(rng, -30, 60),
        },
        brand_sentiment: MetricDelta {
            current: between(rng, 75, 20),
            change: between(rng, -5, 10),
        },
    };

    MarketSnapshot {
        industry: Some("Technology".to_string()),
        trends,
        sentiment,
        competitor_activity,
        brand_mentions,
        real_time_metrics: Some(real_time_metrics),
        last_updated: now,
    }
}

/// Six personalized insights generated at `now`, highest relevance first.
#[allow(clippy::too_many_lines)]
pub fn personalized_insights(now: DateTime<Utc>) -> InsightsResponse {
    let millis = now.timestamp_millis();
    let id = |n: u32| format!("insight-{millis}-{n}");

    let insights = InsightSet::new(vec![
        insight(
            id(1),
            InsightKind::Opportunity,
            "Emerging AI Trend Alert",
            "AI automation keywords are trending 34% higher in your industry. This presents a significant opportunity for content creation and thought leadership.",
            Impact::High,
            &[
                "Create AI-focused content series",
                "Share automation case studies",
                "Host webinar on AI implementation",
                "Partner with AI tool providers",
            ],
            94.0,
            "Next 7 days",
            json!({
                "trendGrowth": "34%",
                "competitorActivity": "low",
                "audienceInterest": "high",
                "estimatedReach": "25K+"
            }),
        ),
        insight(
            id(2),
            InsightKind::Warning,
            "Competitor Campaign Overlap",
            "Two major competitors launched similar sustainability campaigns this week. Consider pivoting your messaging to maintain differentiation.",
            Impact::Medium,
            &[
                "Analyze competitor messaging gaps",
                "Emphasize unique sustainability angle",
                "Accelerate campaign launch timeline",
                "Focus on specific industry applications",
            ],
            82.0,
            "Immediate (24-48 hours)",
            json!({
                "competitorCount": 2,
                "messagingOverlap": "67%",
                "marketShare": "at risk",
                "recommendedAction": "pivot"
            }),
        ),
        insight(
            id(3),
            InsightKind::Trend,
            "Data Privacy Conversations Rising",
            "Data privacy discussions have increased 28% across your target audience. This is an excellent time to showcase your privacy-first approach.",
            Impact::High,
            &[
                "Create privacy-focused content",
                "Highlight security certifications",
                "Share transparency reports",
                "Engage in privacy discussions",
            ],
            89.0,
            "Next 2 weeks",
            json!({
                "conversationVolume": "+28%",
                "sentimentTrend": "concerned but interested",
                "opportunityWindow": "2-3 weeks",
                "contentTypes": ["blogs", "infographics", "videos"]
            }),
        ),
        insight(
            id(4),
            InsightKind::Recommendation,
            "Optimal Content Timing",
            "Your audience engagement peaks at 2:30 PM on Tuesdays and Thursdays. Consider scheduling your high-impact content during these windows.",
            Impact::Medium,
            &[
                "Schedule key posts for 2:30 PM Tue/Thu",
                "Test 10 AM Wednesday slots",
                "Avoid Friday afternoon posting",
                "Increase content frequency during peak times",
            ],
            76.0,
            "Ongoing optimization",
            json!({
                "peakEngagement": "Tue/Thu 2:30 PM",
                "engagementLift": "+43%",
                "optimalFrequency": "3 posts/week",
                "audienceTimezone": "EST"
            }),
        ),
        insight(
            id(5),
            InsightKind::Opportunity,
            "Partnership Opportunity Detected",
            "Sustainable tech startups in your area are gaining traction. Consider collaboration opportunities for mutual growth.",
            Impact::Medium,
            &[
                "Research local sustainable tech companies",
                "Reach out to complementary startups",
                "Propose co-marketing initiatives",
                "Explore joint content creation",
            ],
            71.0,
            "Next 30 days",
            json!({
                "potentialPartners": 12,
                "growthRate": "+67%",
                "synergyScore": "high",
                "marketOverlap": "minimal"
            }),
        ),
        insight(
            id(6),
            InsightKind::Warning,
            "Engagement Rate Declining",
            "Your social media engagement has dropped 15% over the past week. Review recent content performance and adjust strategy.",
            Impact::Medium,
            &[
                "Analyze recent post performance",
                "A/B test different content formats",
                "Increase interactive content (polls, Q&As)",
                "Review posting frequency and timing",
            ],
            84.0,
            "This week",
            json!({
                "engagementDrop": "-15%",
                "timeframe": "7 days",
                "worstPerforming": "promotional posts",
                "bestPerforming": "educational content"
            }),
        ),
    ]);

    InsightsResponse {
        total_insights: Some(insights.len()),
        insights,
        generated_at: now,
        next_update: now + INSIGHT_REFRESH,
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Fixed snapshot computed at `now`.
#[must_use]
pub fn demo_snapshot(now: DateTime<Utc>) -> MarketSnapshot {
    MarketSnapshot {
        industry: Some("General".to_string()),
        trends: vec![
            trend(
                "sustainable brands",
                87.0,
                12.0,
                TrendDirection::Rising,
                TrendTimeframe::Day,
            ),
            trend(
                "ai-powered marketing",
                73.0,
                8.0,
                TrendDirection::Rising,
                TrendTimeframe::Week,
            ),
            trend(
                "influencer partnerships",
                65.0,
                -3.0,
                TrendDirection::Falling,
                TrendTimeframe::Day,
            ),
        ],
        sentiment: SentimentBreakdown {
            positive: 68.0,
            neutral: 25.0,
            negative: 7.0,
            overall_score: 81.0,
            key_topics: ["innovation", "sustainability", "customer experience"]
                .into_iter()
                .map(String::from)
                .collect(),
        },
        competitor_activity: vec![
            competitor(
                "Brand X",
                "Launched sustainability campaign",
                Impact::High,
                now - Duration::hours(2),
            ),
            competitor(
                "Company Y",
                "Partnership with tech startup",
                Impact::Medium,
                now - Duration::hours(5),
            ),
        ],
        brand_mentions: vec![mention(
            "Twitter",
            "Great customer service experience!",
            MentionSentiment::Positive,
            1250,
            now - Duration::minutes(30),
        )],
        real_time_metrics: None,
        last_updated: now,
    }
}

/// Fixed three-insight set.
#[must_use]
pub fn demo_insights() -> InsightSet {
    InsightSet::new(vec![
        insight(
            "1".to_string(),
            InsightKind::Opportunity,
            "Sustainability Trend Surge",
            "Sustainability-focused content is trending 45% higher than last month in your industry.",
            Impact::High,
            &[
                "Create content highlighting your eco-friendly practices",
                "Partner with environmental organizations",
                "Launch a sustainability-focused campaign",
            ],
            92.0,
            "Next 2 weeks",
            json!({"trendScore": 87, "industryAverage": 42}),
        ),
        insight(
            "2".to_string(),
            InsightKind::Warning,
            "Competitor Activity Alert",
            "Three major competitors have launched similar campaigns in the past 48 hours.",
            Impact::Medium,
            &[
                "Differentiate your messaging",
                "Accelerate your campaign timeline",
                "Focus on unique value propositions",
            ],
            78.0,
            "Immediate action needed",
            json!({"competitorCount": 3, "timeframe": "48h"}),
        ),
        insight(
            "3".to_string(),
            InsightKind::Recommendation,
            "Optimal Posting Time",
            "Your audience is most active between 2-4 PM on weekdays based on recent engagement data.",
            Impact::Medium,
            &[
                "Schedule posts for 2-4 PM weekdays",
                "Test weekend posting times",
                "Increase posting frequency during peak hours",
            ],
            85.0,
            "Ongoing optimization",
            json!({"peakHours": ["14:00", "16:00"], "engagementLift": "23%"}),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn live_snapshot_stays_in_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc::now();

        for _ in 0..50 {
            let snapshot = live_snapshot(&mut rng, now);

            assert_eq!(snapshot.trends.len(), 4);
            assert_eq!(snapshot.competitor_activity.len(), 3);
            assert_eq!(snapshot.brand_mentions.len(), 3);
            assert!((60.0..100.0).contains(&snapshot.trends[0].score));
            assert!((55.0..85.0).contains(&snapshot.sentiment.positive));
            assert!(snapshot.competitor_activity.iter().all(|c| c.timestamp <= now));

            let metrics = snapshot.real_time_metrics.unwrap();
            assert!((75.0..95.0).contains(&metrics.brand_sentiment.current));
            assert_eq!(snapshot.last_updated, now);
        }
    }

    #[test]
    fn personalized_insights_are_sorted_and_stamped() {
        let now = Utc::now();
        let response = personalized_insights(now);

        assert_eq!(response.total_insights, Some(6));
        assert_eq!(response.next_update, now + Duration::hours(4));

        let scores: Vec<f64> = response.insights.iter().map(|i| i.relevance_score).collect();
        assert_eq!(scores, [94.0, 89.0, 84.0, 82.0, 76.0, 71.0]);

        let prefix = format!("insight-{}-", now.timestamp_millis());
        assert!(response.insights.iter().all(|i| i.id.starts_with(&prefix)));
    }

    #[test]
    fn demo_insights_sorted() {
        let ids: Vec<_> = demo_insights().iter().map(|i| i.id.clone()).collect();
        assert_eq!(ids, ["1", "3", "2"]);
    }
}
