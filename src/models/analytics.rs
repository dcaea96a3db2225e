//! Analytics models.
//!
//! Events are append-only: once recorded they are never updated in place.

use chrono::{DateTime, Duration, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::OptimizationResult;
use crate::{Error, Result};

/// One recorded optimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    /// Event identifier.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Resolved domain.
    pub domain: String,
    /// Reported confidence.
    #[serde(default)]
    pub confidence: f64,
    /// Character count of the original prompt.
    #[serde(default)]
    pub original_length: usize,
    /// Character count of the optimized prompt.
    #[serde(default)]
    pub optimized_length: usize,
    /// Number of modifications applied.
    #[serde(default)]
    pub modification_count: usize,
    /// When the optimization happened.
    #[serde(rename = "created_at", alias = "timestamp", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl AnalyticsEvent {
    /// Creates an event stamped now.
    #[must_use]
    pub fn new(domain: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            domain: domain.into(),
            confidence,
            original_length: 0,
            optimized_length: 0,
            modification_count: 0,
            timestamp: Utc::now(),
        }
    }

    /// Creates an event describing an optimization result.
    #[must_use]
    pub fn from_result(result: &OptimizationResult) -> Self {
        Self {
            original_length: result.original.chars().count(),
            optimized_length: result.optimized.chars().count(),
            modification_count: result.modifications.len(),
            ..Self::new(result.domain.clone(), result.confidence)
        }
    }

    /// Overrides the timestamp.
    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Time window for analytics queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    /// Since UTC midnight.
    Today,
    /// Last 7 days.
    #[default]
    Week,
    /// Last calendar month.
    Month,
    /// Everything.
    All,
}

impl TimeRange {
    /// Parses a range name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for unknown names.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "all" => Ok(Self::All),
            other => Err(Error::InvalidInput(format!(
                "invalid timeRange '{other}': expected today, week, month or all"
            ))),
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
            Self::All => "all",
        }
    }

    /// Returns the inclusive window start relative to `now`.
    #[must_use]
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map_or(now, |midnight| Utc.from_utc_datetime(&midnight)),
            Self::Week => now - Duration::days(7),
            Self::Month => now
                .checked_sub_months(Months::new(1))
                .unwrap_or_else(|| now - Duration::days(30)),
            Self::All => DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Filter passed to an analytics sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsQuery {
    /// Inclusive lower bound on event timestamps.
    pub from: DateTime<Utc>,
    /// Restricts to one domain.
    pub domain: Option<String>,
}

impl AnalyticsQuery {
    /// Returns true if the event falls inside this query.
    #[must_use]
    pub fn matches(&self, event: &AnalyticsEvent) -> bool {
        event.timestamp >= self.from
            && self.domain.as_deref().is_none_or(|d| event.domain == d)
    }
}

/// Aggregate over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    /// Number of events in the window.
    pub total_optimizations: usize,
    /// Mean confidence, rounded to two decimals; 0 when empty.
    pub average_confidence: f64,
    /// Event count per domain.
    pub domain_breakdown: BTreeMap<String, usize>,
    /// Window name.
    pub time_range: TimeRange,
    /// Window start.
    pub from_date: DateTime<Utc>,
    /// Window end (query time).
    pub to_date: DateTime<Utc>,
}

impl AnalyticsSummary {
    /// Aggregates events into a summary.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_events(
        events: &[AnalyticsEvent],
        time_range: TimeRange,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> Self {
        let total = events.len();
        let average_confidence = if total == 0 {
            0.0
        } else {
            let sum: f64 = events.iter().map(|e| e.confidence).sum();
            ((sum / total as f64) * 100.0).round() / 100.0
        };

        let mut domain_breakdown = BTreeMap::new();
        for event in events {
            *domain_breakdown.entry(event.domain.clone()).or_insert(0) += 1;
        }

        Self {
            total_optimizations: total,
            average_confidence,
            domain_breakdown,
            time_range,
            from_date,
            to_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 13, 45, 0).unwrap()
    }

    #[test]
    fn test_time_range_parse() {
        assert_eq!(TimeRange::parse("TODAY").unwrap(), TimeRange::Today);
        assert_eq!(TimeRange::parse("all").unwrap(), TimeRange::All);
        assert!(TimeRange::parse("year").is_err());
    }

    #[test]
    fn test_time_range_start() {
        let now = fixed_now();
        assert_eq!(
            TimeRange::Today.start(now),
            Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            TimeRange::Week.start(now),
            Utc.with_ymd_and_hms(2024, 3, 8, 13, 45, 0).unwrap()
        );
        assert_eq!(
            TimeRange::Month.start(now),
            Utc.with_ymd_and_hms(2024, 2, 15, 13, 45, 0).unwrap()
        );
        assert_eq!(TimeRange::All.start(now).timestamp(), 0);
    }

    #[test]
    fn test_summary_aggregation() {
        let now = fixed_now();
        let events = vec![
            AnalyticsEvent::new("marketing_copy", 0.8),
            AnalyticsEvent::new("marketing_copy", 0.7),
            AnalyticsEvent::new("general", 0.555),
        ];
        let summary = AnalyticsSummary::from_events(&events, TimeRange::All, now, now);
        assert_eq!(summary.total_optimizations, 3);
        assert!((summary.average_confidence - 0.69).abs() < 1e-9);
        assert_eq!(summary.domain_breakdown["marketing_copy"], 2);
        assert_eq!(summary.domain_breakdown["general"], 1);
    }

    #[test]
    fn test_empty_summary() {
        let now = fixed_now();
        let summary = AnalyticsSummary::from_events(&[], TimeRange::Week, now, now);
        assert_eq!(summary.total_optimizations, 0);
        assert!(summary.average_confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn test_query_matches() {
        let now = fixed_now();
        let query = AnalyticsQuery {
            from: TimeRange::Week.start(now),
            domain: Some("general".to_string()),
        };
        assert!(query.matches(&AnalyticsEvent::new("general", 0.5).at(now)));
        assert!(!query.matches(&AnalyticsEvent::new("other", 0.5).at(now)));
        assert!(!query.matches(
            &AnalyticsEvent::new("general", 0.5).at(now - Duration::days(8))
        ));
    }

    #[test]
    fn test_event_wire_names() {
        let event = AnalyticsEvent::new("general", 0.5);
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("created_at").is_some());
        assert!(json.get("modificationCount").is_some());

        let parsed: AnalyticsEvent =
            serde_json::from_str(r#"{"domain":"general","confidence":0.9}"#).unwrap();
        assert_eq!(parsed.domain, "general");
    }
}
