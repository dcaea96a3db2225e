//! Analytics handler: `track_analytics`.

use serde_json::{Value, json};

use super::super::{ToolResult, success_payload};
use crate::mcp::tool_types::{AnalyticsAction, RecordData, TrackAnalyticsArgs, parse_args};
use crate::models::AnalyticsEvent;
use crate::services::{AnalyticsService, PromptOptimizer};
use crate::{Error, Result};

/// Executes the analytics tool.
pub fn execute_track_analytics(optimizer: &PromptOptimizer, arguments: Value) -> Result<ToolResult> {
    let args: TrackAnalyticsArgs = parse_args(arguments)?;
    let action = AnalyticsAction::parse(&args.action)?;
    let analytics = optimizer
        .analytics()
        .ok_or_else(|| Error::Configuration("analytics sink".to_string()))?;

    let payload = match action {
        AnalyticsAction::Record => {
            let data = args.data.ok_or_else(|| {
                Error::InvalidInput("'data' is required for record".to_string())
            })?;
            record(analytics, data)?
        },
        AnalyticsAction::Query => {
            let params = args.query_params.unwrap_or_default();
            let range = params.time_range()?;
            let domain = params.domain.as_deref().map(str::trim).filter(|d| !d.is_empty());
            let summary = analytics.summarize(range, domain)?;
            serde_json::to_value(&summary).map_err(|e| Error::OperationFailed {
                operation: "serialize_summary".to_string(),
                cause: e.to_string(),
            })?
        },
    };

    Ok(ToolResult::json(&success_payload(payload)))
}

fn record(analytics: &AnalyticsService, data: RecordData) -> Result<Value> {
    if !(0.0..=1.0).contains(&data.confidence) {
        return Err(Error::InvalidInput(format!(
            "confidence must be between 0 and 1, got {}",
            data.confidence
        )));
    }
    if data.domain.trim().is_empty() {
        return Err(Error::InvalidInput("domain must not be empty".to_string()));
    }

    let event = AnalyticsEvent {
        original_length: data.original_length,
        optimized_length: data.optimized_length,
        modification_count: data.modification_count,
        ..AnalyticsEvent::new(data.domain.trim(), data.confidence)
    };
    analytics.record(&event)?;

    Ok(json!({
        "id": event.id,
        "timestamp": event.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }))
}
