//! Argument types and helper functions for MCP tools.
//!
//! All argument types use `#[serde(deny_unknown_fields)]` so a misspelled
//! option is reported instead of silently ignored.

use serde::Deserialize;
use serde_json::Value;

use crate::models::{OptimizeRequest, RequestContext, TimeRange};
use crate::{Error, Result};

/// Maximum accepted prompt length in bytes.
pub const MAX_PROMPT_LENGTH: usize = 100 * 1024;

/// Arguments for `optimize_prompt`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct OptimizePromptArgs {
    /// The prompt to optimize.
    pub prompt: String,
    /// Explicit domain override.
    pub domain: Option<String>,
    /// Caller intent, e.g. "reasoning".
    pub intent: Option<String>,
    /// Output format name.
    pub desired_format: Option<String>,
    /// Values for `context_injection` enhancements.
    #[serde(alias = "context")]
    pub user_context: Option<RequestContext>,
    /// Return the prompt unchanged.
    pub bypass_optimization: Option<bool>,
    /// Force chain-of-thought on or off.
    pub chain_of_thought: Option<bool>,
    /// Append the pattern's examples.
    pub include_examples: Option<bool>,
    /// Record an analytics event (default true).
    pub record_analytics: Option<bool>,
    /// Optimize even when detection confidence is low.
    pub force_optimize: Option<bool>,
}

impl OptimizePromptArgs {
    /// Validates the arguments and builds an optimizer request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the prompt is blank or too long.
    pub fn into_request(self) -> Result<OptimizeRequest> {
        validate_prompt(&self.prompt)?;
        Ok(OptimizeRequest {
            prompt: self.prompt,
            domain: self.domain,
            intent: self.intent,
            desired_format: self.desired_format,
            user_context: self.user_context,
            bypass_optimization: self.bypass_optimization.unwrap_or(false),
            chain_of_thought: self.chain_of_thought,
            include_examples: self.include_examples.unwrap_or(false),
            record_analytics: self.record_analytics.unwrap_or(true),
            force_optimize: self.force_optimize.unwrap_or(false),
        })
    }
}

/// Arguments for `manage_patterns`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ManagePatternsArgs {
    /// One of get, add, update, delete.
    pub action: String,
    /// Target domain.
    pub domain: Option<String>,
    /// Pattern body for add and update.
    pub pattern: Option<Value>,
    /// Bypass the cache for get.
    pub force_refresh: Option<bool>,
}

/// Arguments for `track_analytics`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TrackAnalyticsArgs {
    /// One of record, query.
    pub action: String,
    /// Event to record.
    pub data: Option<RecordData>,
    /// Query filters.
    pub query_params: Option<QueryParams>,
}

/// Event fields accepted by `track_analytics` record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordData {
    /// Resolved domain.
    pub domain: String,
    /// Reported confidence in `[0, 1]`.
    pub confidence: f64,
    /// Character count of the original prompt.
    #[serde(default)]
    pub original_length: usize,
    /// Character count of the optimized prompt.
    #[serde(default)]
    pub optimized_length: usize,
    /// Number of applied modifications.
    #[serde(default)]
    pub modification_count: usize,
}

/// Filters accepted by `track_analytics` query.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct QueryParams {
    /// today, week, month or all.
    pub time_range: Option<String>,
    /// Restrict to one domain.
    pub domain: Option<String>,
}

impl QueryParams {
    /// Parses the time range, defaulting to a week.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown range.
    pub fn time_range(&self) -> Result<TimeRange> {
        self.time_range
            .as_deref()
            .map_or(Ok(TimeRange::default()), TimeRange::parse)
    }
}

/// Arguments for `test_optimization`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct TestOptimizationArgs {
    /// The prompt to optimize.
    pub prompt: String,
    /// Include the before/after comparison block.
    pub show_diff: Option<bool>,
}

/// `manage_patterns` actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternAction {
    /// Read one pattern or the whole set.
    Get,
    /// Create a pattern for a new domain.
    Add,
    /// Insert or replace a pattern.
    Update,
    /// Remove a pattern.
    Delete,
}

impl PatternAction {
    /// Parses an action name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for unknown actions.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "add" => Ok(Self::Add),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!(
                "invalid action '{other}': expected get, add, update or delete"
            ))),
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// `track_analytics` actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsAction {
    /// Append one event.
    Record,
    /// Summarize events.
    Query,
}

impl AnalyticsAction {
    /// Parses an action name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for unknown actions.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "record" => Ok(Self::Record),
            "query" => Ok(Self::Query),
            other => Err(Error::InvalidInput(format!(
                "invalid action '{other}': expected record or query"
            ))),
        }
    }
}

/// Deserializes tool arguments, mapping failures to [`Error::InvalidInput`].
pub fn parse_args<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T> {
    serde_json::from_value(arguments).map_err(|e| Error::InvalidInput(e.to_string()))
}

/// Rejects blank or oversized prompts.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] describing the problem.
pub fn validate_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(Error::InvalidInput("prompt must not be empty".to_string()));
    }
    if prompt.len() > MAX_PROMPT_LENGTH {
        return Err(Error::InvalidInput(format!(
            "prompt exceeds maximum length ({} > {MAX_PROMPT_LENGTH} bytes)",
            prompt.len()
        )));
    }
    Ok(())
}

/// Returns the trimmed domain or an error naming the action.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the domain is missing or blank.
pub fn require_domain(domain: Option<&str>, action: PatternAction) -> Result<String> {
    domain
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::InvalidInput(format!("'domain' is required for {}", action.as_str()))
        })
}
