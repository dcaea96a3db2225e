//! # PromptForge
//!
//! Prompt optimization served over the Model Context Protocol.
//!
//! PromptForge classifies a raw prompt into a domain, replays that domain's
//! enhancement rules (role, context, structure, constraints) and returns the
//! augmented prompt together with an audit trail of what changed.
//!
//! ## Features
//!
//! - Weighted keyword + feature scoring for domain detection
//! - Deterministic, ordered enhancement replay
//! - Pattern cache with time-based expiry over a pluggable pattern store
//! - Fire-and-forget analytics recording with windowed summaries
//! - JSON-RPC tool surface over stdio or HTTP
//!
//! ## Example
//!
//! ```rust
//! use promptforge::services::PromptOptimizer;
//! use promptforge::models::OptimizeRequest;
//!
//! let optimizer = PromptOptimizer::in_memory();
//! let result = optimizer.optimize(&OptimizeRequest::new("Write marketing copy for a new SaaS product"));
//! assert_eq!(result.domain, "marketing_copy");
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod mcp;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::{ConfidenceConfig, PromptForgeConfig, ScoringConfig, ScoringMode};
pub use models::{
    AnalyticsEvent, Enhancement, EnhancementKind, Modification, OptimizationResult,
    OptimizeRequest, OutputFormat, Pattern, PatternSet, TimeRange,
};
pub use services::{
    AnalyticsService, ConfidenceEstimator, DomainDetector, EnhancementEngine, PatternCache,
    PromptOptimizer,
};
pub use storage::{AnalyticsSink, PatternStore};

/// Error type for promptforge operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Configuration` | A required endpoint or key is missing |
/// | `UpstreamUnavailable` | Pattern store or analytics sink call fails or times out |
/// | `InvalidInput` | Missing `prompt`, invalid `action`, malformed pattern |
/// | `UnknownTool` | `tools/call` names a tool that is not registered |
/// | `OperationFailed` | I/O, serialization, or runtime setup fails |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A required external endpoint or key is not configured.
    #[error("not configured: {0}")]
    Configuration(String),

    /// An external collaborator could not be reached.
    ///
    /// Raised when:
    /// - The pattern store returns a non-success status or times out
    /// - The analytics sink rejects an insert or a query
    #[error("{service} unavailable: {cause}")]
    UpstreamUnavailable {
        /// The collaborator that failed ("pattern store", "analytics").
        service: String,
        /// The underlying cause.
        cause: String,
    },

    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - Required tool arguments are missing or have the wrong type
    /// - `action` is not one of the accepted values
    /// - A pattern fails validation (empty keywords, bad weights)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested tool is not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds an [`Error::UpstreamUnavailable`] for the given collaborator.
    pub fn upstream(service: &str, cause: impl std::fmt::Display) -> Self {
        Self::UpstreamUnavailable {
            service: service.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for promptforge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
