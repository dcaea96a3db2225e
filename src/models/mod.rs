//! Data models for promptforge.
//!
//! This module contains all the core data structures used throughout the system.

mod analytics;
mod optimization;
mod pattern;

pub use analytics::{AnalyticsEvent, AnalyticsQuery, AnalyticsSummary, TimeRange};
pub use optimization::{
    DomainScore, Modification, OptimizationResult, OptimizeRequest, OutputFormat, RequestContext,
};
pub use pattern::{
    DEFAULT_KEYWORD_WEIGHT, Enhancement, EnhancementKind, GENERAL_DOMAIN, Pattern, PatternSet,
};
