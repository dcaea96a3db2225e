//! Business logic services.
//!
//! Services sit between the storage backends and the MCP tool surface:
//!
//! ```text
//! PromptOptimizer
//!   ├── PatternCache ──► dyn PatternStore
//!   ├── DomainDetector (prompt features + keyword scoring)
//!   ├── EnhancementEngine
//!   ├── ConfidenceEstimator
//!   └── AnalyticsService ──► dyn AnalyticsSink
//! ```

// Allow cast precision loss for score and percentage calculations.
#![allow(clippy::cast_precision_loss)]

mod analytics;
mod backend_factory;
mod confidence;
mod default_patterns;
mod detector;
mod enhancement;
mod features;
mod optimizer;
mod pattern_cache;

pub use analytics::AnalyticsService;
pub use backend_factory::{BackendFactory, BackendSet};
pub use confidence::ConfidenceEstimator;
pub use default_patterns::{default_general_pattern, default_patterns};
pub use detector::{Detection, DomainDetector};
pub use enhancement::{
    CHAIN_OF_THOUGHT_POSTAMBLE, CHAIN_OF_THOUGHT_PREAMBLE, Enhanced, EnhancementEngine,
};
pub use features::{PromptFeature, extract_features};
pub use optimizer::{ComparisonDetails, OptimizationComparison, PromptOptimizer};
pub use pattern_cache::PatternCache;
