//! Storage trait definitions.

use crate::Result;
use crate::models::{AnalyticsEvent, AnalyticsQuery, Pattern, PatternSet};

/// Trait for pattern store backends.
///
/// The store holds the whole pattern set as one document; writes replace it
/// wholesale.
pub trait PatternStore: Send + Sync {
    /// Fetches the full pattern set.
    ///
    /// # Returns
    ///
    /// All patterns in store order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UpstreamUnavailable`] if the store cannot be
    /// reached or returns a malformed document.
    fn get_all(&self) -> Result<PatternSet>;

    /// Fetches one pattern by domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be accessed.
    fn get(&self, domain: &str) -> Result<Option<Pattern>> {
        Ok(self.get_all()?.get(domain).cloned())
    }

    /// Replaces the full pattern set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UpstreamUnavailable`] if the write is rejected.
    fn replace_all(&self, patterns: &PatternSet) -> Result<()>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Trait for analytics sinks.
pub trait AnalyticsSink: Send + Sync {
    /// Appends one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert is rejected.
    fn record(&self, event: &AnalyticsEvent) -> Result<()>;

    /// Returns events matching the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot be queried.
    fn query(&self, query: &AnalyticsQuery) -> Result<Vec<AnalyticsEvent>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
