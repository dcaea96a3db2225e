//! In-memory storage backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use super::{AnalyticsSink, PatternStore};
use crate::Result;
use crate::models::{AnalyticsEvent, AnalyticsQuery, PatternSet};
use crate::services::default_patterns;

/// Pattern store held in process memory.
///
/// Counts fetches so callers can observe cache behavior.
#[derive(Debug, Default)]
pub struct InMemoryPatternStore {
    patterns: RwLock<PatternSet>,
    fetches: AtomicUsize,
}

impl InMemoryPatternStore {
    /// Creates a store holding `patterns`.
    #[must_use]
    pub fn new(patterns: PatternSet) -> Self {
        Self {
            patterns: RwLock::new(patterns),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Creates a store seeded with the built-in patterns.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(default_patterns())
    }

    /// Number of `get_all` calls served so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl PatternStore for InMemoryPatternStore {
    fn get_all(&self) -> Result<PatternSet> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let guard = self.patterns.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn replace_all(&self, patterns: &PatternSet) -> Result<()> {
        let mut guard = self.patterns.write().unwrap_or_else(PoisonError::into_inner);
        *guard = patterns.clone();
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Analytics sink held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryAnalyticsSink {
    events: RwLock<Vec<AnalyticsEvent>>,
}

impl InMemoryAnalyticsSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AnalyticsSink for InMemoryAnalyticsSink {
    fn record(&self, event: &AnalyticsEvent) -> Result<()> {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }

    fn query(&self, query: &AnalyticsQuery) -> Result<Vec<AnalyticsEvent>> {
        let guard = self.events.read().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.iter().filter(|e| query.matches(e)).cloned().collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
