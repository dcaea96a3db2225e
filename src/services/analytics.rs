//! Analytics service.
//!
//! Records optimization events to an [`AnalyticsSink`] and aggregates them
//! over time windows.

use chrono::Utc;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::Result;
use crate::models::{AnalyticsEvent, AnalyticsQuery, AnalyticsSummary, TimeRange};
use crate::storage::AnalyticsSink;

/// Records and summarizes optimization events.
#[derive(Clone)]
pub struct AnalyticsService {
    sink: Arc<dyn AnalyticsSink>,
}

impl AnalyticsService {
    /// Creates a service over `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn AnalyticsSink>) -> Self {
        Self { sink }
    }

    /// Returns the sink backend name.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.sink.backend_name()
    }

    /// Records one event synchronously.
    ///
    /// # Errors
    ///
    /// Returns the sink error if the insert fails.
    pub fn record(&self, event: &AnalyticsEvent) -> Result<()> {
        self.sink.record(event)
    }

    /// Records one event on a detached thread.
    ///
    /// Failures are logged and counted, never returned. The handle is only
    /// useful to callers that want to wait (tests); dropping it detaches.
    pub fn record_in_background(&self, event: AnalyticsEvent) -> Option<JoinHandle<()>> {
        let sink = Arc::clone(&self.sink);
        let parent_span = tracing::Span::current();

        let spawned = std::thread::Builder::new()
            .name("analytics-recorder".to_string())
            .spawn(move || {
                let _parent = parent_span.enter();
                let span = tracing::debug_span!("analytics.record", domain = %event.domain);
                let _guard = span.enter();

                if let Err(e) = sink.record(&event) {
                    metrics::counter!("analytics_record_failures_total").increment(1);
                    tracing::warn!(
                        backend = sink.backend_name(),
                        error = %e,
                        "Analytics recording failed"
                    );
                }
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                metrics::counter!("analytics_record_failures_total").increment(1);
                tracing::warn!(error = %e, "Could not spawn analytics recorder");
                None
            },
        }
    }

    /// Summarizes events in `range`, optionally for one domain.
    ///
    /// # Errors
    ///
    /// Returns the sink error if the query fails.
    pub fn summarize(&self, range: TimeRange, domain: Option<&str>) -> Result<AnalyticsSummary> {
        let now = Utc::now();
        let query = AnalyticsQuery {
            from: range.start(now),
            domain: domain.map(str::to_string),
        };
        let events = self.sink.query(&query)?;
        Ok(AnalyticsSummary::from_events(&events, range, query.from, now))
    }
}

impl std::fmt::Debug for AnalyticsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsService")
            .field("backend", &self.sink.backend_name())
            .finish()
    }
}
