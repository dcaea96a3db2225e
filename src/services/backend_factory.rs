//! Backend factory for storage layer initialization.
//!
//! # Graceful Degradation
//!
//! A missing endpoint never stops the server. The pattern store falls back to
//! the in-memory store seeded with the built-in patterns, and the analytics
//! sink falls back to an in-memory sink. An explicit `http` analytics backend
//! without an endpoint is a configuration error, which is logged before
//! degrading.

use std::sync::Arc;

use crate::config::{AnalyticsBackend, PromptForgeConfig};
use crate::storage::{
    AnalyticsSink, HttpAnalyticsSink, HttpPatternStore, InMemoryAnalyticsSink,
    InMemoryPatternStore, PatternStore,
};
use crate::{Error, Result};

/// Backends built from configuration.
pub struct BackendSet {
    /// Pattern store.
    pub patterns: Arc<dyn PatternStore>,
    /// Analytics sink.
    pub analytics: Arc<dyn AnalyticsSink>,
}

/// Factory for creating storage backends.
pub struct BackendFactory;

impl BackendFactory {
    /// Creates every backend, degrading to in-memory ones where needed.
    #[must_use]
    pub fn create_all(config: &PromptForgeConfig) -> BackendSet {
        let patterns = Self::create_pattern_store(config);
        let analytics = Self::create_analytics_sink(config).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Analytics backend unavailable, recording in memory");
            Arc::new(InMemoryAnalyticsSink::new())
        });

        tracing::info!(
            patterns = patterns.backend_name(),
            analytics = analytics.backend_name(),
            "Storage backends ready"
        );

        BackendSet {
            patterns,
            analytics,
        }
    }

    /// Creates the pattern store.
    #[must_use]
    pub fn create_pattern_store(config: &PromptForgeConfig) -> Arc<dyn PatternStore> {
        match config.patterns.endpoint.as_deref().filter(|_| config.patterns.is_configured()) {
            Some(endpoint) => match HttpPatternStore::new(
                endpoint.trim(),
                config.patterns.api_key.clone(),
                config.http_timeout,
            ) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::warn!(error = %e, "Pattern store client unavailable, using built-in patterns in memory");
                    Arc::new(InMemoryPatternStore::with_defaults())
                },
            },
            None => {
                tracing::info!("Pattern store not configured, using built-in patterns in memory");
                Arc::new(InMemoryPatternStore::with_defaults())
            },
        }
    }

    /// Creates the analytics sink.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the `http` backend is selected
    /// without an endpoint or its client cannot be built.
    pub fn create_analytics_sink(config: &PromptForgeConfig) -> Result<Arc<dyn AnalyticsSink>> {
        let endpoint = config
            .analytics
            .endpoint
            .as_deref()
            .filter(|_| config.analytics.is_configured())
            .map(str::trim);

        match (config.analytics_backend, endpoint) {
            (AnalyticsBackend::Memory, _) | (AnalyticsBackend::Auto, None) => {
                Ok(Arc::new(InMemoryAnalyticsSink::new()))
            },
            (AnalyticsBackend::Http | AnalyticsBackend::Auto, Some(endpoint)) => {
                Ok(Arc::new(HttpAnalyticsSink::new(
                    endpoint,
                    config.analytics.api_key.clone(),
                    config.http_timeout,
                )?))
            },
            (AnalyticsBackend::Http, None) => Err(Error::Configuration(
                crate::config::ENV_ANALYTICS_ENDPOINT.to_string(),
            )),
        }
    }
}
