//! Prompt optimizer.
//!
//! Orchestrates one optimization: pattern lookup through the cache, domain
//! resolution, enhancement, post-processing, confidence scoring and
//! fire-and-forget analytics.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

use super::{
    AnalyticsService, BackendFactory, ConfidenceEstimator, DomainDetector, EnhancementEngine,
    PatternCache,
};
use crate::config::PromptForgeConfig;
use crate::models::{
    AnalyticsEvent, DomainScore, GENERAL_DOMAIN, Modification, OptimizationResult,
    OptimizeRequest, Pattern, PatternSet,
};
use crate::storage::{InMemoryAnalyticsSink, InMemoryPatternStore};

/// Intent fragments that switch on chain-of-thought.
const REASONING_INTENTS: [&str; 5] = ["reason", "analy", "step", "think", "chain"];

/// How the domain for one request was resolved.
struct Resolution<'a> {
    pattern: &'a Pattern,
    matched: bool,
    detection_confidence: Option<f64>,
    alternatives: Vec<DomainScore>,
    note: Option<String>,
}

/// Result of [`PromptOptimizer::compare`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationComparison {
    /// The prompt as received.
    pub original: String,
    /// The optimized prompt.
    pub optimized: String,
    /// Resolved domain.
    pub domain: String,
    /// Result confidence.
    pub confidence: f64,
    /// Whether the text changed.
    pub was_optimized: bool,
    /// Size and modification details, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonDetails>,
}

/// Before/after details.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonDetails {
    /// Characters in the original.
    pub original_length: usize,
    /// Characters in the optimized prompt.
    pub optimized_length: usize,
    /// Relative growth, e.g. `"245%"`.
    pub length_increase: String,
    /// Applied modifications.
    pub modifications: Vec<Modification>,
}

/// Optimizes prompts against the active pattern set.
pub struct PromptOptimizer {
    cache: PatternCache,
    detector: DomainDetector,
    engine: EnhancementEngine,
    estimator: ConfidenceEstimator,
    analytics: Option<AnalyticsService>,
}

impl PromptOptimizer {
    /// Creates an optimizer over `cache` with default scoring and no analytics.
    #[must_use]
    pub fn new(cache: PatternCache) -> Self {
        Self {
            cache,
            detector: DomainDetector::default(),
            engine: EnhancementEngine::new(),
            estimator: ConfidenceEstimator::default(),
            analytics: None,
        }
    }

    /// Creates an optimizer backed by in-memory storage seeded with the
    /// built-in patterns.
    #[must_use]
    pub fn in_memory() -> Self {
        let cache = PatternCache::new(Arc::new(InMemoryPatternStore::with_defaults()));
        let sink = Arc::new(InMemoryAnalyticsSink::new());
        Self::new(cache).with_analytics(AnalyticsService::new(sink))
    }

    /// Creates an optimizer from configuration.
    ///
    /// Unconfigured or misconfigured backends degrade to in-memory ones.
    #[must_use]
    pub fn from_config(config: &PromptForgeConfig) -> Self {
        let backends = BackendFactory::create_all(config);
        let cache = PatternCache::new(backends.patterns).with_ttl(config.cache_ttl);

        Self::new(cache)
            .with_detector(DomainDetector::new(config.scoring.clone()))
            .with_estimator(ConfidenceEstimator::new(config.confidence.clone()))
            .with_analytics(AnalyticsService::new(backends.analytics))
    }

    /// Sets the detector.
    #[must_use]
    pub fn with_detector(mut self, detector: DomainDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Sets the confidence estimator.
    #[must_use]
    pub fn with_estimator(mut self, estimator: ConfidenceEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Sets the analytics service.
    #[must_use]
    pub fn with_analytics(mut self, analytics: AnalyticsService) -> Self {
        self.analytics = Some(analytics);
        self
    }

    /// Returns the pattern cache.
    #[must_use]
    pub const fn patterns(&self) -> &PatternCache {
        &self.cache
    }

    /// Returns the analytics service, if one is configured.
    #[must_use]
    pub const fn analytics(&self) -> Option<&AnalyticsService> {
        self.analytics.as_ref()
    }

    /// Optimizes one prompt.
    ///
    /// Never fails: store outages fall back to built-in patterns and
    /// analytics failures are only logged.
    #[instrument(skip_all, fields(operation = "optimize", prompt_len = request.prompt.len()))]
    pub fn optimize(&self, request: &OptimizeRequest) -> OptimizationResult {
        if request.bypass_optimization {
            let domain = request.domain.as_deref().unwrap_or(GENERAL_DOMAIN);
            tracing::debug!("Optimization bypassed");
            return OptimizationResult::passthrough(&request.prompt, domain);
        }

        let start = Instant::now();
        let patterns = self.cache.load(false);
        let result = self.optimize_with(request, &patterns);

        metrics::counter!("optimizations_total", "domain" => result.domain.clone()).increment(1);
        metrics::histogram!("optimization_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::info!(
            domain = %result.domain,
            confidence = result.confidence,
            modifications = result.modifications.len(),
            "Optimized prompt"
        );

        if request.record_analytics
            && result.reason.is_none()
            && let Some(analytics) = &self.analytics
        {
            // Detached: the caller never waits on the sink.
            let _ = analytics.record_in_background(AnalyticsEvent::from_result(&result));
        }

        result
    }

    /// Runs optimization without analytics and reports a before/after view.
    pub fn compare(&self, prompt: &str, show_diff: bool) -> OptimizationComparison {
        let result = self.optimize(&OptimizeRequest::new(prompt).without_analytics().forced());
        let was_optimized = result.changed();

        let comparison = (show_diff && was_optimized).then(|| {
            let original_length = result.original.chars().count();
            let optimized_length = result.optimized.chars().count();
            ComparisonDetails {
                original_length,
                optimized_length,
                length_increase: length_increase(original_length, optimized_length),
                modifications: result.modifications.clone(),
            }
        });

        OptimizationComparison {
            original: result.original,
            optimized: result.optimized,
            domain: result.domain,
            confidence: result.confidence,
            was_optimized,
            comparison,
        }
    }

    /// Optimizes against an explicit pattern set.
    fn optimize_with(&self, request: &OptimizeRequest, patterns: &PatternSet) -> OptimizationResult {
        let fallback = super::default_general_pattern();
        let resolution = self.resolve(request, patterns, &fallback);
        let pattern = resolution.pattern;

        let threshold = self.detector.config().min_detection_confidence;
        if !request.force_optimize
            && resolution.matched
            && let Some(detected) = resolution.detection_confidence
            && detected < threshold
        {
            tracing::debug!(
                domain = %pattern.domain,
                confidence = detected,
                threshold,
                "Detection confidence below threshold, prompt left unchanged"
            );
            return OptimizationResult::low_confidence(&request.prompt, &pattern.domain, detected);
        }

        let enhanced = self
            .engine
            .apply(&request.prompt, pattern, request.user_context.as_ref());
        let mut optimized = enhanced.optimized;
        let mut modifications = enhanced.modifications;

        if request.include_examples
            && let Some((text, modification)) = self.engine.examples(&optimized, pattern)
        {
            optimized = text;
            modifications.push(modification);
        }

        if wants_chain_of_thought(request) {
            let (text, modification) = self.engine.chain_of_thought(&optimized);
            optimized = text;
            modifications.push(modification);
        }

        if let Some(format) = request.desired_format.as_deref() {
            match self.engine.output_format(&optimized, format) {
                Some((text, modification)) => {
                    optimized = text;
                    modifications.push(modification);
                },
                None => tracing::debug!(format, "Ignoring unknown output format"),
            }
        }

        let confidence = self.estimator.estimate(modifications.len(), resolution.matched);

        let mut explanation = format!(
            "Applied {} enhancements based on {} pattern",
            modifications.len(),
            pattern.label()
        );
        if let Some(note) = resolution.note {
            explanation.push_str(&format!("; {note}"));
        }

        OptimizationResult {
            original: request.prompt.clone(),
            optimized,
            domain: pattern.domain.clone(),
            confidence,
            modifications,
            alternatives: resolution.alternatives,
            detection_confidence: resolution.detection_confidence,
            explanation,
            reason: None,
        }
    }

    /// Picks the pattern for a request.
    fn resolve<'a>(
        &self,
        request: &OptimizeRequest,
        patterns: &'a PatternSet,
        fallback: &'a Pattern,
    ) -> Resolution<'a> {
        let general = patterns.fallback().unwrap_or(fallback);

        if let Some(domain) = request.domain.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            return match patterns.get(domain) {
                Some(pattern) => Resolution {
                    pattern,
                    matched: true,
                    detection_confidence: None,
                    alternatives: Vec::new(),
                    note: None,
                },
                None => {
                    tracing::warn!(domain, "Unknown domain override, using general pattern");
                    Resolution {
                        pattern: general,
                        matched: false,
                        detection_confidence: None,
                        alternatives: Vec::new(),
                        note: Some(format!("unknown domain '{domain}' fell back to general")),
                    }
                },
            };
        }

        let detection = self.detector.detect(&request.prompt, patterns);
        let matched = detection.matched();
        Resolution {
            pattern: patterns.get(&detection.domain).unwrap_or(general),
            matched,
            detection_confidence: Some(detection.confidence),
            alternatives: detection.alternatives,
            note: None,
        }
    }
}

impl std::fmt::Debug for PromptOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptOptimizer")
            .field("detector", &self.detector)
            .field("estimator", &self.estimator)
            .field("analytics", &self.analytics)
            .finish_non_exhaustive()
    }
}

fn wants_chain_of_thought(request: &OptimizeRequest) -> bool {
    request.chain_of_thought.unwrap_or_else(|| {
        request.intent.as_deref().is_some_and(|intent| {
            let intent = intent.to_lowercase();
            REASONING_INTENTS.iter().any(|fragment| intent.contains(fragment))
        })
    })
}

fn length_increase(original: usize, optimized: usize) -> String {
    if original == 0 {
        return "0%".to_string();
    }
    let percent = (optimized as f64 / original as f64 - 1.0) * 100.0;
    format!("{}%", percent.round())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::models::OutputFormat;
    use crate::services::CHAIN_OF_THOUGHT_PREAMBLE;
    use crate::storage::AnalyticsSink;
    use std::time::Duration;

    const MARKETING_PROMPT: &str = "Write marketing copy for a new SaaS product";

    fn optimizer_with_sink() -> (PromptOptimizer, Arc<InMemoryAnalyticsSink>) {
        let sink = Arc::new(InMemoryAnalyticsSink::new());
        let cache = PatternCache::new(Arc::new(InMemoryPatternStore::with_defaults()));
        let optimizer =
            PromptOptimizer::new(cache).with_analytics(AnalyticsService::new(sink.clone()));
        (optimizer, sink)
    }

    fn wait_for_events(sink: &InMemoryAnalyticsSink, expected: usize) -> bool {
        for _ in 0..200 {
            if sink.len() >= expected {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_marketing_end_to_end() {
        let result = PromptOptimizer::in_memory().optimize(&OptimizeRequest::new(MARKETING_PROMPT));

        assert_eq!(result.domain, "marketing_copy");
        assert!(result.modifications.len() >= 2);
        assert!(result.optimized.starts_with("You are an expert copywriter"));
        assert!(result.optimized.contains(&format!("\n\nRequest: {MARKETING_PROMPT}\n\n")));
        assert!(result.optimized.contains("1. Attention-grabbing headline"));
        // 0.5 + 2 * 0.1 + 0.15
        assert!((result.confidence - 0.85).abs() < 1e-9);
        assert_eq!(result.detection_confidence, Some(0.5));
        assert!(result.explanation.contains("Marketing Copy"));
    }

    #[test]
    fn test_bypass_returns_original() {
        let (optimizer, sink) = optimizer_with_sink();
        let result = optimizer.optimize(&OptimizeRequest::new(MARKETING_PROMPT).bypassed());
        assert_eq!(result.optimized, MARKETING_PROMPT);
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
        assert!(result.modifications.is_empty());
        assert!(!optimizer.patterns().is_warm());
        std::thread::sleep(Duration::from_millis(50));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_records_analytics_in_background() {
        let (optimizer, sink) = optimizer_with_sink();
        optimizer.optimize(&OptimizeRequest::new(MARKETING_PROMPT));
        assert!(wait_for_events(&sink, 1));

        let events = sink
            .query(&crate::models::AnalyticsQuery {
                from: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
                domain: None,
            })
            .unwrap();
        assert_eq!(events[0].domain, "marketing_copy");
        assert_eq!(events[0].original_length, MARKETING_PROMPT.len());
    }

    #[test]
    fn test_analytics_opt_out() {
        let (optimizer, sink) = optimizer_with_sink();
        optimizer.optimize(&OptimizeRequest::new(MARKETING_PROMPT).without_analytics());
        std::thread::sleep(Duration::from_millis(50));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_domain_override() {
        let optimizer = PromptOptimizer::in_memory();
        let result =
            optimizer.optimize(&OptimizeRequest::new(MARKETING_PROMPT).with_domain("tax_accounting"));
        assert_eq!(result.domain, "tax_accounting");
        assert!(result.detection_confidence.is_none());
        assert!(result.optimized.contains("certified tax professional"));
    }

    #[test]
    fn test_unknown_override_falls_back_to_general() {
        let optimizer = PromptOptimizer::in_memory();
        let result = optimizer.optimize(&OptimizeRequest::new("Do X").with_domain("astrology"));
        assert_eq!(result.domain, GENERAL_DOMAIN);
        // 0.5 + 2 * 0.1, no domain bonus
        assert!((result.confidence - 0.7).abs() < 1e-9);
        assert!(result.explanation.contains("astrology"));
    }

    #[test]
    fn test_post_processing_order() {
        let optimizer = PromptOptimizer::in_memory();
        let result = optimizer.optimize(
            &OptimizeRequest::new(MARKETING_PROMPT)
                .with_intent("step-by-step reasoning")
                .with_format("json")
                .with_examples(),
        );
        let kinds: Vec<_> = result.modifications.iter().map(|m| m.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec![
                "role_addition",
                "format_suggestion",
                "examples",
                "chain_of_thought",
                "output_format"
            ]
        );
        assert!(result.optimized.starts_with(CHAIN_OF_THOUGHT_PREAMBLE));
        assert!(result.optimized.ends_with(OutputFormat::Json.instruction()));
    }

    #[test]
    fn test_unknown_format_is_noop() {
        let optimizer = PromptOptimizer::in_memory();
        let plain = optimizer.optimize(&OptimizeRequest::new(MARKETING_PROMPT));
        let odd = optimizer.optimize(&OptimizeRequest::new(MARKETING_PROMPT).with_format("yaml"));
        assert_eq!(plain.optimized, odd.optimized);
        assert_eq!(plain.modifications, odd.modifications);
    }

    #[test]
    fn test_chain_of_thought_can_be_forced_off() {
        let optimizer = PromptOptimizer::in_memory();
        let result = optimizer.optimize(
            &OptimizeRequest::new("Do X")
                .with_intent("reasoning")
                .with_chain_of_thought(false),
        );
        assert!(!result.optimized.contains(CHAIN_OF_THOUGHT_PREAMBLE));
    }

    #[test]
    fn test_ratio_scoring_config() {
        let optimizer = PromptOptimizer::in_memory()
            .with_detector(DomainDetector::new(ScoringConfig::ratio()));
        // marketing_copy: write, copy, marketing = 3/9, above 0.3
        let result = optimizer.optimize(&OptimizeRequest::new(MARKETING_PROMPT));
        assert_eq!(result.domain, "marketing_copy");
    }

    #[test]
    fn test_compare() {
        let optimizer = PromptOptimizer::in_memory();
        let comparison = optimizer.compare("Fix this function", true);
        assert!(comparison.was_optimized);
        let details = comparison.comparison.unwrap();
        assert_eq!(details.original_length, 17);
        assert!(details.length_increase.ends_with('%'));
        assert_eq!(comparison.domain, "code_generation");

        let quiet = optimizer.compare("Fix this function", false);
        assert!(quiet.comparison.is_none());
    }

    #[test]
    fn test_weak_detection_is_gated() {
        let (optimizer, sink) = optimizer_with_sink();
        // Only "ad" (weight 0.5) matches: 0.5 / 5.5 is below the 0.15 gate.
        let result = optimizer.optimize(&OptimizeRequest::new("Read this ad"));
        assert_eq!(result.domain, "marketing_copy");
        assert_eq!(result.optimized, "Read this ad");
        assert!(result.modifications.is_empty());
        assert_eq!(result.reason.as_deref(), Some("Low confidence in optimization benefit"));
        assert!(result.confidence < 0.15);
        std::thread::sleep(Duration::from_millis(50));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_forced_weak_detection_is_optimized() {
        let optimizer = PromptOptimizer::in_memory();
        let result = optimizer.optimize(&OptimizeRequest::new("Read this ad").forced());
        assert!(result.changed());
        assert!(result.reason.is_none());
        assert!(optimizer.compare("Read this ad", false).was_optimized);
    }

    #[test]
    fn test_gate_skips_override_and_general() {
        let optimizer = PromptOptimizer::in_memory()
            .with_detector(DomainDetector::new(ScoringConfig {
                min_detection_confidence: 0.99,
                ..ScoringConfig::default()
            }));
        assert!(optimizer.optimize(&OptimizeRequest::new("Do X")).changed());
        assert!(
            optimizer
                .optimize(&OptimizeRequest::new("Read this ad").with_domain("marketing_copy"))
                .changed()
        );
        let gated = optimizer.optimize(&OptimizeRequest::new(MARKETING_PROMPT));
        assert!(!gated.changed());
    }

    #[test]
    fn test_length_increase() {
        assert_eq!(length_increase(100, 345), "245%");
        assert_eq!(length_increase(3, 4), "33%");
        assert_eq!(length_increase(0, 10), "0%");
    }
}
