//! Domain detection.
//!
//! Every pattern is scored against the prompt and the ranking decides the
//! domain. Two scoring modes are supported:
//!
//! | Mode | Score | Winner |
//! |------|-------|--------|
//! | Weighted | Σ keyword weights + feature bonus | highest positive score |
//! | Ratio | matched keywords / total keywords | highest score above the threshold |
//!
//! Ties go to the pattern registered first. A prompt that matches no trigger
//! keyword always routes to `general`.

use std::collections::BTreeSet;

use super::features::{PromptFeature, extract_features};
use crate::config::{ScoringConfig, ScoringMode};
use crate::models::{DomainScore, GENERAL_DOMAIN, Pattern, PatternSet};

/// Number of runner-up domains reported.
const MAX_ALTERNATIVES: usize = 2;

/// Outcome of domain detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Chosen domain.
    pub domain: String,
    /// Detector confidence in `[0, max_confidence]`.
    pub confidence: f64,
    /// Raw score of the chosen domain.
    pub score: f64,
    /// Up to two runner-up domains with positive scores.
    pub alternatives: Vec<DomainScore>,
    /// Full ranking, best first.
    pub ranking: Vec<DomainScore>,
}

impl Detection {
    /// Returns true if a non-fallback domain won with a positive score.
    #[must_use]
    pub fn matched(&self) -> bool {
        self.domain != GENERAL_DOMAIN && self.score > 0.0
    }
}

/// Scores patterns against prompts.
#[derive(Debug, Clone, Default)]
pub struct DomainDetector {
    config: ScoringConfig,
}

impl DomainDetector {
    /// Creates a detector with the given constants.
    #[must_use]
    pub const fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Returns the scoring constants.
    #[must_use]
    pub const fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Detects the domain of a prompt.
    #[must_use]
    pub fn detect(&self, prompt: &str, patterns: &PatternSet) -> Detection {
        let prompt_lower = prompt.to_lowercase();
        let features = extract_features(prompt);

        let mut ranking: Vec<DomainScore> = patterns
            .iter()
            .map(|pattern| DomainScore {
                domain: pattern.domain.clone(),
                score: self.score(&prompt_lower, &features, pattern),
            })
            .collect();
        // sort_by is stable: equal scores keep registration order.
        ranking.sort_by(|a, b| b.score.total_cmp(&a.score));

        let winner = ranking
            .first()
            .filter(|top| self.qualifies(top.score))
            .cloned();

        let (domain, score) = winner.map_or_else(
            || (GENERAL_DOMAIN.to_string(), 0.0),
            |top| (top.domain, top.score),
        );

        let alternatives = ranking
            .iter()
            .filter(|candidate| candidate.domain != domain && candidate.score > 0.0)
            .take(MAX_ALTERNATIVES)
            .cloned()
            .collect();

        let confidence = self.confidence_for(score);

        tracing::debug!(
            domain = %domain,
            score,
            confidence,
            features = ?features.iter().map(PromptFeature::as_str).collect::<Vec<_>>(),
            "Detected prompt domain"
        );

        Detection {
            domain,
            confidence,
            score,
            alternatives,
            ranking,
        }
    }

    /// Scores one pattern. `prompt_lower` must already be lowercased.
    fn score(&self, prompt_lower: &str, features: &BTreeSet<PromptFeature>, pattern: &Pattern) -> f64 {
        let matched: Vec<&String> = pattern
            .trigger_keywords
            .iter()
            .filter(|k| !k.trim().is_empty() && prompt_lower.contains(&k.to_lowercase()))
            .collect();

        match self.config.mode {
            ScoringMode::Weighted => {
                if matched.is_empty() {
                    return 0.0;
                }
                let keyword_score: f64 = matched.iter().map(|k| pattern.weight_for(k)).sum();
                let shared_features = features
                    .iter()
                    .filter(|f| pattern.features.contains(f.as_str()))
                    .count();
                keyword_score + shared_features as f64 * self.config.feature_bonus
            },
            ScoringMode::Ratio => {
                if pattern.trigger_keywords.is_empty() {
                    return 0.0;
                }
                matched.len() as f64 / pattern.trigger_keywords.len() as f64
            },
        }
    }

    fn qualifies(&self, score: f64) -> bool {
        match self.config.mode {
            ScoringMode::Weighted => score > 0.0,
            ScoringMode::Ratio => score > self.config.ratio_threshold,
        }
    }

    fn confidence_for(&self, score: f64) -> f64 {
        if score <= 0.0 {
            return 0.0;
        }
        let raw = match self.config.mode {
            ScoringMode::Weighted => score / (score + self.config.k),
            ScoringMode::Ratio => score,
        };
        raw.clamp(0.0, self.config.max_confidence)
    }
}
