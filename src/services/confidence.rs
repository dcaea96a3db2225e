//! Result confidence heuristic.
//!
//! `base + min(count * per_modification_bonus, cap_bonus) + domain_bonus`,
//! clamped to `[0, max]`. This is a rough quality signal for callers, not a
//! probability.

use crate::config::ConfidenceConfig;

/// Scores an optimization result.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceEstimator {
    config: ConfidenceConfig,
}

impl ConfidenceEstimator {
    /// Creates an estimator with the given constants.
    #[must_use]
    pub const fn new(config: ConfidenceConfig) -> Self {
        Self { config }
    }

    /// Estimates confidence from the number of applied modifications and
    /// whether the domain was matched rather than defaulted.
    #[must_use]
    pub fn estimate(&self, modification_count: usize, domain_matched: bool) -> f64 {
        let modification_bonus = (modification_count as f64 * self.config.per_modification_bonus)
            .min(self.config.cap_bonus);
        let domain_bonus = if domain_matched {
            self.config.domain_bonus
        } else {
            0.0
        };

        let raw = self.config.base + modification_bonus + domain_bonus;
        let rounded = (raw * 100.0).round() / 100.0;
        rounded.clamp(0.0, self.config.max.max(0.0))
    }
}
