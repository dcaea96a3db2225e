//! Scoring and confidence tuning.
//!
//! Both sections deserialize with per-field defaults, so a TOML file only
//! needs to name the constants it overrides.

use serde::Deserialize;

/// How the detector scores patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Sum of keyword weights plus feature bonuses.
    #[default]
    Weighted,
    /// Fraction of trigger keywords present, gated by a threshold.
    Ratio,
}

impl ScoringMode {
    /// Parses a mode name, defaulting to weighted.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "ratio" => Self::Ratio,
            _ => Self::Weighted,
        }
    }
}

/// Domain detector constants.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Scoring mode.
    pub mode: ScoringMode,
    /// Saturation constant in `top / (top + k)`.
    pub k: f64,
    /// Bonus per prompt feature shared with the pattern.
    pub feature_bonus: f64,
    /// Ratio mode: scores must be strictly greater than this.
    pub ratio_threshold: f64,
    /// Upper bound on detector confidence.
    pub max_confidence: f64,
    /// Detected domains below this confidence are left unoptimized unless
    /// the caller forces optimization. Explicit domain overrides and the
    /// `general` fallback are never gated.
    pub min_detection_confidence: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mode: ScoringMode::Weighted,
            k: 5.0,
            feature_bonus: 0.5,
            ratio_threshold: 0.3,
            max_confidence: 0.99,
            min_detection_confidence: 0.15,
        }
    }
}

impl ScoringConfig {
    /// Returns a copy using ratio mode.
    #[must_use]
    pub fn ratio() -> Self {
        Self {
            mode: ScoringMode::Ratio,
            ..Self::default()
        }
    }
}

/// Result confidence constants.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Starting score.
    pub base: f64,
    /// Added per applied modification.
    pub per_modification_bonus: f64,
    /// Ceiling on the modification bonus.
    pub cap_bonus: f64,
    /// Added when the domain was matched rather than defaulted.
    pub domain_bonus: f64,
    /// Upper bound on the final score.
    pub max: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            base: 0.5,
            per_modification_bonus: 0.1,
            cap_bonus: 0.3,
            domain_bonus: 0.15,
            max: 0.99,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_sections_keep_defaults() {
        let scoring: ScoringConfig = toml::from_str("mode = \"ratio\"\nk = 3.0").unwrap();
        assert_eq!(scoring.mode, ScoringMode::Ratio);
        assert!((scoring.k - 3.0).abs() < f64::EPSILON);
        assert!((scoring.feature_bonus - 0.5).abs() < f64::EPSILON);
        assert!((scoring.min_detection_confidence - 0.15).abs() < f64::EPSILON);

        let confidence: ConfidenceConfig = toml::from_str("domain_bonus = 0.2").unwrap();
        assert!((confidence.base - 0.5).abs() < f64::EPSILON);
        assert!((confidence.domain_bonus - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(ScoringMode::parse("RATIO"), ScoringMode::Ratio);
        assert_eq!(ScoringMode::parse("anything"), ScoringMode::Weighted);
    }
}
