//! Prompt feature extraction.
//!
//! Features are coarse structural and lexical signals read from the prompt
//! with a fixed rule table. A pattern that declares a feature earns a bonus
//! when the prompt exhibits it.
// Allow expect() on static regex patterns - these are guaranteed to compile
#![allow(clippy::expect_used)]

use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

/// Word count below which a prompt is `short`.
const SHORT_WORDS: usize = 8;
/// Word count above which a prompt is `long`.
const LONG_WORDS: usize = 60;

/// A prompt feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PromptFeature {
    /// Fewer than 8 words.
    Short,
    /// More than 60 words.
    Long,
    /// Contains a question mark.
    Question,
    /// Contains fenced or inline code.
    Code,
    /// Contains list markers.
    Structured,
    /// Uses creation verbs.
    Creative,
    /// Uses analysis verbs.
    Analytical,
    /// Mentions errors or fixing.
    Debugging,
    /// Uses persuasion verbs.
    Persuasive,
}

impl PromptFeature {
    /// Returns the tag used in pattern `features`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
            Self::Question => "question",
            Self::Code => "code",
            Self::Structured => "structured",
            Self::Creative => "creative",
            Self::Analytical => "analytical",
            Self::Debugging => "debugging",
            Self::Persuasive => "persuasive",
        }
    }
}

impl fmt::Display for PromptFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A regex rule that marks a feature.
struct FeatureRule {
    pattern: Regex,
    feature: PromptFeature,
}

static FEATURE_RULES: LazyLock<Vec<FeatureRule>> = LazyLock::new(|| {
    vec![
        FeatureRule {
            pattern: Regex::new(r"\?").expect("static regex: question"),
            feature: PromptFeature::Question,
        },
        FeatureRule {
            pattern: Regex::new(r"```|`[^`\n]+`").expect("static regex: code"),
            feature: PromptFeature::Code,
        },
        FeatureRule {
            pattern: Regex::new(r"(?m)^\s*(?:[-*]|\d+\.)\s+\S").expect("static regex: list marker"),
            feature: PromptFeature::Structured,
        },
        FeatureRule {
            pattern: Regex::new(r"(?i)\b(?:write|wrote|writing|create|generate|draft|compose|design|brainstorm)")
                .expect("static regex: creative verbs"),
            feature: PromptFeature::Creative,
        },
        FeatureRule {
            pattern: Regex::new(
                r"(?i)\b(?:analy[sz]|evaluat|compar|assess|measur|summari[sz]|forecast)",
            )
            .expect("static regex: analytical verbs"),
            feature: PromptFeature::Analytical,
        },
        FeatureRule {
            pattern: Regex::new(r"(?i)\b(?:debug|fix|error|bug|crash|troubleshoot|stack\s+trace)")
                .expect("static regex: debugging"),
            feature: PromptFeature::Debugging,
        },
        FeatureRule {
            pattern: Regex::new(r"(?i)\b(?:sell|convinc|persuad|promot|convert)")
                .expect("static regex: persuasive verbs"),
            feature: PromptFeature::Persuasive,
        },
    ]
});

/// Extracts the features present in a prompt.
#[must_use]
pub fn extract_features(prompt: &str) -> BTreeSet<PromptFeature> {
    let mut features = BTreeSet::new();

    let words = prompt.split_whitespace().count();
    if words < SHORT_WORDS {
        features.insert(PromptFeature::Short);
    }
    if words > LONG_WORDS {
        features.insert(PromptFeature::Long);
    }

    for rule in FEATURE_RULES.iter() {
        if rule.pattern.is_match(prompt) {
            features.insert(rule.feature);
        }
    }

    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Write marketing copy for a new SaaS product", PromptFeature::Creative; "creative verb")]
    #[test_case("Why is the sky blue?", PromptFeature::Question; "question mark")]
    #[test_case("What does `Vec::drain` do", PromptFeature::Code; "inline code")]
    #[test_case("```\nfn main() {}\n```", PromptFeature::Code; "code fence")]
    #[test_case("Plan:\n- one\n- two", PromptFeature::Structured; "dash list")]
    #[test_case("Steps:\n1. one\n2. two", PromptFeature::Structured; "numbered list")]
    #[test_case("Please analyse churn by cohort", PromptFeature::Analytical; "british spelling")]
    #[test_case("Fix the crash in the parser", PromptFeature::Debugging; "fix crash")]
    #[test_case("Help me persuade investors", PromptFeature::Persuasive; "persuade")]
    #[test_case("Hello there", PromptFeature::Short; "short prompt")]
    fn test_feature_detected(prompt: &str, feature: PromptFeature) {
        assert!(extract_features(prompt).contains(&feature));
    }

    #[test]
    fn test_long_prompt() {
        let prompt = "word ".repeat(61);
        let features = extract_features(&prompt);
        assert!(features.contains(&PromptFeature::Long));
        assert!(!features.contains(&PromptFeature::Short));
    }

    #[test]
    fn test_plain_prompt_has_no_lexical_features() {
        let features = extract_features("Tell me about the history of the Roman aqueducts please");
        assert!(features.is_empty());
    }
}
