//! Built-in pattern set.
//!
//! Seeds the in-memory store and serves as the fallback whenever the remote
//! pattern store cannot be read.

use crate::models::{Enhancement, EnhancementKind, GENERAL_DOMAIN, Pattern, PatternSet};

/// Returns the built-in pattern set in registration order.
#[must_use]
pub fn default_patterns() -> PatternSet {
    PatternSet::from_patterns([
        marketing_copy(),
        data_analysis(),
        tax_accounting(),
        code_generation(),
        default_general_pattern(),
    ])
}

/// Returns the built-in fallback pattern.
#[must_use]
pub fn default_general_pattern() -> Pattern {
    Pattern::new(GENERAL_DOMAIN)
        .with_display_name("General")
        .with_enhancement(Enhancement::new(
            EnhancementKind::RoleAddition,
            "You are a helpful AI assistant with broad knowledge across many domains.",
        ))
        .with_enhancement(Enhancement::new(
            EnhancementKind::FormatSuggestion,
            "Please provide a clear, comprehensive, and well-structured response.",
        ))
}

fn marketing_copy() -> Pattern {
    Pattern::new("marketing_copy")
        .with_display_name("Marketing Copy")
        .with_keywords([
            "write", "create", "generate", "copy", "content", "marketing", "email", "landing",
            "ad",
        ])
        .with_weight("marketing", 2.0)
        .with_weight("copy", 1.5)
        .with_weight("ad", 0.5)
        .with_features(["creative", "persuasive"])
        .with_enhancement(Enhancement::new(
            EnhancementKind::RoleAddition,
            "You are an expert copywriter with 10+ years experience in conversion optimization and brand messaging.",
        ))
        .with_enhancement(Enhancement::new(
            EnhancementKind::ContextInjection,
            "Tailor the message to the business context provided.",
        ))
        .with_enhancement(Enhancement::new(
            EnhancementKind::FormatSuggestion,
            "Structure your response with:\n1. Attention-grabbing headline\n2. Problem identification\n3. Solution presentation\n4. Social proof/benefits\n5. Clear call-to-action\n\nUse active voice, focus on benefits over features, and keep sentences concise and scannable.",
        ))
        .with_examples([
            "Headline: Stop losing leads to slow follow-up. Start closing in minutes.",
            "CTA: Start your free 14-day trial. No credit card required.",
        ])
}

fn data_analysis() -> Pattern {
    Pattern::new("data_analysis")
        .with_display_name("Data Analysis")
        .with_keywords([
            "analyze",
            "data",
            "metrics",
            "insights",
            "report",
            "statistics",
            "performance",
        ])
        .with_weight("data", 1.5)
        .with_weight("analyze", 1.5)
        .with_features(["analytical", "structured"])
        .with_enhancement(Enhancement::new(
            EnhancementKind::RoleAddition,
            "You are a data analyst expert skilled in extracting actionable insights from complex data.",
        ))
        .with_enhancement(Enhancement::new(
            EnhancementKind::FormatSuggestion,
            "Provide your analysis in this structure:\n1. Executive Summary (key takeaways)\n2. Data Overview\n3. Key Findings (with supporting data)\n4. Actionable Recommendations\n5. Next Steps\n\nSupport all claims with specific data points.",
        ))
        .with_examples([
            "Key finding: churn rose 4% QoQ, concentrated in accounts under 10 seats.",
        ])
}

fn tax_accounting() -> Pattern {
    Pattern::new("tax_accounting")
        .with_display_name("Tax & Accounting")
        .with_keywords([
            "tax",
            "accounting",
            "CPA",
            "financial",
            "bookkeeping",
            "IRS",
            "deduction",
            "audit",
        ])
        .with_weight("tax", 2.0)
        .with_weight("IRS", 2.0)
        .with_features(["analytical", "question"])
        .with_enhancement(Enhancement::new(
            EnhancementKind::RoleAddition,
            "You are a certified tax professional with expertise in mid-market business taxation and comprehensive financial planning.",
        ))
        .with_enhancement(Enhancement::new(
            EnhancementKind::FormatSuggestion,
            "Structure your response to address:\n1. Current situation/challenge\n2. Tax implications and compliance requirements\n3. Optimization opportunities\n4. Recommended approach\n5. Potential savings/benefits\n6. Next steps\n\nEnsure accuracy and highlight both risks and opportunities.",
        ))
        .with_enhancement(Enhancement::new(
            EnhancementKind::ContextInjection,
            "Consider current tax regulations and best practices for business financial management.",
        ))
        .with_enhancement(
            Enhancement::new(
                EnhancementKind::ConstraintAddition,
                "Note any assumptions made and recommend confirming specifics with a licensed professional before acting.",
            )
            .with_reason("Added compliance caveat"),
        )
}

fn code_generation() -> Pattern {
    Pattern::new("code_generation")
        .with_display_name("Code Generation")
        .with_keywords([
            "code",
            "function",
            "implement",
            "program",
            "script",
            "algorithm",
            "debug",
            "fix",
        ])
        .with_weight("code", 1.5)
        .with_weight("debug", 1.5)
        .with_features(["code", "debugging"])
        .with_enhancement(Enhancement::new(
            EnhancementKind::RoleAddition,
            "You are an experienced software engineer focused on writing clean, efficient, and maintainable code.",
        ))
        .with_enhancement(Enhancement::new(
            EnhancementKind::FormatSuggestion,
            "Provide:\n1. Complete code implementation\n2. Clear comments explaining the logic\n3. Usage example\n4. Key considerations/edge cases\n5. Error handling approach\n\nFollow best practices for the language and include necessary imports.",
        ))
        .with_examples(["fn parse_port(s: &str) -> Result<u16, ParseIntError> { s.trim().parse() }"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let set = default_patterns();
        assert_eq!(
            set.domains(),
            vec![
                "marketing_copy",
                "data_analysis",
                "tax_accounting",
                "code_generation",
                "general"
            ]
        );
        for pattern in &set {
            pattern.validate().unwrap();
        }
        assert!(set.fallback().unwrap().trigger_keywords.is_empty());
    }

    #[test]
    fn test_defaults_survive_wire_format() {
        let set = default_patterns();
        let json = serde_json::to_string(&set).unwrap();
        let back: PatternSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
