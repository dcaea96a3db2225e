//! Enhancement engine.
//!
//! Replays a pattern's enhancements, in order, onto a prompt buffer. The
//! buffer is kept as ordered sections and rendered on demand, so each step
//! sees the text produced by the ones before it:
//!
//! ```text
//! <role preamble>          role_addition (prepended, newest first)
//!
//! Request: <prompt>        bare <prompt> when nothing trails it
//!
//! <trailing guidance>      context_injection, format_suggestion, other types
//!
//! <constraints>            constraint_addition
//! ```

use serde_json::Value;

use crate::models::{
    Enhancement, EnhancementKind, Modification, OutputFormat, Pattern, RequestContext,
};

/// Opening line added by chain-of-thought augmentation.
pub const CHAIN_OF_THOUGHT_PREAMBLE: &str = "Let's work through this step by step.";

/// Closing line added by chain-of-thought augmentation.
pub const CHAIN_OF_THOUGHT_POSTAMBLE: &str = "Before giving your final answer, lay out your reasoning for each step explicitly, then state the final answer clearly.";

/// Recognized context keys and their labels, in render order.
const CONTEXT_LABELS: [(&str, &str); 5] = [
    ("company", "Company"),
    ("industry", "Industry"),
    ("audience", "Target Audience"),
    ("tone", "Tone"),
    ("goals", "Goals"),
];

/// Output of [`EnhancementEngine::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enhanced {
    /// The augmented prompt.
    pub optimized: String,
    /// One record per change actually made, in order.
    pub modifications: Vec<Modification>,
}

/// Sectioned prompt buffer.
#[derive(Debug, Default)]
struct Buffer<'a> {
    preamble: Vec<&'a str>,
    request: &'a str,
    trailing: Vec<String>,
    constraints: Vec<&'a str>,
}

impl<'a> Buffer<'a> {
    fn new(request: &'a str) -> Self {
        Self {
            request,
            ..Self::default()
        }
    }

    fn render(&self) -> String {
        let labeled = !self.trailing.is_empty() || !self.constraints.is_empty();
        let request = if labeled {
            format!("Request: {}", self.request)
        } else {
            self.request.to_string()
        };

        let mut sections: Vec<&str> = Vec::new();
        sections.extend(self.preamble.iter().copied());
        sections.push(&request);
        sections.extend(self.trailing.iter().map(String::as_str));
        sections.extend(self.constraints.iter().copied());

        sections
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Applies enhancement rules to prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnhancementEngine;

impl EnhancementEngine {
    /// Creates an engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Applies `pattern`'s enhancements to `prompt`.
    ///
    /// `context` feeds `context_injection`; without any recognized key that
    /// enhancement is skipped and not recorded. A `role_addition` is skipped
    /// when the buffer already says "you are", which keeps re-application
    /// from stacking roles.
    #[must_use]
    pub fn apply(&self, prompt: &str, pattern: &Pattern, context: Option<&RequestContext>) -> Enhanced {
        let mut buffer = Buffer::new(prompt.trim());
        let mut modifications = Vec::new();

        for enhancement in &pattern.enhancements {
            let value = enhancement.value.trim();
            let applied = match &enhancement.kind {
                EnhancementKind::RoleAddition => {
                    if value.is_empty() || buffer.render().to_lowercase().contains("you are") {
                        false
                    } else {
                        buffer.preamble.insert(0, value);
                        true
                    }
                },
                EnhancementKind::ContextInjection => match context.and_then(render_context) {
                    Some(block) => {
                        buffer.trailing.push(block);
                        true
                    },
                    None => false,
                },
                EnhancementKind::FormatSuggestion
                | EnhancementKind::Structure
                | EnhancementKind::Other(_) => {
                    if value.is_empty() {
                        false
                    } else {
                        buffer.trailing.push(value.to_string());
                        true
                    }
                },
                EnhancementKind::ConstraintAddition => {
                    if value.is_empty() {
                        false
                    } else {
                        buffer.constraints.push(value);
                        true
                    }
                },
            };

            if applied {
                modifications.push(record(enhancement));
            }
        }

        Enhanced {
            optimized: buffer.render(),
            modifications,
        }
    }

    /// Wraps `text` in the step-by-step preamble and postamble.
    #[must_use]
    pub fn chain_of_thought(&self, text: &str) -> (String, Modification) {
        (
            format!("{CHAIN_OF_THOUGHT_PREAMBLE}\n\n{}\n\n{CHAIN_OF_THOUGHT_POSTAMBLE}", text.trim()),
            Modification::new("chain_of_thought", "Added step-by-step reasoning instructions"),
        )
    }

    /// Appends the instruction for `format`.
    ///
    /// Returns `None` for unrecognized format names.
    #[must_use]
    pub fn output_format(&self, text: &str, format: &str) -> Option<(String, Modification)> {
        let format = OutputFormat::parse(format)?;
        Some((
            format!("{}\n\n{}", text.trim(), format.instruction()),
            Modification::new("output_format", format!("Added {format} output format instruction")),
        ))
    }

    /// Appends the pattern's examples as a bulleted block.
    ///
    /// Returns `None` when the pattern has no examples.
    #[must_use]
    pub fn examples(&self, text: &str, pattern: &Pattern) -> Option<(String, Modification)> {
        let lines: Vec<String> = pattern
            .examples
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .map(|e| format!("- {e}"))
            .collect();
        if lines.is_empty() {
            return None;
        }
        Some((
            format!("{}\n\nExamples:\n{}", text.trim(), lines.join("\n")),
            Modification::new("examples", format!("Added {} illustrative examples", lines.len())),
        ))
    }
}

/// Renders recognized context keys as a `Context:` block.
fn render_context(context: &RequestContext) -> Option<String> {
    let lines: Vec<String> = CONTEXT_LABELS
        .iter()
        .filter_map(|(key, label)| {
            let value = match context.get(*key)? {
                Value::Null => return None,
                Value::String(s) => s.trim().to_string(),
                Value::Array(items) => items
                    .iter()
                    .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                    .collect::<Vec<_>>()
                    .join(", "),
                other => other.to_string(),
            };
            (!value.is_empty()).then(|| format!("{label}: {value}"))
        })
        .collect();

    (!lines.is_empty()).then(|| format!("Context:\n{}", lines.join("\n")))
}

fn record(enhancement: &Enhancement) -> Modification {
    let description = enhancement.reason.clone().unwrap_or_else(|| {
        match &enhancement.kind {
            EnhancementKind::RoleAddition => "Added expert role context".to_string(),
            EnhancementKind::ContextInjection => "Added business context".to_string(),
            EnhancementKind::FormatSuggestion | EnhancementKind::Structure => {
                "Added output structure guidance".to_string()
            },
            EnhancementKind::ConstraintAddition => "Added quality constraints".to_string(),
            EnhancementKind::Other(kind) => format!("Applied {kind} enhancement"),
        }
    });
    Modification::new(enhancement.kind.as_str(), description)
}
