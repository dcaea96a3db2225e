//! Optimization request and result models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request-scoped context rendered by `context_injection` enhancements.
pub type RequestContext = Map<String, Value>;

/// Output format requested by the caller.
///
/// Each variant maps to one fixed instruction appended after enhancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Valid JSON only.
    Json,
    /// Well-formed XML.
    Xml,
    /// Markdown with headings.
    Markdown,
    /// Semantic HTML.
    Html,
    /// Bulleted list.
    List,
    /// Table.
    Table,
    /// Code block.
    Code,
}

impl OutputFormat {
    /// Parses a format name. Returns `None` for unknown formats.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            "markdown" | "md" => Some(Self::Markdown),
            "html" => Some(Self::Html),
            "list" => Some(Self::List),
            "table" => Some(Self::Table),
            "code" => Some(Self::Code),
            _ => None,
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::List => "list",
            Self::Table => "table",
            Self::Code => "code",
        }
    }

    /// Returns the instruction appended to the prompt.
    #[must_use]
    pub const fn instruction(&self) -> &'static str {
        match self {
            Self::Json => {
                "Format your response as valid JSON. Do not include any text outside the JSON object."
            },
            Self::Xml => "Format your response as well-formed XML with a single root element.",
            Self::Markdown => {
                "Format your response in Markdown, using headings, lists and emphasis where they help readability."
            },
            Self::Html => "Format your response as semantic HTML suitable for embedding in a page.",
            Self::List => "Format your response as a concise bulleted list.",
            Self::Table => "Format your response as a table with clearly labeled columns.",
            Self::Code => {
                "Respond with code in a fenced code block, followed by a brief explanation."
            },
        }
    }

    /// All supported formats.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Json,
            Self::Xml,
            Self::Markdown,
            Self::Html,
            Self::List,
            Self::Table,
            Self::Code,
        ]
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the modification audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    /// Enhancement or post-processing stage that changed the text.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable description.
    pub description: String,
}

impl Modification {
    /// Creates a modification record.
    #[must_use]
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
        }
    }
}

/// A candidate domain with its raw detection score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainScore {
    /// Domain key.
    pub domain: String,
    /// Raw (unnormalized) score.
    pub score: f64,
}

/// Input to a single optimization.
#[derive(Debug, Clone, Default)]
pub struct OptimizeRequest {
    /// The prompt to optimize.
    pub prompt: String,
    /// Explicit domain override.
    pub domain: Option<String>,
    /// Free-form caller intent (e.g. "reasoning").
    pub intent: Option<String>,
    /// Desired output format name.
    pub desired_format: Option<String>,
    /// Request-scoped context for `context_injection`.
    pub user_context: Option<RequestContext>,
    /// Returns the prompt unchanged when true.
    pub bypass_optimization: bool,
    /// Forces chain-of-thought on or off; `None` derives it from `intent`.
    pub chain_of_thought: Option<bool>,
    /// Appends the pattern's examples.
    pub include_examples: bool,
    /// Records an analytics event for this call.
    pub record_analytics: bool,
    /// Optimizes even when detection confidence is below the gate.
    pub force_optimize: bool,
}

impl OptimizeRequest {
    /// Creates a request with analytics recording enabled.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            record_analytics: true,
            ..Self::default()
        }
    }

    /// Sets the explicit domain.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the intent.
    #[must_use]
    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    /// Sets the desired output format.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.desired_format = Some(format.into());
        self
    }

    /// Sets the user context.
    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.user_context = Some(context);
        self
    }

    /// Forces chain-of-thought on or off.
    #[must_use]
    pub const fn with_chain_of_thought(mut self, enabled: bool) -> Self {
        self.chain_of_thought = Some(enabled);
        self
    }

    /// Requests the pattern's examples.
    #[must_use]
    pub const fn with_examples(mut self) -> Self {
        self.include_examples = true;
        self
    }

    /// Skips optimization entirely.
    #[must_use]
    pub const fn bypassed(mut self) -> Self {
        self.bypass_optimization = true;
        self
    }

    /// Disables analytics recording.
    #[must_use]
    pub const fn without_analytics(mut self) -> Self {
        self.record_analytics = false;
        self
    }

    /// Optimizes regardless of detection confidence.
    #[must_use]
    pub const fn forced(mut self) -> Self {
        self.force_optimize = true;
        self
    }
}

/// Outcome of one optimization. Constructed per call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    /// The prompt as received.
    pub original: String,
    /// The augmented prompt.
    pub optimized: String,
    /// Resolved domain key.
    pub domain: String,
    /// Heuristic quality score in `[0, 1]`.
    pub confidence: f64,
    /// Applied modifications, in application order.
    pub modifications: Vec<Modification>,
    /// Runner-up domains with raw scores (diagnostics only).
    #[serde(default)]
    pub alternatives: Vec<DomainScore>,
    /// Detector confidence for the chosen domain, when detection ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_confidence: Option<f64>,
    /// Short human summary of what was done.
    #[serde(default)]
    pub explanation: String,
    /// Why the prompt was left unchanged, when optimization was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl OptimizationResult {
    /// Builds the result returned for bypassed requests.
    #[must_use]
    pub fn passthrough(prompt: &str, domain: impl Into<String>) -> Self {
        Self {
            original: prompt.to_string(),
            optimized: prompt.to_string(),
            domain: domain.into(),
            confidence: 1.0,
            modifications: Vec::new(),
            alternatives: Vec::new(),
            detection_confidence: None,
            explanation: "Optimization bypassed; prompt returned unchanged".to_string(),
            reason: None,
        }
    }

    /// Builds the result returned when detection confidence is too low to
    /// justify rewriting the prompt.
    #[must_use]
    pub fn low_confidence(prompt: &str, domain: impl Into<String>, confidence: f64) -> Self {
        Self {
            original: prompt.to_string(),
            optimized: prompt.to_string(),
            domain: domain.into(),
            confidence,
            modifications: Vec::new(),
            alternatives: Vec::new(),
            detection_confidence: Some(confidence),
            explanation: "Prompt returned unchanged".to_string(),
            reason: Some("Low confidence in optimization benefit".to_string()),
        }
    }

    /// Returns true if the optimized text differs from the original.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.optimized != self.original
    }
}
