//! Pattern models.
//!
//! A [`Pattern`] is the complete rule set for one domain: the trigger keywords
//! used to detect it and the ordered [`Enhancement`]s replayed onto prompts
//! that land in it. A [`PatternSet`] is the ordered collection served by a
//! pattern store.
//!
//! # Wire Format
//!
//! Pattern sets travel as a JSON object keyed by domain. Key order is the
//! store's registration order and is preserved end to end, because the
//! detector breaks score ties by that order.
//!
//! ```json
//! {
//!   "marketing_copy": {
//!     "displayName": "Marketing Copy",
//!     "triggerKeywords": ["copy", "marketing"],
//!     "keywordWeights": { "marketing": 2 },
//!     "features": ["creative"],
//!     "enhancements": [{ "type": "role_addition", "value": "You are a copywriter." }]
//!   }
//! }
//! ```

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{Error, Result};

/// Domain key of the mandatory fallback pattern.
pub const GENERAL_DOMAIN: &str = "general";

/// Weight applied to a trigger keyword with no explicit entry in `keywordWeights`.
pub const DEFAULT_KEYWORD_WEIGHT: f64 = 1.0;

/// Kind of textual injection an [`Enhancement`] performs.
///
/// Unrecognized type strings are kept verbatim in [`EnhancementKind::Other`]
/// and applied with append semantics, so no enhancement is ever dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnhancementKind {
    /// Prepends an expert role ("You are ...").
    RoleAddition,
    /// Appends a `Context:` block rendered from request-scoped context.
    ContextInjection,
    /// Appends output structure guidance.
    FormatSuggestion,
    /// Alias of [`EnhancementKind::FormatSuggestion`] used by some pattern sets.
    Structure,
    /// Appends quality constraints after everything else.
    ConstraintAddition,
    /// Any other type; appended as-is.
    Other(String),
}

impl EnhancementKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::RoleAddition => "role_addition",
            Self::ContextInjection => "context_injection",
            Self::FormatSuggestion => "format_suggestion",
            Self::Structure => "structure",
            Self::ConstraintAddition => "constraint_addition",
            Self::Other(name) => name.as_str(),
        }
    }

    /// Parses a wire name. Matching is case-insensitive; unknown names become `Other`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "role_addition" => Self::RoleAddition,
            "context_injection" => Self::ContextInjection,
            "format_suggestion" => Self::FormatSuggestion,
            "structure" => Self::Structure,
            "constraint_addition" => Self::ConstraintAddition,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl From<String> for EnhancementKind {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<EnhancementKind> for String {
    fn from(kind: EnhancementKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EnhancementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One textual injection rule inside a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enhancement {
    /// What the rule does.
    #[serde(rename = "type")]
    pub kind: EnhancementKind,
    /// Literal text to inject.
    #[serde(default)]
    pub value: String,
    /// Free-form annotation surfaced in the modification audit trail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Enhancement {
    /// Creates an enhancement without a reason.
    #[must_use]
    pub fn new(kind: EnhancementKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            reason: None,
        }
    }

    /// Sets the audit-trail reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Rule set for one domain.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    /// Unique domain key. Filled from the map key when read from a pattern set.
    #[serde(default)]
    pub domain: String,
    /// Human label.
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Case-insensitive substrings that vote for this domain.
    #[serde(default)]
    pub trigger_keywords: Vec<String>,
    /// Per-keyword weights; missing keywords weigh [`DEFAULT_KEYWORD_WEIGHT`].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub keyword_weights: BTreeMap<String, f64>,
    /// Prompt feature tags this domain is associated with.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub features: BTreeSet<String>,
    /// Ordered enhancement rules.
    #[serde(default)]
    pub enhancements: Vec<Enhancement>,
    /// Illustrative examples, injected only on request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl Pattern {
    /// Creates an empty pattern for a domain.
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the trigger keywords.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trigger_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the weight of one keyword.
    #[must_use]
    pub fn with_weight(mut self, keyword: impl Into<String>, weight: f64) -> Self {
        self.keyword_weights.insert(keyword.into(), weight);
        self
    }

    /// Sets the feature tags.
    #[must_use]
    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    /// Appends an enhancement.
    #[must_use]
    pub fn with_enhancement(mut self, enhancement: Enhancement) -> Self {
        self.enhancements.push(enhancement);
        self
    }

    /// Sets the examples.
    #[must_use]
    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if this is the fallback domain.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.domain == GENERAL_DOMAIN
    }

    /// Returns the human label, falling back to the domain key.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.domain)
    }

    /// Returns the weight of a keyword.
    ///
    /// Exact key matches win; otherwise weights are looked up case-insensitively.
    #[must_use]
    pub fn weight_for(&self, keyword: &str) -> f64 {
        self.keyword_weights
            .get(keyword)
            .or_else(|| {
                self.keyword_weights
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(keyword))
                    .map(|(_, w)| w)
            })
            .copied()
            .unwrap_or(DEFAULT_KEYWORD_WEIGHT)
    }

    /// Validates the pattern before it is written to a store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the domain is blank, a non-fallback
    /// pattern has no trigger keywords, or a keyword weight is not a positive
    /// finite number.
    pub fn validate(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(Error::InvalidInput("pattern domain is required".to_string()));
        }

        let has_keywords = self.trigger_keywords.iter().any(|k| !k.trim().is_empty());
        if !has_keywords && !self.is_fallback() {
            return Err(Error::InvalidInput(format!(
                "pattern '{}' needs at least one trigger keyword",
                self.domain
            )));
        }

        if let Some((keyword, weight)) = self
            .keyword_weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w <= 0.0)
        {
            return Err(Error::InvalidInput(format!(
                "keyword weight for '{keyword}' must be positive, got {weight}"
            )));
        }

        Ok(())
    }
}

/// Ordered collection of patterns keyed by domain.
///
/// Iteration order is registration order. Upserting an existing domain keeps
/// its position; new domains are appended.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Builds a set from patterns; a repeated domain replaces the earlier entry in place.
    #[must_use]
    pub fn from_patterns(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        let mut set = Self::new();
        for pattern in patterns {
            set.upsert(pattern);
        }
        set
    }

    /// Gets a pattern by domain.
    #[must_use]
    pub fn get(&self, domain: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.domain == domain)
    }

    /// Returns true if the domain is present.
    #[must_use]
    pub fn contains(&self, domain: &str) -> bool {
        self.get(domain).is_some()
    }

    /// Returns the fallback pattern if present.
    #[must_use]
    pub fn fallback(&self) -> Option<&Pattern> {
        self.get(GENERAL_DOMAIN)
    }

    /// Iterates patterns in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Pattern> {
        self.patterns.iter()
    }

    /// Returns the domain keys in registration order.
    #[must_use]
    pub fn domains(&self) -> Vec<&str> {
        self.patterns.iter().map(|p| p.domain.as_str()).collect()
    }

    /// Number of patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Inserts or replaces a pattern. Returns true if the domain already existed.
    pub fn upsert(&mut self, pattern: Pattern) -> bool {
        if let Some(existing) = self.patterns.iter_mut().find(|p| p.domain == pattern.domain) {
            *existing = pattern;
            true
        } else {
            self.patterns.push(pattern);
            false
        }
    }

    /// Removes a pattern by domain.
    pub fn remove(&mut self, domain: &str) -> Option<Pattern> {
        let index = self.patterns.iter().position(|p| p.domain == domain)?;
        Some(self.patterns.remove(index))
    }

    /// Appends `fallback` when the set has no `general` pattern.
    ///
    /// Returns true if the fallback was added.
    pub fn ensure_fallback(&mut self, fallback: Pattern) -> bool {
        if self.contains(GENERAL_DOMAIN) {
            return false;
        }
        let mut fallback = fallback;
        fallback.domain = GENERAL_DOMAIN.to_string();
        self.patterns.push(fallback);
        true
    }
}

impl<'a> IntoIterator for &'a PatternSet {
    type Item = &'a Pattern;
    type IntoIter = std::slice::Iter<'a, Pattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.patterns.iter()
    }
}

impl FromIterator<Pattern> for PatternSet {
    fn from_iter<T: IntoIterator<Item = Pattern>>(iter: T) -> Self {
        Self::from_patterns(iter)
    }
}

impl Serialize for PatternSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.patterns.len()))?;
        for pattern in &self.patterns {
            map.serialize_entry(&pattern.domain, pattern)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PatternSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(PatternSetVisitor)
    }
}

struct PatternSetVisitor;

impl<'de> Visitor<'de> for PatternSetVisitor {
    type Value = PatternSet;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping domain names to patterns")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<PatternSet, A::Error> {
        let mut set = PatternSet::new();
        while let Some((domain, mut pattern)) = access.next_entry::<String, Pattern>()? {
            pattern.domain = domain;
            set.upsert(pattern);
        }
        Ok(set)
    }
}
