//! MCP tool implementations.
//!
//! # Module Structure
//!
//! - [`definitions`]: Tool schema definitions (JSON Schema for input validation)
//! - [`handlers`]: Tool execution logic
//!
//! Handler errors are turned into `{"success": false, "error": ...}` payloads
//! with `isError` set; only an unknown tool name surfaces as an `Err`.

mod definitions;
mod handlers;

use crate::services::PromptOptimizer;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Registry of MCP tools bound to one optimizer.
pub struct ToolRegistry {
    optimizer: Arc<PromptOptimizer>,
    /// Available tools, in listing order.
    tools: Vec<ToolDefinition>,
}

impl ToolRegistry {
    /// Creates a registry with all promptforge tools.
    #[must_use]
    pub fn new(optimizer: Arc<PromptOptimizer>) -> Self {
        Self {
            optimizer,
            tools: vec![
                definitions::optimize_prompt_tool(),
                definitions::manage_patterns_tool(),
                definitions::track_analytics_tool(),
                definitions::test_optimization_tool(),
            ],
        }
    }

    /// Returns all tool definitions.
    #[must_use]
    pub fn list_tools(&self) -> Vec<&ToolDefinition> {
        self.tools.iter().collect()
    }

    /// Gets a tool definition by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Returns the optimizer the tools run against.
    #[must_use]
    pub fn optimizer(&self) -> &Arc<PromptOptimizer> {
        &self.optimizer
    }

    /// Executes a tool with the given arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTool`] if no tool is registered under `name`.
    /// Every other failure is reported inside the returned [`ToolResult`].
    pub fn execute(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        let optimizer = self.optimizer.as_ref();
        let outcome = match name {
            "optimize_prompt" => handlers::execute_optimize_prompt(optimizer, arguments),
            "manage_patterns" => handlers::execute_manage_patterns(optimizer, arguments),
            "track_analytics" => handlers::execute_track_analytics(optimizer, arguments),
            "test_optimization" => handlers::execute_test_optimization(optimizer, arguments),
            _ => return Err(Error::UnknownTool(name.to_string())),
        };

        Ok(outcome.unwrap_or_else(|e| {
            tracing::warn!(tool = name, error = %e, "Tool call failed");
            ToolResult::failure(&e)
        }))
    }
}

/// Definition of an MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for input validation.
    pub input_schema: Value,
}

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the result represents an error.
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// Wraps a JSON payload as pretty-printed text content.
    #[must_use]
    pub fn json(payload: &Value) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string()),
            }],
            is_error: false,
        }
    }

    /// Builds the error payload for a failed call.
    #[must_use]
    pub fn failure(error: &Error) -> Self {
        Self {
            is_error: true,
            ..Self::json(&serde_json::json!({
                "success": false,
                "error": error.to_string()
            }))
        }
    }

    /// Returns the first text block, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|content| match content {
            ToolContent::Text { text } => Some(text.as_str()),
        })
    }
}

/// Content types that can be returned by tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Prepends `"success": true` to an object payload.
pub(crate) fn success_payload(payload: Value) -> Value {
    let mut map = serde_json::Map::new();
    map.insert("success".to_string(), Value::Bool(true));
    match payload {
        Value::Object(fields) => map.extend(fields),
        other => {
            map.insert("result".to_string(), other);
        },
    }
    Value::Object(map)
}
