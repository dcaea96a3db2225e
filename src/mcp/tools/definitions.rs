//! Tool definitions for MCP tools.
//!
//! Contains the JSON Schema definitions for all promptforge tools.

use super::ToolDefinition;

/// Defines the optimize tool.
pub fn optimize_prompt_tool() -> ToolDefinition {
    ToolDefinition {
        name: "optimize_prompt".to_string(),
        description: "Analyzes and enhances a user prompt by detecting its domain and applying that domain's optimization pattern".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "minLength": 1,
                    "description": "The prompt to optimize"
                },
                "domain": {
                    "type": "string",
                    "description": "Optional: skip detection and use this domain's pattern"
                },
                "intent": {
                    "type": "string",
                    "description": "Optional: caller intent; reasoning or analysis intents add chain-of-thought"
                },
                "desiredFormat": {
                    "type": "string",
                    "description": "Optional: output format instruction to append",
                    "enum": ["json", "xml", "markdown", "html", "list", "table", "code"]
                },
                "userContext": {
                    "type": "object",
                    "additionalProperties": {},
                    "description": "Optional: company, industry, audience, tone, goals for context injection (also accepted as 'context')"
                },
                "bypassOptimization": {
                    "type": "boolean",
                    "description": "Return the prompt unchanged (default: false)"
                },
                "chainOfThought": {
                    "type": "boolean",
                    "description": "Force step-by-step reasoning scaffolding on or off"
                },
                "includeExamples": {
                    "type": "boolean",
                    "description": "Append the pattern's examples (default: false)"
                },
                "recordAnalytics": {
                    "type": "boolean",
                    "description": "Record an analytics event (default: true)"
                },
                "forceOptimize": {
                    "type": "boolean",
                    "description": "Optimize even when the detected domain is a weak match (default: false)"
                }
            },
            "required": ["prompt"]
        }),
    }
}

/// Defines the pattern management tool.
pub fn manage_patterns_tool() -> ToolDefinition {
    ToolDefinition {
        name: "manage_patterns".to_string(),
        description: "Manages the prompt optimization patterns library".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["get", "add", "update", "delete"],
                    "description": "Operation to perform"
                },
                "domain": {
                    "type": "string",
                    "description": "Target domain (required for add, update, delete)"
                },
                "pattern": {
                    "type": "object",
                    "description": "Pattern body: displayName, triggerKeywords, keywordWeights, features, enhancements, examples"
                },
                "forceRefresh": {
                    "type": "boolean",
                    "description": "Bypass the pattern cache for get (default: false)"
                }
            },
            "required": ["action"]
        }),
    }
}

/// Defines the analytics tool.
pub fn track_analytics_tool() -> ToolDefinition {
    ToolDefinition {
        name: "track_analytics".to_string(),
        description: "Tracks prompt optimization analytics and summarizes them over a time window"
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["record", "query"]
                },
                "data": {
                    "type": "object",
                    "description": "Event to record: domain, confidence, originalLength, optimizedLength, modificationCount",
                    "properties": {
                        "domain": { "type": "string" },
                        "confidence": { "type": "number", "minimum": 0, "maximum": 1 }
                    },
                    "required": ["domain", "confidence"]
                },
                "queryParams": {
                    "type": "object",
                    "properties": {
                        "timeRange": {
                            "type": "string",
                            "enum": ["today", "week", "month", "all"]
                        },
                        "domain": { "type": "string" }
                    }
                }
            },
            "required": ["action"]
        }),
    }
}

/// Defines the dry-run tool.
pub fn test_optimization_tool() -> ToolDefinition {
    ToolDefinition {
        name: "test_optimization".to_string(),
        description: "Runs an optimization without recording analytics and shows the before/after comparison".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "minLength": 1,
                    "description": "The prompt to test"
                },
                "showDiff": {
                    "type": "boolean",
                    "description": "Include lengths and modifications (default: true)"
                }
            },
            "required": ["prompt"]
        }),
    }
}
