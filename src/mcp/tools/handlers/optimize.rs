//! Optimization tool handlers: `optimize_prompt` and `test_optimization`.

use serde_json::Value;

use super::super::{ToolResult, success_payload};
use crate::mcp::tool_types::{OptimizePromptArgs, TestOptimizationArgs, parse_args, validate_prompt};
use crate::services::PromptOptimizer;
use crate::{Error, Result};

/// Executes the optimize tool.
pub fn execute_optimize_prompt(optimizer: &PromptOptimizer, arguments: Value) -> Result<ToolResult> {
    let args: OptimizePromptArgs = parse_args(arguments)?;
    let request = args.into_request()?;

    let result = optimizer.optimize(&request);
    let payload = serde_json::to_value(&result).map_err(|e| Error::OperationFailed {
        operation: "serialize_result".to_string(),
        cause: e.to_string(),
    })?;

    Ok(ToolResult::json(&success_payload(payload)))
}

/// Executes the dry-run tool.
pub fn execute_test_optimization(
    optimizer: &PromptOptimizer,
    arguments: Value,
) -> Result<ToolResult> {
    let args: TestOptimizationArgs = parse_args(arguments)?;
    validate_prompt(&args.prompt)?;

    let comparison = optimizer.compare(&args.prompt, args.show_diff.unwrap_or(true));
    let payload = serde_json::to_value(&comparison).map_err(|e| Error::OperationFailed {
        operation: "serialize_comparison".to_string(),
        cause: e.to_string(),
    })?;

    Ok(ToolResult::json(&payload))
}
