//! Pattern library handler: `manage_patterns`.

use serde_json::{Value, json};

use super::super::{ToolResult, success_payload};
use crate::mcp::tool_types::{ManagePatternsArgs, PatternAction, parse_args, require_domain};
use crate::models::Pattern;
use crate::services::PromptOptimizer;
use crate::{Error, Result};

/// Executes the pattern management tool.
pub fn execute_manage_patterns(optimizer: &PromptOptimizer, arguments: Value) -> Result<ToolResult> {
    let args: ManagePatternsArgs = parse_args(arguments)?;
    let action = PatternAction::parse(&args.action)?;
    let cache = optimizer.patterns();

    let payload = match action {
        PatternAction::Get => {
            let force_refresh = args.force_refresh.unwrap_or(false);
            match args.domain.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
                Some(domain) => json!({
                    "domain": domain,
                    "pattern": cache.get(domain, force_refresh)
                }),
                None => {
                    let patterns = cache.load(force_refresh);
                    json!({
                        "patterns": patterns.as_ref(),
                        "count": patterns.len()
                    })
                },
            }
        },
        PatternAction::Add => {
            let domain = require_domain(args.domain.as_deref(), action)?;
            let pattern = parse_pattern(&domain, args.pattern, action)?;
            cache.add(pattern)?;
            tracing::info!(domain = %domain, "Pattern added");
            json!({
                "action": action.as_str(),
                "domain": domain,
                "message": format!("Pattern for {domain} added successfully")
            })
        },
        PatternAction::Update => {
            let domain = require_domain(args.domain.as_deref(), action)?;
            let pattern = parse_pattern(&domain, args.pattern, action)?;
            let existed = cache.upsert(pattern)?;
            tracing::info!(domain = %domain, existed, "Pattern updated");
            json!({
                "action": action.as_str(),
                "domain": domain,
                "created": !existed,
                "message": format!("Pattern for {domain} updated successfully")
            })
        },
        PatternAction::Delete => {
            let domain = require_domain(args.domain.as_deref(), action)?;
            let deleted = cache.remove(&domain)?;
            tracing::info!(domain = %domain, deleted, "Pattern delete requested");
            let message = if deleted {
                format!("Pattern for {domain} deleted successfully")
            } else {
                format!("No pattern for {domain}")
            };
            json!({
                "action": action.as_str(),
                "domain": domain,
                "deleted": deleted,
                "message": message
            })
        },
    };

    Ok(ToolResult::json(&success_payload(payload)))
}

/// Parses a pattern body; the `domain` argument always wins over the body.
fn parse_pattern(domain: &str, body: Option<Value>, action: PatternAction) -> Result<Pattern> {
    let body = body.ok_or_else(|| {
        Error::InvalidInput(format!("'pattern' is required for {}", action.as_str()))
    })?;
    let mut pattern: Pattern = serde_json::from_value(body)
        .map_err(|e| Error::InvalidInput(format!("invalid pattern: {e}")))?;
    pattern.domain = domain.to_string();
    Ok(pattern)
}
