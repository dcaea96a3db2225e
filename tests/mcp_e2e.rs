//! MCP Server End-to-End Tests
//!
//! Drives the JSON-RPC surface exactly as a client would: raw request text
//! in, raw response text out, backed by the in-memory stores.
//!
//! Covers:
//! - Protocol handshake and tool listing
//! - The four promptforge tools
//! - JSON-RPC error codes

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::uninlined_format_args,
    clippy::needless_raw_string_hashes
)]

use promptforge::mcp::{McpServer, PROTOCOL_VERSION, SERVER_NAME};
use promptforge::services::PromptOptimizer;
use serde_json::{Value, json};
use std::sync::Arc;

fn server() -> McpServer {
    McpServer::new(Arc::new(PromptOptimizer::in_memory()))
}

fn request(server: &McpServer, id: u64, method: &str, params: Value) -> Value {
    let raw = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
    .to_string();
    serde_json::from_str(&server.handle_request(&raw)).expect("response is JSON")
}

/// Calls a tool and returns the parsed JSON body of its text content.
fn call_tool(server: &McpServer, name: &str, arguments: Value) -> (Value, bool) {
    let response = request(
        server,
        7,
        "tools/call",
        json!({"name": name, "arguments": arguments}),
    );
    let result = &response["result"];
    let text = result["content"][0]["text"]
        .as_str()
        .unwrap_or_else(|| panic!("missing text content in {response}"));
    (
        serde_json::from_str(text).expect("tool text is JSON"),
        result["isError"].as_bool().unwrap(),
    )
}

// ============================================================================
// Protocol
// ============================================================================

mod protocol {
    use super::*;

    #[test]
    fn test_initialize() {
        let response = request(&server(), 1, "initialize", json!({}));
        assert_eq!(response["jsonrpc"], "2.0");
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], SERVER_NAME);
        assert!(response["result"]["capabilities"]["tools"].is_object());
    }

    #[test]
    fn test_ping() {
        let response = request(&server(), 2, "ping", json!({}));
        assert_eq!(response["result"], json!({}));
    }

    #[test]
    fn test_initialized_notification_has_no_response() {
        let raw = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        assert!(server().handle_request(raw).is_empty());
    }

    #[test]
    fn test_tools_list() {
        let response = request(&server(), 3, "tools/list", json!({}));
        let tools = response["result"]["tools"].as_array().unwrap();

        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            vec![
                "optimize_prompt",
                "manage_patterns",
                "track_analytics",
                "test_optimization"
            ]
        );
        for tool in tools {
            assert!(!tool["description"].as_str().unwrap().is_empty());
            assert_eq!(tool["inputSchema"]["type"], "object");
        }
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["prompt"]));
        assert_eq!(tools[1]["inputSchema"]["required"], json!(["action"]));
    }
}

// ============================================================================
// optimize_prompt
// ============================================================================

mod optimize_prompt {
    use super::*;

    #[test]
    fn test_marketing_example() {
        let (body, is_error) = call_tool(
            &server(),
            "optimize_prompt",
            json!({"prompt": "Write marketing copy for a new SaaS product"}),
        );
        assert!(!is_error);
        assert_eq!(body["success"], true);
        assert_eq!(body["domain"], "marketing_copy");
        assert_eq!(body["original"], "Write marketing copy for a new SaaS product");

        let optimized = body["optimized"].as_str().unwrap();
        assert!(optimized.starts_with("You are an expert copywriter"));
        let request_at = optimized
            .find("Request: Write marketing copy for a new SaaS product")
            .unwrap();
        let format_at = optimized.find("1. Attention-grabbing headline").unwrap();
        assert!(request_at < format_at);

        assert!(body["modifications"].as_array().unwrap().len() >= 2);
        let confidence = body["confidence"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&confidence));
    }

    #[test]
    fn test_bypass_returns_prompt_unchanged() {
        let (body, is_error) = call_tool(
            &server(),
            "optimize_prompt",
            json!({"prompt": "Do X", "bypassOptimization": true}),
        );
        assert!(!is_error);
        assert_eq!(body["optimized"], "Do X");
        assert_eq!(body["confidence"], 1.0);
        assert_eq!(body["modifications"], json!([]));
    }

    #[test]
    fn test_domain_override() {
        let (body, _) = call_tool(
            &server(),
            "optimize_prompt",
            json!({"prompt": "Write marketing copy", "domain": "code_generation", "recordAnalytics": false}),
        );
        assert_eq!(body["domain"], "code_generation");
    }

    #[test]
    fn test_desired_format_appended_last() {
        let (body, _) = call_tool(
            &server(),
            "optimize_prompt",
            json!({"prompt": "Summarize the meeting notes", "desiredFormat": "json", "recordAnalytics": false}),
        );
        let kinds: Vec<&str> = body["modifications"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["type"].as_str().unwrap())
            .collect();
        assert_eq!(kinds.last(), Some(&"output_format"));
        assert!(body["optimized"].as_str().unwrap().to_lowercase().contains("json"));
    }

    #[test]
    fn test_context_argument() {
        let (body, is_error) = call_tool(
            &server(),
            "optimize_prompt",
            json!({
                "prompt": "Write an email about our tax services",
                "context": {"company": "Acme CPA", "tone": "professional"},
                "recordAnalytics": false
            }),
        );
        assert!(!is_error);
        assert!(body["optimized"].as_str().unwrap().contains("Company: Acme CPA"));
    }

    #[test]
    fn test_low_confidence_gate() {
        let server = server();
        let (body, is_error) = call_tool(
            &server,
            "optimize_prompt",
            json!({"prompt": "Read this ad", "recordAnalytics": false}),
        );
        assert!(!is_error);
        assert_eq!(body["optimized"], "Read this ad");
        assert_eq!(body["reason"], "Low confidence in optimization benefit");

        let (body, _) = call_tool(
            &server,
            "optimize_prompt",
            json!({"prompt": "Read this ad", "forceOptimize": true, "recordAnalytics": false}),
        );
        assert_ne!(body["optimized"], "Read this ad");
    }

    #[test]
    fn test_missing_prompt_is_tool_error() {
        let (body, is_error) = call_tool(&server(), "optimize_prompt", json!({"domain": "general"}));
        assert!(is_error);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[test]
    fn test_unknown_argument_is_tool_error() {
        let (body, is_error) = call_tool(
            &server(),
            "optimize_prompt",
            json!({"prompt": "hi", "temperature": 0.3}),
        );
        assert!(is_error);
        assert_eq!(body["success"], false);
    }
}

// ============================================================================
// manage_patterns
// ============================================================================

mod manage_patterns {
    use super::*;

    #[test]
    fn test_update_then_get_then_optimize() {
        let server = server();
        let pattern = json!({
            "displayName": "Legal",
            "triggerKeywords": ["contract", "clause", "indemnity"],
            "enhancements": [
                {"type": "role_addition", "value": "You are a senior contracts lawyer."},
                {"type": "constraint_addition", "value": "Cite the clause you rely on."}
            ]
        });

        let (body, is_error) = call_tool(
            &server,
            "manage_patterns",
            json!({"action": "update", "domain": "legal", "pattern": pattern}),
        );
        assert!(!is_error);
        assert_eq!(body["success"], true);

        let (body, _) = call_tool(
            &server,
            "manage_patterns",
            json!({"action": "get", "domain": "legal"}),
        );
        assert_eq!(
            body["pattern"]["triggerKeywords"],
            json!(["contract", "clause", "indemnity"])
        );

        let (body, _) = call_tool(
            &server,
            "optimize_prompt",
            json!({"prompt": "Review this indemnity clause in the contract", "recordAnalytics": false}),
        );
        assert_eq!(body["domain"], "legal");
        assert!(
            body["optimized"]
                .as_str()
                .unwrap()
                .starts_with("You are a senior contracts lawyer.")
        );
    }

    #[test]
    fn test_get_all() {
        let (body, _) = call_tool(&server(), "manage_patterns", json!({"action": "get"}));
        assert_eq!(body["count"], 5);
        for domain in [
            "marketing_copy",
            "data_analysis",
            "tax_accounting",
            "code_generation",
            "general",
        ] {
            assert!(body["patterns"][domain].is_object(), "missing {domain}");
        }
    }

    #[test]
    fn test_delete_requires_domain() {
        let (body, is_error) = call_tool(&server(), "manage_patterns", json!({"action": "delete"}));
        assert!(is_error);
        assert!(body["error"].as_str().unwrap().contains("domain"));
    }
}

// ============================================================================
// track_analytics
// ============================================================================

mod track_analytics {
    use super::*;

    #[test]
    fn test_record_then_query() {
        let server = server();
        for (domain, confidence) in [("data_analysis", 0.9), ("data_analysis", 0.7)] {
            let (body, is_error) = call_tool(
                &server,
                "track_analytics",
                json!({"action": "record", "data": {"domain": domain, "confidence": confidence}}),
            );
            assert!(!is_error);
            assert!(body["id"].is_string());
        }

        let (body, is_error) = call_tool(
            &server,
            "track_analytics",
            json!({"action": "query", "queryParams": {"timeRange": "today", "domain": "data_analysis"}}),
        );
        assert!(!is_error);
        assert_eq!(body["totalOptimizations"], 2);
        assert!((body["averageConfidence"].as_f64().unwrap() - 0.8).abs() < 1e-9);
        assert_eq!(body["domainBreakdown"]["data_analysis"], 2);
    }

    #[test]
    fn test_invalid_action() {
        let (body, is_error) =
            call_tool(&server(), "track_analytics", json!({"action": "export"}));
        assert!(is_error);
        assert_eq!(body["success"], false);
    }
}

// ============================================================================
// test_optimization
// ============================================================================

mod test_optimization {
    use super::*;

    #[test]
    fn test_show_diff() {
        let (body, is_error) = call_tool(
            &server(),
            "test_optimization",
            json!({"prompt": "Analyze our quarterly sales data", "showDiff": true}),
        );
        assert!(!is_error);
        assert_eq!(body["wasOptimized"], true);
        assert_eq!(body["domain"], "data_analysis");
        assert_eq!(body["comparison"]["originalLength"], 32);
        assert!(
            body["comparison"]["optimizedLength"].as_u64().unwrap()
                > body["comparison"]["originalLength"].as_u64().unwrap()
        );
    }

    #[test]
    fn test_comparison_included_by_default() {
        let (body, _) = call_tool(
            &server(),
            "test_optimization",
            json!({"prompt": "Fix this function"}),
        );
        assert_eq!(body["comparison"]["originalLength"], 17);

        let (body, _) = call_tool(
            &server(),
            "test_optimization",
            json!({"prompt": "Fix this function", "showDiff": false}),
        );
        assert!(body.get("comparison").is_none());
    }

    #[test]
    fn test_weak_match_is_still_optimized() {
        let (body, _) = call_tool(
            &server(),
            "test_optimization",
            json!({"prompt": "Read this ad"}),
        );
        assert_eq!(body["wasOptimized"], true);
    }

    #[test]
    fn test_dry_run_records_nothing() {
        let server = server();
        call_tool(
            &server,
            "test_optimization",
            json!({"prompt": "Write an email to customers"}),
        );
        let (body, _) = call_tool(
            &server,
            "track_analytics",
            json!({"action": "query", "queryParams": {"timeRange": "today"}}),
        );
        assert_eq!(body["totalOptimizations"], 0);
    }
}

// ============================================================================
// JSON-RPC errors
// ============================================================================

mod errors {
    use super::*;

    #[test]
    fn test_parse_error() {
        let response: Value = serde_json::from_str(&server().handle_request("{not json")).unwrap();
        assert_eq!(response["error"]["code"], -32700);
        assert!(response["id"].is_null());
        assert!(response.get("id").is_some());
    }

    #[test]
    fn test_invalid_request_shape() {
        let response: Value =
            serde_json::from_str(&server().handle_request(r#"{"jsonrpc":"2.0","id":1}"#)).unwrap();
        assert_eq!(response["error"]["code"], -32600);
    }

    #[test]
    fn test_oversized_request() {
        let raw = format!(
            r#"{{"jsonrpc":"2.0","id":1,"method":"ping","params":{{"pad":"{}"}}}}"#,
            "x".repeat(1024 * 1024 + 1)
        );
        let response: Value = serde_json::from_str(&server().handle_request(&raw)).unwrap();
        assert_eq!(response["error"]["code"], -32600);
    }

    #[test]
    fn test_method_not_found() {
        let response = request(&server(), 4, "resources/list", json!({}));
        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["id"], 4);
    }

    #[test]
    fn test_unknown_tool() {
        let response = request(
            &server(),
            5,
            "tools/call",
            json!({"name": "rewrite_prompt", "arguments": {}}),
        );
        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["error"]["message"], "Unknown tool: rewrite_prompt");
    }

    #[test]
    fn test_missing_tool_name() {
        let response = request(&server(), 6, "tools/call", json!({"arguments": {}}));
        assert_eq!(response["error"]["code"], -32602);
    }
}
