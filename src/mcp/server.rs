//! MCP server setup and lifecycle.
//!
//! Implements a JSON-RPC based MCP server over stdio or HTTP transport.
//!
//! - **Stdio**: newline-delimited JSON-RPC on stdin/stdout. Logs go to stderr
//!   so stdout carries protocol messages only.
//! - **HTTP**: `POST /` and `POST /mcp` accept JSON-RPC, `GET /` and
//!   `GET /health` report liveness. Requires the `http` feature.

use crate::mcp::ToolRegistry;
use crate::mcp::dispatch::McpMethod;
use crate::services::PromptOptimizer;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;
use std::time::Instant;
use tracing::info_span;

/// Maximum request size (1 MiB).
const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024;

/// MCP protocol version.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported by `initialize` and the health endpoint.
pub const SERVER_NAME: &str = "promptforge-mcp";

/// Default HTTP port.
const DEFAULT_PORT: u16 = crate::config::DEFAULT_PORT;

/// Transport type for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Standard input/output.
    #[default]
    Stdio,
    /// HTTP transport.
    Http,
}

impl Transport {
    /// Parses a transport name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for anything but `stdio` or `http`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            other => Err(Error::InvalidInput(format!(
                "invalid transport '{other}': expected stdio or http"
            ))),
        }
    }

    /// Returns the transport label used in spans and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

/// MCP server for promptforge.
pub struct McpServer {
    /// Tool registry.
    tools: ToolRegistry,
    /// Transport type.
    transport: Transport,
    /// HTTP port (if using HTTP transport).
    port: u16,
}

impl McpServer {
    /// Creates a server exposing `optimizer` through the promptforge tools.
    #[must_use]
    pub fn new(optimizer: Arc<PromptOptimizer>) -> Self {
        Self {
            tools: ToolRegistry::new(optimizer),
            transport: Transport::Stdio,
            port: DEFAULT_PORT,
        }
    }

    /// Sets the transport type.
    #[must_use]
    pub const fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the HTTP port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Returns the configured transport.
    #[must_use]
    pub const fn transport(&self) -> Transport {
        self.transport
    }

    /// Returns the tool registry.
    #[must_use]
    pub const fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Starts the MCP server and blocks until the transport closes.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to start.
    pub fn start(self) -> Result<()> {
        match self.transport {
            Transport::Stdio => self.run_stdio(),
            Transport::Http => self.run_http(),
        }
    }

    /// Runs the server over stdio.
    fn run_stdio(&self) -> Result<()> {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        let reader = BufReader::new(stdin.lock());

        tracing::info!("MCP server listening on stdio");

        for line in reader.lines() {
            let line = line.map_err(|e| Error::OperationFailed {
                operation: "read_stdin".to_string(),
                cause: e.to_string(),
            })?;

            if line.trim().is_empty() {
                continue;
            }

            let response = self.handle_request(&line);
            if response.is_empty() {
                continue;
            }

            writeln!(stdout, "{response}").map_err(|e| Error::OperationFailed {
                operation: "write_stdout".to_string(),
                cause: e.to_string(),
            })?;

            stdout.flush().map_err(|e| Error::OperationFailed {
                operation: "flush_stdout".to_string(),
                cause: e.to_string(),
            })?;
        }

        tracing::info!("stdin closed, shutting down");
        Ok(())
    }

    /// Runs the server over HTTP.
    #[cfg(feature = "http")]
    fn run_http(self) -> Result<()> {
        let port = self.port;
        let app = router(Arc::new(self));

        let rt = tokio::runtime::Runtime::new().map_err(|e| Error::OperationFailed {
            operation: "create_runtime".to_string(),
            cause: e.to_string(),
        })?;

        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        tracing::info!(port, "Starting MCP HTTP server");

        rt.block_on(async {
            let listener =
                tokio::net::TcpListener::bind(addr)
                    .await
                    .map_err(|e| Error::OperationFailed {
                        operation: "bind".to_string(),
                        cause: e.to_string(),
                    })?;

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .map_err(|e| Error::OperationFailed {
                    operation: "serve".to_string(),
                    cause: e.to_string(),
                })
        })
    }

    /// Runs the server over HTTP (feature not enabled).
    #[cfg(not(feature = "http"))]
    fn run_http(self) -> Result<()> {
        Err(Error::Configuration(
            "HTTP transport requires the 'http' feature".to_string(),
        ))
    }

    /// Handles one JSON-RPC message and returns the serialized response.
    ///
    /// Notifications produce an empty string; transports send nothing back
    /// for them.
    pub fn handle_request(&self, request: &str) -> String {
        if request.len() > MAX_REQUEST_BODY_SIZE {
            tracing::warn!(
                request_size = request.len(),
                max_size = MAX_REQUEST_BODY_SIZE,
                "Request exceeds maximum size limit"
            );
            return self.format_error(
                Value::Null,
                -32600,
                &format!(
                    "Request too large: {} bytes (max: {MAX_REQUEST_BODY_SIZE} bytes)",
                    request.len()
                ),
            );
        }

        let start = Instant::now();
        let transport_label = self.transport.as_str();

        let span = info_span!(
            "mcp.request",
            transport = transport_label,
            rpc.method = tracing::field::Empty,
            rpc.id = tracing::field::Empty,
            status = tracing::field::Empty
        );
        let _guard = span.enter();

        let mut method_label = "parse_error".to_string();
        let mut status_label = "error";

        let response = match parse_request(request) {
            Ok(req) => {
                method_label.clone_from(&req.method);
                span.record("rpc.method", method_label.as_str());
                if let Some(id) = &req.id {
                    let id_str = id.to_string();
                    span.record("rpc.id", id_str.as_str());
                }

                tracing::debug!(method = %method_label, "Processing MCP request");

                let method = McpMethod::from(req.method.as_str());
                if method.is_notification() && req.id.is_none() {
                    status_label = "notification";
                    span.record("status", status_label);
                    String::new()
                } else {
                    let result = self.dispatch_method(method, req.params);
                    status_label = if result.is_ok() { "success" } else { "error" };
                    span.record("status", status_label);
                    self.format_response(req.id.unwrap_or(Value::Null), result)
                }
            },
            Err((code, message)) => {
                span.record("status", "parse_error");
                self.format_error(Value::Null, code, &message)
            },
        };

        metrics::counter!(
            "mcp_requests_total",
            "method" => method_label.clone(),
            "transport" => transport_label,
            "status" => status_label
        )
        .increment(1);
        metrics::histogram!(
            "mcp_request_duration_ms",
            "method" => method_label,
            "transport" => transport_label
        )
        .record(start.elapsed().as_secs_f64() * 1000.0);

        response
    }

    /// Dispatches a parsed method.
    fn dispatch_method(&self, method: McpMethod, params: Option<Value>) -> DispatchResult {
        match method {
            McpMethod::Initialize => self.handle_initialize(params),
            McpMethod::ListTools => self.handle_list_tools(),
            McpMethod::CallTool => self.handle_call_tool(params),
            McpMethod::Ping | McpMethod::Initialized => Ok(serde_json::json!({})),
            McpMethod::Unknown(name) => Err((-32601, format!("Method not found: {name}"))),
        }
    }

    /// Handles the initialize method.
    fn handle_initialize(&self, _params: Option<Value>) -> DispatchResult {
        Ok(serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        }))
    }

    /// Handles tools/list.
    fn handle_list_tools(&self) -> DispatchResult {
        let tools: Vec<Value> = self
            .tools
            .list_tools()
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect();

        Ok(serde_json::json!({ "tools": tools }))
    }

    /// Handles tools/call.
    fn handle_call_tool(&self, params: Option<Value>) -> DispatchResult {
        let params = params.ok_or((-32602, "Missing params".to_string()))?;

        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or((-32602, "Missing tool name".to_string()))?;
        let tool_name = name.to_string();
        let span = info_span!("mcp.tool.call", tool.name = tool_name.as_str());
        let _guard = span.enter();
        let start = Instant::now();

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or(serde_json::json!({}));

        let (result, status_label) = match self.tools.execute(name, arguments) {
            Ok(result) => {
                let status_label = if result.is_error { "error" } else { "success" };
                (
                    Ok(serde_json::json!({
                        "content": result.content,
                        "isError": result.is_error
                    })),
                    status_label,
                )
            },
            Err(Error::UnknownTool(name)) => {
                (Err((-32601, format!("Unknown tool: {name}"))), "unknown")
            },
            Err(e) => (Err((-32603, e.to_string())), "error"),
        };

        metrics::counter!(
            "mcp_tool_calls_total",
            "tool" => tool_name.clone(),
            "status" => status_label
        )
        .increment(1);
        metrics::histogram!(
            "mcp_tool_duration_ms",
            "tool" => tool_name,
            "status" => status_label
        )
        .record(start.elapsed().as_secs_f64() * 1000.0);

        result
    }

    /// Formats a successful response.
    fn format_response(&self, id: Value, result: DispatchResult) -> String {
        match result {
            Ok(value) => {
                let response = JsonRpcResponse {
                    jsonrpc: "2.0",
                    id,
                    result: Some(value),
                    error: None,
                };
                serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string())
            },
            Err((code, message)) => self.format_error(id, code, &message),
        }
    }

    /// Formats an error response.
    fn format_error(&self, id: Value, code: i32, message: &str) -> String {
        let response = JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.to_string(),
            }),
        };
        serde_json::to_string(&response).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Parses raw text into a request, distinguishing bad JSON from a bad shape.
fn parse_request(raw: &str) -> std::result::Result<JsonRpcRequest, (i32, String)> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| (-32700, format!("Parse error: {e}")))?;
    serde_json::from_value(value).map_err(|e| (-32600, format!("Invalid request: {e}")))
}

/// Result type for method dispatch.
type DispatchResult = std::result::Result<Value, (i32, String)>;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC version (required by protocol but not used in code).
    #[serde(rename = "jsonrpc", default)]
    _jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

/// JSON-RPC response. `id` is always present, `null` when unknown.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[cfg(feature = "http")]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Builds the HTTP router over a shared server.
#[cfg(feature = "http")]
pub fn router(server: Arc<McpServer>) -> axum::Router {
    use axum::routing::get;
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    axum::Router::new()
        .route(
            "/",
            get(http_transport::handle_health).post(http_transport::handle_rpc),
        )
        .route("/mcp", axum::routing::post(http_transport::handle_rpc))
        .route("/health", get(http_transport::handle_health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

#[cfg(feature = "http")]
mod http_transport {
    use super::{McpServer, SERVER_NAME};
    use axum::{
        Json,
        extract::State,
        http::{StatusCode, header},
        response::{IntoResponse, Response},
    };
    use std::sync::Arc;

    /// JSON-RPC over HTTP. Dispatch runs on the blocking pool because store
    /// and analytics clients block.
    pub async fn handle_rpc(State(server): State<Arc<McpServer>>, body: String) -> Response {
        let dispatched = tokio::task::spawn_blocking(move || server.handle_request(&body)).await;

        match dispatched {
            Ok(response) if response.is_empty() => StatusCode::ACCEPTED.into_response(),
            Ok(response) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                response,
            )
                .into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Request handler panicked");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({
                        "jsonrpc": "2.0",
                        "id": null,
                        "error": {
                            "code": -32603,
                            "message": "Internal server error"
                        }
                    })),
                )
                    .into_response()
            },
        }
    }

    /// Liveness probe.
    pub async fn handle_health() -> impl IntoResponse {
        Json(serde_json::json!({
            "status": "healthy",
            "server": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }))
    }
}
