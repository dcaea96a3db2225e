//! Model Context Protocol server.
//!
//! Exposes the prompt optimizer as MCP tools over a hand-rolled JSON-RPC 2.0
//! dispatcher. Stdio and HTTP are thin transports over the same
//! [`McpServer::handle_request`].

// Allow unused_self for methods kept as methods for API consistency.
#![allow(clippy::unused_self)]
// Allow needless_pass_by_value for JSON Value arguments.
#![allow(clippy::needless_pass_by_value)]
// Allow unnecessary_wraps for handlers that return Result for a uniform signature.
#![allow(clippy::unnecessary_wraps)]
// Allow option_if_let_else for clearer if-let patterns.
#![allow(clippy::option_if_let_else)]

mod dispatch;
mod server;
mod tool_types;
mod tools;

pub use dispatch::McpMethod;
pub use server::{McpServer, PROTOCOL_VERSION, SERVER_NAME, Transport};
#[cfg(feature = "http")]
pub use server::router;
pub use tools::{ToolContent, ToolDefinition, ToolRegistry, ToolResult};
