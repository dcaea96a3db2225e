//! Tool execution handlers.
//!
//! This module contains the execution logic for all MCP tools,
//! organized into submodules by concern.

mod analytics;
mod optimize;
mod patterns;

pub use analytics::execute_track_analytics;
pub use optimize::{execute_optimize_prompt, execute_test_optimization};
pub use patterns::execute_manage_patterns;
