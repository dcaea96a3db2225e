//! Storage layer abstraction.
//!
//! Two collaborators live outside the process:
//! - **Pattern store**: the durable `{domain: Pattern}` document
//! - **Analytics sink**: the append-only table of optimization events
//!
//! Each has an in-memory implementation (local use and tests) and an HTTP
//! implementation (the deployed JSON document store and REST table).

// Allow significant_drop_tightening - guards here are held for a single clone or push.
#![allow(clippy::significant_drop_tightening)]

pub mod http;
pub mod memory;
mod traits;

pub use http::{HttpAnalyticsSink, HttpPatternStore};
pub use memory::{InMemoryAnalyticsSink, InMemoryPatternStore};
pub use traits::{AnalyticsSink, PatternStore};
