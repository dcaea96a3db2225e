//! Structured logging configuration.
//!
//! Logs always go to stderr; stdout is reserved for protocol messages and
//! command output.

use crate::config::LogFormat;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVE: &str = "promptforge=info";

/// Filter used with `--verbose`.
const VERBOSE_DIRECTIVE: &str = "promptforge=debug";

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Fallback filter directive, used when `RUST_LOG` is unset.
    pub directive: String,
}

impl LoggingConfig {
    /// Builds logging configuration for the given format and verbosity.
    #[must_use]
    pub fn new(format: LogFormat, verbose: bool) -> Self {
        let directive = if verbose {
            VERBOSE_DIRECTIVE
        } else {
            DEFAULT_DIRECTIVE
        };
        Self {
            format,
            directive: directive.to_string(),
        }
    }

    /// Returns the effective filter: `RUST_LOG` if valid, else the directive.
    #[must_use]
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.directive))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new(LogFormat::default(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives() {
        assert_eq!(LoggingConfig::default().directive, "promptforge=info");
        assert_eq!(
            LoggingConfig::new(LogFormat::Json, true).directive,
            "promptforge=debug"
        );
    }
}
