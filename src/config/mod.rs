//! Configuration management.
//!
//! Configuration is layered: built-in defaults, then a TOML file, then
//! environment variables (after `.env` is loaded).

mod scoring;

pub use scoring::{ConfidenceConfig, ScoringConfig, ScoringMode};

use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Pattern store endpoint variable.
pub const ENV_PATTERNS_ENDPOINT: &str = "PATTERNS_API_ENDPOINT";
/// Pattern store key variable.
pub const ENV_PATTERNS_KEY: &str = "PATTERNS_API_KEY";
/// Analytics endpoint variable.
pub const ENV_ANALYTICS_ENDPOINT: &str = "ANALYTICS_API_ENDPOINT";
/// Analytics key variable.
pub const ENV_ANALYTICS_KEY: &str = "ANALYTICS_API_KEY";
/// Explicit config file path variable.
pub const ENV_CONFIG_PATH: &str = "PROMPTFORGE_CONFIG_PATH";

const ENV_CACHE_TTL: &str = "PROMPTFORGE_CACHE_TTL_SECS";
const ENV_HTTP_TIMEOUT: &str = "PROMPTFORGE_HTTP_TIMEOUT_SECS";

/// Default pattern cache lifetime.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
/// Default timeout for store and analytics calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
/// Default HTTP transport port.
pub const DEFAULT_PORT: u16 = 3000;

/// Main configuration for promptforge.
#[derive(Debug, Clone)]
pub struct PromptForgeConfig {
    /// Remote pattern store.
    pub patterns: EndpointConfig,
    /// Remote analytics table.
    pub analytics: EndpointConfig,
    /// Which analytics sink to build.
    pub analytics_backend: AnalyticsBackend,
    /// Pattern cache lifetime.
    pub cache_ttl: Duration,
    /// Timeout for every outbound HTTP call.
    pub http_timeout: Duration,
    /// Detector constants.
    pub scoring: ScoringConfig,
    /// Confidence estimator constants.
    pub confidence: ConfidenceConfig,
    /// Log output format.
    pub log_format: LogFormat,
    /// HTTP transport port.
    pub port: u16,
    /// Prometheus exporter port; disabled when unset.
    pub metrics_port: Option<u16>,
}

/// Endpoint plus credential for an external collaborator.
#[derive(Debug, Clone, Default)]
pub struct EndpointConfig {
    /// Base URL.
    pub endpoint: Option<String>,
    /// API key.
    pub api_key: Option<SecretString>,
}

impl EndpointConfig {
    /// Returns true if an endpoint is set.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.endpoint.as_deref().is_some_and(|e| !e.trim().is_empty())
    }
}

/// Analytics sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyticsBackend {
    /// HTTP when an endpoint is configured, memory otherwise.
    #[default]
    Auto,
    /// In-process only.
    Memory,
    /// Remote table; requires an endpoint.
    Http,
}

impl AnalyticsBackend {
    /// Parses a backend name.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Self::Memory,
            "http" | "remote" => Self::Http,
            _ => Self::Auto,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Pattern cache lifetime in seconds.
    pub cache_ttl_secs: Option<u64>,
    /// HTTP timeout in seconds.
    pub http_timeout_secs: Option<u64>,
    /// HTTP transport port.
    pub port: Option<u16>,
    /// Prometheus exporter port.
    pub metrics_port: Option<u16>,
    /// Log format name.
    pub log_format: Option<String>,
    /// Pattern store section.
    pub patterns: Option<ConfigFileEndpoint>,
    /// Analytics section.
    pub analytics: Option<ConfigFileAnalytics>,
    /// Scoring section.
    pub scoring: Option<ScoringConfig>,
    /// Confidence section.
    pub confidence: Option<ConfidenceConfig>,
}

/// Endpoint section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileEndpoint {
    /// Base URL.
    pub endpoint: Option<String>,
    /// API key.
    pub api_key: Option<String>,
}

/// Analytics section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileAnalytics {
    /// Base URL.
    pub endpoint: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Backend name: auto, memory, http.
    pub backend: Option<String>,
}

impl Default for PromptForgeConfig {
    fn default() -> Self {
        Self {
            patterns: EndpointConfig::default(),
            analytics: EndpointConfig::default(),
            analytics_backend: AnalyticsBackend::Auto,
            cache_ttl: DEFAULT_CACHE_TTL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            scoring: ScoringConfig::default(),
            confidence: ConfidenceConfig::default(),
            log_format: LogFormat::Pretty,
            port: DEFAULT_PORT,
            metrics_port: None,
        }
    }
}

impl PromptForgeConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the full layered configuration.
    ///
    /// File resolution order: `path`, then `PROMPTFORGE_CONFIG_PATH`, then the
    /// platform config directory. Environment overrides are applied last.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        // A missing .env is normal.
        let _ = dotenvy::dotenv();

        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::load_default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML.
    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir, then `~/.config/promptforge/`.
    /// Returns default configuration if no readable file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("promptforge").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("promptforge")
                .join("config.toml"),
        ];

        for candidate in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(candidate) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(
                        path = %candidate.display(),
                        error = %e,
                        "Ignoring unreadable config file"
                    );
                },
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `PromptForgeConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(secs) = file.cache_ttl_secs {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = file.http_timeout_secs {
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(port) = file.port {
            config.port = port;
        }
        config.metrics_port = file.metrics_port;
        if let Some(format) = file.log_format {
            config.log_format = LogFormat::parse(&format);
        }
        if let Some(patterns) = file.patterns {
            config.patterns = EndpointConfig {
                endpoint: patterns.endpoint,
                api_key: patterns.api_key.map(SecretString::from),
            };
        }
        if let Some(analytics) = file.analytics {
            if let Some(backend) = analytics.backend {
                config.analytics_backend = AnalyticsBackend::parse(&backend);
            }
            config.analytics = EndpointConfig {
                endpoint: analytics.endpoint,
                api_key: analytics.api_key.map(SecretString::from),
            };
        }
        if let Some(scoring) = file.scoring {
            config.scoring = scoring;
        }
        if let Some(confidence) = file.confidence {
            config.confidence = confidence;
        }

        config
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = get(ENV_PATTERNS_ENDPOINT) {
            self.patterns.endpoint = Some(endpoint);
        }
        if let Some(key) = get(ENV_PATTERNS_KEY) {
            self.patterns.api_key = Some(SecretString::from(key));
        }
        if let Some(endpoint) = get(ENV_ANALYTICS_ENDPOINT) {
            self.analytics.endpoint = Some(endpoint);
        }
        if let Some(key) = get(ENV_ANALYTICS_KEY) {
            self.analytics.api_key = Some(SecretString::from(key));
        }
        if let Some(secs) = get(ENV_CACHE_TTL).and_then(|v| parse_env(ENV_CACHE_TTL, &v)) {
            self.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = get(ENV_HTTP_TIMEOUT).and_then(|v| parse_env(ENV_HTTP_TIMEOUT, &v)) {
            self.http_timeout = Duration::from_secs(secs);
        }
        if let Some(format) = get("PROMPTFORGE_LOG_FORMAT") {
            self.log_format = LogFormat::parse(&format);
        }
        if let Some(port) = get("PORT").and_then(|v| parse_env("PORT", &v)) {
            self.port = port;
        }
    }

    /// Returns the names of external-service variables that are not set.
    ///
    /// An empty list means both the pattern store and the analytics sink are
    /// fully configured.
    #[must_use]
    pub fn validate_environment(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.patterns.is_configured() {
            missing.push(ENV_PATTERNS_ENDPOINT);
        }
        if self.patterns.api_key.is_none() {
            missing.push(ENV_PATTERNS_KEY);
        }
        if !self.analytics.is_configured() {
            missing.push(ENV_ANALYTICS_ENDPOINT);
        }
        if self.analytics.api_key.is_none() {
            missing.push(ENV_ANALYTICS_KEY);
        }
        missing
    }

    /// Sets the cache lifetime.
    #[must_use]
    pub const fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the scoring constants.
    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value, "Ignoring unparseable environment override");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PromptForgeConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.port, 3000);
        assert_eq!(config.analytics_backend, AnalyticsBackend::Auto);
        assert_eq!(config.validate_environment().len(), 4);
    }

    #[test]
    fn test_from_toml() {
        let config = PromptForgeConfig::from_toml(
            r#"
            cache_ttl_secs = 60
            log_format = "json"

            [patterns]
            endpoint = "https://store.example/b/123"
            api_key = "k"

            [analytics]
            backend = "memory"

            [scoring]
            mode = "ratio"
            "#,
        )
        .unwrap();

        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.patterns.is_configured());
        assert_eq!(config.patterns.api_key.as_ref().unwrap().expose_secret(), "k");
        assert_eq!(config.analytics_backend, AnalyticsBackend::Memory);
        assert_eq!(config.scoring.mode, ScoringMode::Ratio);
        assert_eq!(
            config.validate_environment(),
            vec![ENV_ANALYTICS_ENDPOINT, ENV_ANALYTICS_KEY]
        );
    }

    #[test]
    fn test_invalid_toml() {
        assert!(PromptForgeConfig::from_toml("cache_ttl_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = 8080\n").unwrap();
        let config = PromptForgeConfig::load_from_file(&path).unwrap();
        assert_eq!(config.port, 8080);

        assert!(PromptForgeConfig::load_from_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_ANALYTICS_ENDPOINT, "https://db.example/rest/v1/optimizations"),
            (ENV_ANALYTICS_KEY, "secret"),
            ("PROMPTFORGE_CACHE_TTL_SECS", "10"),
            ("PROMPTFORGE_HTTP_TIMEOUT_SECS", "not-a-number"),
            ("PORT", "9000"),
            (ENV_PATTERNS_ENDPOINT, "  "),
        ]);

        let mut config = PromptForgeConfig::default();
        config.apply_env(|key| env.get(key).map(|v| (*v).to_string()));

        assert!(config.analytics.is_configured());
        assert_eq!(config.cache_ttl, Duration::from_secs(10));
        assert_eq!(config.http_timeout, DEFAULT_HTTP_TIMEOUT);
        assert_eq!(config.port, 9000);
        assert!(!config.patterns.is_configured());
    }
}
