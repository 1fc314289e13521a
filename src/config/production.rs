/// Deployment configuration
///
/// Settings for the search backend, the completion service, search
/// execution defaults and the HTTP server. Values come from the
/// environment with defaults for everything except credentials.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Full application configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Search backend connection
    pub splunk: SplunkConfig,

    /// Completion service
    pub llm: LlmConfig,

    /// Search execution defaults
    pub search: SearchConfig,

    /// HTTP server
    pub server: ServerConfig,

    /// Default log filter when RUST_LOG is unset
    pub log_level: String,

    pub debug: bool,
}

/// Search backend connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SplunkConfig {
    pub host: String,

    /// Management port
    pub port: u16,

    /// http or https
    pub scheme: String,

    pub username: String,

    #[serde(skip_serializing)]
    pub password: String,

    /// Bearer token; takes precedence over username/password
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Verify the backend's TLS certificate
    pub verify_tls: bool,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
}

/// Completion service settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip_serializing)]
    pub api_key: String,

    pub model: String,

    pub base_url: String,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    pub temperature: f32,

    /// Output token budget for translation
    pub translate_max_tokens: u32,

    /// Output token budget for enhancement
    pub enhance_max_tokens: u32,
}

/// Search execution defaults
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    pub default_max_results: usize,

    /// Default search timeout (seconds)
    pub default_timeout_secs: u64,

    /// Job status polling interval (milliseconds)
    pub poll_interval_ms: u64,

    /// Environment context time-to-live (seconds)
    pub context_ttl_secs: u64,
}

/// HTTP server settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            splunk: SplunkConfig::default(),
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            server: ServerConfig::default(),
            log_level: "info".to_string(),
            debug: false,
        }
    }
}

impl Default for SplunkConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8089,
            scheme: "https".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            token: None,
            verify_tls: false,
            request_timeout_secs: 30,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            request_timeout_secs: 60,
            temperature: 0.1,
            translate_max_tokens: 500,
            enhance_max_tokens: 300,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_max_results: 100,
            default_timeout_secs: 60,
            poll_interval_ms: 1000,
            context_ttl_secs: 300,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl SplunkConfig {
    /// Base URL of the management API, e.g. https://localhost:8089
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn has_credentials(&self) -> bool {
        self.token.as_deref().map_or(false, |t| !t.is_empty())
            || (!self.username.is_empty() && !self.password.is_empty())
    }
}

impl LlmConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SearchConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn context_ttl(&self) -> Duration {
        Duration::from_secs(self.context_ttl_secs)
    }
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(default)
        };

        Self {
            splunk: SplunkConfig {
                host: lookup("SPLUNK_HOST").unwrap_or(defaults.splunk.host),
                port: parse_var(lookup("SPLUNK_PORT")).unwrap_or(defaults.splunk.port),
                scheme: lookup("SPLUNK_SCHEME").unwrap_or(defaults.splunk.scheme),
                username: lookup("SPLUNK_USERNAME").unwrap_or(defaults.splunk.username),
                password: lookup("SPLUNK_PASSWORD").unwrap_or(defaults.splunk.password),
                token: lookup("SPLUNK_TOKEN").filter(|t| !t.is_empty()),
                verify_tls: flag("SPLUNK_VERIFY_TLS", defaults.splunk.verify_tls),
                request_timeout_secs: parse_var(lookup("SPLUNK_REQUEST_TIMEOUT"))
                    .unwrap_or(defaults.splunk.request_timeout_secs),
            },
            llm: LlmConfig {
                api_key: lookup("OPENAI_API_KEY").unwrap_or(defaults.llm.api_key),
                model: lookup("OPENAI_MODEL").unwrap_or(defaults.llm.model),
                base_url: lookup("OPENAI_BASE_URL").unwrap_or(defaults.llm.base_url),
                ..defaults.llm
            },
            search: SearchConfig {
                default_max_results: parse_var(lookup("SEARCH_DEFAULT_MAX_RESULTS"))
                    .unwrap_or(defaults.search.default_max_results),
                poll_interval_ms: parse_var(lookup("SEARCH_POLL_INTERVAL_MS"))
                    .unwrap_or(defaults.search.poll_interval_ms),
                context_ttl_secs: parse_var(lookup("CONTEXT_CACHE_TTL_SECS"))
                    .unwrap_or(defaults.search.context_ttl_secs),
                ..defaults.search
            },
            server: ServerConfig {
                host: lookup("API_HOST").unwrap_or(defaults.server.host),
                port: parse_var(lookup("API_PORT")).unwrap_or(defaults.server.port),
            },
            log_level: lookup("LOG_LEVEL")
                .map(|l| l.to_lowercase())
                .unwrap_or(defaults.log_level),
            debug: flag("DEBUG", defaults.debug),
        }
    }

    /// Check that required settings are present
    pub fn validate(&self) -> EngineResult<()> {
        let mut missing = Vec::new();
        if self.splunk.host.trim().is_empty() {
            missing.push("SPLUNK_HOST");
        }
        if self.llm.api_key.trim().is_empty() {
            missing.push("OPENAI_API_KEY");
        }
        if !missing.is_empty() {
            return Err(EngineError::config(format!(
                "Missing required configuration: {}",
                missing.join(", ")
            )));
        }

        if !self.splunk.has_credentials() {
            return Err(EngineError::config(
                "Either SPLUNK_TOKEN or SPLUNK_USERNAME/SPLUNK_PASSWORD must be provided",
            ));
        }

        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.splunk.base_url(), "https://localhost:8089");
        assert_eq!(config.llm.model, "gpt-4");
        assert_eq!(config.search.context_ttl(), Duration::from_secs(300));
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_env_overrides_and_bad_numbers() {
        let config = config_from(&[
            ("SPLUNK_HOST", "splunk.internal"),
            ("SPLUNK_PORT", "not-a-port"),
            ("SPLUNK_TOKEN", "abc"),
            ("API_PORT", "9000"),
            ("LOG_LEVEL", "DEBUG"),
            ("DEBUG", "True"),
            ("SEARCH_DEFAULT_MAX_RESULTS", "250"),
        ]);
        assert_eq!(config.splunk.host, "splunk.internal");
        assert_eq!(config.splunk.port, 8089);
        assert_eq!(config.splunk.token.as_deref(), Some("abc"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.log_level, "debug");
        assert!(config.debug);
        assert_eq!(config.search.default_max_results, 250);
    }

    #[test]
    fn test_validate() {
        let config = config_from(&[]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let config = config_from(&[("OPENAI_API_KEY", "sk-test")]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SPLUNK_TOKEN"));

        let config = config_from(&[("OPENAI_API_KEY", "sk-test"), ("SPLUNK_PASSWORD", "changeme")]);
        assert!(config.validate().is_ok());
    }
}
