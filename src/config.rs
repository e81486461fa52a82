//! Configuration loading for the DocuChat client
//!
//! Centralizes environment variable reading into a single struct that is
//! built once at start-up and never mutated afterwards.

use crate::constants::{
    DEFAULT_API_BASE, DEFAULT_HEALTH_INTERVAL_SECS, DEFAULT_K, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RERANK, DEFAULT_TEMPERATURE,
};

/// Client configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Backend base URL (no trailing slash)
    pub api_base: String,

    /// Transport timeout for chat requests (seconds)
    pub request_timeout_secs: u64,

    /// Interval between health checks (seconds)
    pub health_interval_secs: u64,

    /// Initial retrieval breadth shown in the form
    pub default_k: u32,

    /// Initial temperature shown in the form
    pub default_temperature: f64,

    /// Initial rerank toggle
    pub default_rerank: bool,

    /// Directory for the JSON log file
    pub log_dir: String,

    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Log to the console instead of the log file
    pub console_logs: bool,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base = lookup("DOCUCHAT_API_BASE")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            api_base,
            request_timeout_secs: lookup("DOCUCHAT_REQUEST_TIMEOUT_S")
                .and_then(|s| s.trim().parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            health_interval_secs: lookup("DOCUCHAT_HEALTH_INTERVAL_S")
                .and_then(|s| s.trim().parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_HEALTH_INTERVAL_SECS),
            default_k: lookup("DOCUCHAT_K")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_K),
            default_temperature: lookup("DOCUCHAT_TEMPERATURE")
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|t| t.is_finite())
                .unwrap_or(DEFAULT_TEMPERATURE),
            default_rerank: lookup("DOCUCHAT_RERANK")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(DEFAULT_RERANK),
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "./logs".to_string()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            console_logs: lookup("CONSOLE_LOGS").is_some() || lookup("DEVELOPMENT").is_some(),
        }
    }

    /// Build a summary string for display
    pub fn summary(&self) -> String {
        format!(
            "API={}  TIMEOUT={}s  LOG_DIR={}",
            self.api_base, self.request_timeout_secs, self.log_dir
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = config_from(&[]);

        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.health_interval_secs, DEFAULT_HEALTH_INTERVAL_SECS);
        assert_eq!(config.default_k, DEFAULT_K);
        assert_eq!(config.default_temperature, DEFAULT_TEMPERATURE);
        assert!(config.default_rerank);
        assert_eq!(config.log_dir, "./logs");
        assert_eq!(config.log_level, "info");
        assert!(!config.console_logs);
    }

    #[test]
    fn test_config_from_env_has_values() {
        // Other env vars might be set in CI; only check sanity here
        let config = Config::from_env();
        assert!(!config.api_base.is_empty());
        assert!(config.request_timeout_secs > 0);
        assert!(config.health_interval_secs > 0);
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        let config = config_from(&[("DOCUCHAT_API_BASE", "http://rag.internal:9000/")]);
        assert_eq!(config.api_base, "http://rag.internal:9000");
    }

    #[test]
    fn test_blank_api_base_falls_back() {
        let config = config_from(&[("DOCUCHAT_API_BASE", "   ")]);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = config_from(&[
            ("DOCUCHAT_REQUEST_TIMEOUT_S", "soon"),
            ("DOCUCHAT_HEALTH_INTERVAL_S", "0"),
            ("DOCUCHAT_K", "many"),
            ("DOCUCHAT_TEMPERATURE", "NaN"),
        ]);

        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.health_interval_secs, DEFAULT_HEALTH_INTERVAL_SECS);
        assert_eq!(config.default_k, DEFAULT_K);
        assert_eq!(config.default_temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    fn test_form_defaults_override() {
        let config = config_from(&[
            ("DOCUCHAT_K", "10"),
            ("DOCUCHAT_TEMPERATURE", "0.7"),
            ("DOCUCHAT_RERANK", "off"),
        ]);

        assert_eq!(config.default_k, 10);
        assert_eq!(config.default_temperature, 0.7);
        assert!(!config.default_rerank);
    }

    #[test]
    fn test_console_logs_flag() {
        assert!(config_from(&[("CONSOLE_LOGS", "1")]).console_logs);
        assert!(config_from(&[("DEVELOPMENT", "")]).console_logs);
    }

    #[test]
    fn test_config_summary() {
        let config = config_from(&[
            ("DOCUCHAT_API_BASE", "http://localhost:8000"),
            ("LOG_DIR", "/tmp/docuchat"),
        ]);

        let summary = config.summary();
        assert!(summary.contains("API=http://localhost:8000"));
        assert!(summary.contains("TIMEOUT=120s"));
        assert!(summary.contains("LOG_DIR=/tmp/docuchat"));
    }
}
