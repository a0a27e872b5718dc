use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{MeetError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:4000";
pub const DEFAULT_GRAPHQL_PATH: &str = "/graphql";
pub const DEFAULT_TOKEN_FILE: &str = ".meet/token";

/// Engagement samples are posted once per window
pub const DEFAULT_METRICS_INTERVAL_SECS: u64 = 5;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    pub sdk: SdkConfig,
    pub metrics: MetricsConfig,
    pub token_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub api_url: String,
    pub graphql_path: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Public key of the hosted video/chat service
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub interval_secs: u64,
}

impl Config {
    /// Loads `.env` (if present) and reads configuration from the environment
    ///
    /// Recognised variables:
    /// - `MEET_API_URL`: backend base URL (default: http://localhost:4000)
    /// - `MEET_GRAPHQL_PATH`: GraphQL path on the backend (default: /graphql)
    /// - `MEET_SDK_API_KEY`: hosted SDK key
    /// - `MEET_TOKEN_FILE`: where the auth token is persisted (default: .meet/token)
    /// - `MEET_METRICS_INTERVAL_SECS`: metrics period (default: 5)
    /// - `MEET_HTTP_TIMEOUT_SECS`: request timeout (default: 15)
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            backend: BackendConfig {
                api_url: non_empty("MEET_API_URL")
                    .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                graphql_path: non_empty("MEET_GRAPHQL_PATH")
                    .unwrap_or_else(|| DEFAULT_GRAPHQL_PATH.to_string()),
                timeout_secs: parse_or_default(
                    "MEET_HTTP_TIMEOUT_SECS",
                    non_empty("MEET_HTTP_TIMEOUT_SECS"),
                    DEFAULT_HTTP_TIMEOUT_SECS,
                ),
            },
            sdk: SdkConfig {
                api_key: non_empty("MEET_SDK_API_KEY"),
            },
            metrics: MetricsConfig {
                interval_secs: parse_or_default(
                    "MEET_METRICS_INTERVAL_SECS",
                    non_empty("MEET_METRICS_INTERVAL_SECS"),
                    DEFAULT_METRICS_INTERVAL_SECS,
                ),
            },
            token_file: non_empty("MEET_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE)),
        }
    }

    /// Configuration pointing at an explicit backend, everything else default
    pub fn with_api_url(api_url: &str) -> Self {
        let mut config = Self::from_lookup(|_| None);
        config.backend.api_url = api_url.trim_end_matches('/').to_string();
        config
    }

    /// Rejects a backend URL without an http(s) scheme or a relative GraphQL path
    pub fn validate(&self) -> Result<()> {
        let url = &self.backend.api_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(MeetError::InvalidConfiguration(format!(
                "backend URL must start with http:// or https://, got {:?}",
                url
            )));
        }
        if !self.backend.graphql_path.starts_with('/') {
            return Err(MeetError::InvalidConfiguration(format!(
                "GraphQL path must start with '/', got {:?}",
                self.backend.graphql_path
            )));
        }
        Ok(())
    }

    pub fn graphql_url(&self) -> String {
        format!("{}{}", self.backend.api_url, self.backend.graphql_path)
    }

    pub fn rest_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.backend.api_url, path.trim_start_matches('/'))
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics.interval_secs.max(1))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }
}

fn parse_or_default(key: &str, raw: Option<String>, default: u64) -> u64 {
    match raw {
        None => default,
        Some(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!(key = %key, value = %value, default, "Invalid number, using default");
                default
            }
        },
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
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.backend.api_url, DEFAULT_API_URL);
        assert_eq!(config.backend.graphql_path, "/graphql");
        assert_eq!(config.metrics.interval_secs, 5);
        assert_eq!(config.token_file, PathBuf::from(".meet/token"));
        assert!(config.sdk.api_key.is_none());
    }

    #[test]
    fn test_urls() {
        let config = config_from(&[("MEET_API_URL", "https://meet.example.com/")]);
        assert_eq!(config.graphql_url(), "https://meet.example.com/graphql");
        assert_eq!(config.rest_url("JoinMeeting"), "https://meet.example.com/api/JoinMeeting");
        assert_eq!(config.rest_url("/leave"), "https://meet.example.com/api/leave");
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = config_from(&[
            ("MEET_METRICS_INTERVAL_SECS", "soon"),
            ("MEET_HTTP_TIMEOUT_SECS", "30"),
        ]);
        assert_eq!(config.metrics.interval_secs, DEFAULT_METRICS_INTERVAL_SECS);
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = config_from(&[("MEET_METRICS_INTERVAL_SECS", "0")]);
        assert_eq!(config.metrics_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_validate() {
        assert!(config_from(&[]).validate().is_ok());

        let config = config_from(&[("MEET_API_URL", "meet.example.com")]);
        assert!(matches!(config.validate(), Err(MeetError::InvalidConfiguration(_))));

        let config = config_from(&[("MEET_GRAPHQL_PATH", "graphql")]);
        assert!(matches!(config.validate(), Err(MeetError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = config_from(&[("MEET_SDK_API_KEY", "  "), ("MEET_API_URL", "")]);
        assert!(config.sdk.api_key.is_none());
        assert_eq!(config.backend.api_url, DEFAULT_API_URL);
    }
}
