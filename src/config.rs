//! Pipeline configuration.
//!
//! Values are resolved as defaults, then an optional YAML file (path from
//! `GEN_CONFIG_PATH`), then `GEN_*` environment variables.

use crate::cache::DEFAULT_REQUEST_TTL;
use crate::error::ErrorContext;
use crate::generation::DEFAULT_RESPONSE_MEMO_CAPACITY;
use crate::guardrails::DEFAULT_MAX_PROMPT_LENGTH;
use crate::logging::LogLevel;
use crate::queue::MAX_TASK_ATTEMPTS;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "GEN_CONFIG_PATH";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub log_level: LogLevel,
    pub queue_path: PathBuf,
    pub history_path: PathBuf,
    pub backend_url: String,
    /// Bearer token for the backend proxy. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub http_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub max_task_attempts: u32,
    pub response_memo_capacity: usize,
    pub max_prompt_length: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            queue_path: PathBuf::from(".genpipe/queue.json"),
            history_path: PathBuf::from(".genpipe/history.jsonl"),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            api_key: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            cache_ttl_secs: DEFAULT_REQUEST_TTL.as_secs(),
            max_task_attempts: MAX_TASK_ATTEMPTS,
            response_memo_capacity: DEFAULT_RESPONSE_MEMO_CAPACITY,
            max_prompt_length: DEFAULT_MAX_PROMPT_LENGTH,
        }
    }
}

fn config_error(field: &str, details: impl Into<String>) -> Error {
    Error::configuration_with_context(
        format!("invalid value for {}", field),
        ErrorContext::new()
            .with_field_path(format!("config.{}", field))
            .with_details(details)
            .with_source("config_loader"),
    )
}

fn parse_env<T: FromStr>(field: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| config_error(field, format!("{:?}: {}", raw, e)))
}

impl PipelineConfig {
    /// Resolve configuration from the process environment.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_yaml_file(path.trim())?,
            _ => Self::default(),
        };
        config.apply_env_with(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                "failed to parse configuration YAML",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_loader"),
            )
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read config file {}", path.display()),
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("config_loader"),
            )
        })?;
        Self::from_yaml_str(&text)
    }

    /// Overlay `GEN_*` variables using `lookup` as the environment.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("GEN_LOG_LEVEL") {
            self.log_level = parse_env("log_level", &v)?;
        }
        if let Some(v) = lookup("GEN_QUEUE_PATH") {
            self.queue_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("GEN_HISTORY_PATH") {
            self.history_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("GEN_BACKEND_URL") {
            self.backend_url = v.trim().to_string();
        }
        if let Some(v) = lookup("GEN_API_KEY") {
            self.api_key = Some(v).filter(|k| !k.trim().is_empty());
        }
        if let Some(v) = lookup("GEN_HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = parse_env("http_timeout_secs", &v)?;
        }
        if let Some(v) = lookup("GEN_CACHE_TTL_SECS") {
            self.cache_ttl_secs = parse_env("cache_ttl_secs", &v)?;
        }
        if let Some(v) = lookup("GEN_MAX_TASK_ATTEMPTS") {
            self.max_task_attempts = parse_env("max_task_attempts", &v)?;
        }
        if let Some(v) = lookup("GEN_RESPONSE_MEMO_CAPACITY") {
            self.response_memo_capacity = parse_env("response_memo_capacity", &v)?;
        }
        if let Some(v) = lookup("GEN_MAX_PROMPT_LENGTH") {
            self.max_prompt_length = parse_env("max_prompt_length", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.backend_url)
            .map_err(|e| config_error("backend_url", e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(config_error(
                "backend_url",
                format!("unsupported scheme {}", url.scheme()),
            ));
        }
        let positive = [
            ("http_timeout_secs", self.http_timeout_secs),
            ("cache_ttl_secs", self.cache_ttl_secs),
            ("max_task_attempts", u64::from(self.max_task_attempts)),
            ("response_memo_capacity", self.response_memo_capacity as u64),
            ("max_prompt_length", self.max_prompt_length as u64),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(config_error(field, "must be greater than zero"));
            }
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_carry_fixed_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(24 * 60 * 60));
        assert_eq!(config.max_task_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_overrides_only_named_fields() {
        let config = PipelineConfig::from_yaml_str(
            "backend_url: https://proxy.example.com/v1\nmax_task_attempts: 5\nlog_level: debug\n",
        )
        .unwrap();
        assert_eq!(config.backend_url, "https://proxy.example.com/v1");
        assert_eq!(config.max_task_attempts, 5);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.max_prompt_length, DEFAULT_MAX_PROMPT_LENGTH);
    }

    #[test]
    fn test_env_overrides_yaml() {
        let mut config = PipelineConfig::from_yaml_str("http_timeout_secs: 10\n").unwrap();
        config
            .apply_env_with(env(&[
                ("GEN_HTTP_TIMEOUT_SECS", "25"),
                ("GEN_API_KEY", "sk-test"),
                ("GEN_QUEUE_PATH", "/tmp/q.json"),
            ]))
            .unwrap();
        assert_eq!(config.http_timeout(), Duration::from_secs(25));
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.queue_path, PathBuf::from("/tmp/q.json"));
    }

    #[test]
    fn test_bad_env_value_names_the_field() {
        let mut config = PipelineConfig::default();
        let err = config
            .apply_env_with(env(&[("GEN_CACHE_TTL_SECS", "soon")]))
            .unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("config.cache_ttl_secs")
        );
    }

    #[test]
    fn test_validation_rejects_bad_url_and_zero_values() {
        let mut config = PipelineConfig {
            backend_url: "not a url".into(),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        config.backend_url = "ftp://example.com".into();
        assert!(config.validate().is_err());

        config.backend_url = DEFAULT_BACKEND_URL.into();
        config.max_task_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let config = PipelineConfig {
            api_key: Some("sk-secret".into()),
            ..PipelineConfig::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("sk-secret"));
    }
}
