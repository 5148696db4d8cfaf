//! 日志模块：带级别过滤与敏感字段脱敏的结构化日志。
//!
//! # Logging Module
//!
//! Every component reports failures through a [`Logger`]. Events are emitted
//! through `tracing`, but structured payloads are first passed through
//! [`redact`] so secrets and generated content never reach a log sink.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`LogLevel`] | Five severities with a process-wide threshold |
//! | [`Logger`] | Threshold filter + redaction in front of `tracing` |
//! | [`redact`] | Recursive key-based redaction of JSON payloads |
//! | [`init`] | Seed the threshold from [`PipelineConfig`] and install tracing |
//! | [`init_tracing`] | One-time `tracing-subscriber` installation |

mod redact;

pub use redact::{error_value, is_sensitive_key, redact, REDACTED};

use crate::config::PipelineConfig;
use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Serialize};
use std::sync::Once;

/// Severity levels, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("Unknown log level: {}", other)),
        }
    }
}

static CONFIGURED_LEVEL: OnceCell<LogLevel> = OnceCell::new();

static ENV_LEVEL: Lazy<LogLevel> = Lazy::new(|| {
    std::env::var("GEN_LOG_LEVEL")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(LogLevel::Info)
});

/// Process-wide threshold: the level given to [`init`], else `GEN_LOG_LEVEL`, else `Info`.
pub fn global_level() -> LogLevel {
    CONFIGURED_LEVEL.get().copied().unwrap_or(*ENV_LEVEL)
}

/// Seed the process-wide threshold from `config` and install the subscriber.
///
/// Only the first call sets the level; returns the level in effect afterwards.
pub fn init(config: &PipelineConfig) -> LogLevel {
    let _ = CONFIGURED_LEVEL.set(config.log_level);
    init_tracing();
    global_level()
}

/// Level-filtered, redacting logger for one component.
#[derive(Debug, Clone)]
pub struct Logger {
    component: &'static str,
    min_level: LogLevel,
}

impl Logger {
    /// Logger using the process-wide threshold, see [`global_level`].
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            min_level: global_level(),
        }
    }

    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// The line that would be written for this event, or `None` if filtered out.
    pub fn render(
        &self,
        level: LogLevel,
        message: &str,
        fields: Option<&serde_json::Value>,
    ) -> Option<String> {
        if !self.enabled(level) {
            return None;
        }
        let line = match fields {
            Some(v) => format!("[{}] {} {}", self.component, message, redact(v)),
            None => format!("[{}] {}", self.component, message),
        };
        Some(line)
    }

    pub fn log(&self, level: LogLevel, message: &str, fields: Option<&serde_json::Value>) {
        let Some(line) = self.render(level, message, fields) else {
            return;
        };
        match level {
            LogLevel::Trace => tracing::trace!(component = self.component, "{}", line),
            LogLevel::Debug => tracing::debug!(component = self.component, "{}", line),
            LogLevel::Info => tracing::info!(component = self.component, "{}", line),
            LogLevel::Warn => tracing::warn!(component = self.component, "{}", line),
            LogLevel::Error => tracing::error!(component = self.component, "{}", line),
        }
    }

    pub fn debug(&self, message: &str, fields: Option<&serde_json::Value>) {
        self.log(LogLevel::Debug, message, fields);
    }

    pub fn info(&self, message: &str, fields: Option<&serde_json::Value>) {
        self.log(LogLevel::Info, message, fields);
    }

    pub fn warn(&self, message: &str, fields: Option<&serde_json::Value>) {
        self.log(LogLevel::Warn, message, fields);
    }

    pub fn error(&self, message: &str, fields: Option<&serde_json::Value>) {
        self.log(LogLevel::Error, message, fields);
    }

    /// Log an error reduced to its name and message.
    pub fn failure(&self, level: LogLevel, message: &str, err: &crate::Error) {
        let fields = serde_json::json!({ "error": error_value(err) });
        self.log(level, message, Some(&fields));
    }
}

static INIT: Once = Once::new();

/// Install a global `tracing` subscriber filtered by `RUST_LOG` (falling back to
/// [`global_level`]). Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let fallback = global_level().as_str();
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    });
}
