use std::sync::Arc;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "request.topic", "config.backend_url")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected bound, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "sanitizer", "config_loader")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the generation pipeline.
///
/// The type is `Clone` so that a single failed upstream call can be handed to every
/// caller that was coalesced onto it; non-clonable sources are held behind `Arc`.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Network error: {message}{}", format_status(.status_code))]
    Network {
        message: String,
        status_code: Option<u16>,
        retryable: bool,
        /// Message of the originating error, if any.
        cause: Option<String>,
    },

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Serialization error: {0}")]
    Serialization(Arc<serde_json::Error>),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(Arc::new(e))
    }
}

impl Error {
    /// Build a network-classified error.
    ///
    /// `retryable` is derived from the status code (5xx, 408, 429) or, failing that,
    /// from the originating error text (timeouts, connection resets, DNS lookups).
    pub fn network(
        message: impl Into<String>,
        original: Option<&str>,
        status_code: Option<u16>,
    ) -> Self {
        let retryable = match status_code {
            Some(status) => is_retryable_status(status),
            None => original.map(is_retryable_cause).unwrap_or(false),
        };
        Error::Network {
            message: message.into(),
            status_code,
            retryable,
            cause: original.map(str::to_string),
        }
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse {
            message: msg.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage {
            message: msg.into(),
        }
    }

    /// True for errors tagged as network failures by this crate's own network layer.
    pub fn is_network_error(&self) -> bool {
        matches!(self, Error::Network { .. })
    }

    /// The explicit `retryable` tag, if this is a network error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network { retryable: true, .. })
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Short type name used when errors are logged in reduced form.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "ValidationError",
            Error::Network { .. } => "NetworkError",
            Error::Timeout(_) => "TimeoutError",
            Error::Parse { .. } => "ParseError",
            Error::Storage { .. } => "StorageError",
            Error::Configuration { .. } => "ConfigurationError",
            Error::Runtime { .. } => "RuntimeError",
            Error::Io(_) => "IoError",
            Error::Serialization(_) => "SerializationError",
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::Validation { context, .. }
            | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }
}

pub(crate) fn is_retryable_status(status: u16) -> bool {
    status >= 500 || status == 408 || status == 429
}

fn is_retryable_cause(text: &str) -> bool {
    let t = text.to_lowercase();
    t.contains("timeout")
        || t.contains("timed out")
        || t.contains("econnreset")
        || t.contains("connection reset")
        || t.contains("enotfound")
        || t.contains("dns")
}
