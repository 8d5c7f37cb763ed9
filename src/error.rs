// src/error.rs

//! Unified error handling for the engine.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Transient fetch failure (network timeout, connection reset, 5xx).
    /// Eligible for retry and counted by the circuit breaker.
    #[error("Transient fetch error for {url}: {message}")]
    Transient { url: String, message: String },

    /// Client-side fetch failure (4xx, malformed URL). Never retried.
    #[error("Client fetch error for {url} (status {status:?}): {message}")]
    Client {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// Content could not be parsed or extracted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Circuit breaker is open; the origin is currently unavailable.
    #[error("Circuit open: origin currently unavailable")]
    CircuitOpen,

    /// Terminal error: all recovery paths for a content fetch failed.
    #[error("Content unavailable for {url}: {reason}")]
    ContentUnavailable { url: String, reason: String },

    /// Index refresh aborted partway; the previous index is preserved.
    #[error("Index refresh aborted, previous index preserved: {0}")]
    RefreshPartial(String),

    /// Caller-supplied operation timeout elapsed.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Create a transient fetch error.
    pub fn transient(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transient {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a client fetch error.
    pub fn client(
        url: impl Into<String>,
        status: Option<u16>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::Client {
            url: url.into(),
            status,
            message: message.to_string(),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create the terminal content-unavailable error.
    pub fn unavailable(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ContentUnavailable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error is worth retrying (and counts as evidence of
    /// origin failure for the circuit breaker).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transient { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
