//! Error types for pagesweep.
//!
//! Only configuration errors abort a sweep. Per-attempt fetch failures are
//! carried as [`FailureReason`] values inside a fetch outcome and absorbed at
//! the page level, so they never surface as `Err` from the engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The main error type for pagesweep operations.
#[derive(Debug, Error)]
pub enum PagesweepError {
    /// The sweep was misconfigured; raised before any fetch.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// Exporting the aggregated records failed.
    #[error("{0}")]
    Sink(#[from] SinkError),

    /// A fetch transport could not be started (e.g. the browser failed to launch).
    #[error("Transport error: {0}")]
    Transport(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised when a sweep configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid configuration for '{field}': {message}")]
pub struct ConfigurationError {
    /// The offending configuration field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
}

impl ConfigurationError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            fix_hint: None,
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Shorthand for a field that must be at least one.
    #[must_use]
    pub fn not_positive(field: impl Into<String>) -> Self {
        Self::new(field, "must be a positive integer")
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("field".to_string(), serde_json::Value::String(self.field.clone()));
        map.insert("message".to_string(), serde_json::Value::String(self.message.clone()));
        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::Value::String(hint.clone()));
        }
        map
    }
}

/// Errors raised while exporting records.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing to the destination failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV writer rejected a row.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The blocking export task panicked or was cancelled.
    #[error("Export task failed: {0}")]
    Task(String),
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Classification of a single failed fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "status")]
pub enum FailureKind {
    /// The fetch did not complete within its timeout.
    Timeout,
    /// Connection refused, reset, or the body could not be read.
    Transport,
    /// The server answered with a non-success status.
    HttpStatus(u16),
    /// The browser failed to open a tab or navigate.
    Navigation,
    /// The request itself is malformed (e.g. page zero).
    InvalidRequest,
    /// The sweep was cancelled before the attempt could finish.
    Cancelled,
    /// The page task panicked or was aborted.
    Aborted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Transport => write!(f, "transport"),
            Self::HttpStatus(code) => write!(f, "http {code}"),
            Self::Navigation => write!(f, "navigation"),
            Self::InvalidRequest => write!(f, "invalid request"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Why a fetch attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    /// The failure class.
    pub kind: FailureKind,
    /// Human readable detail from the transport.
    pub message: String,
}

impl FailureReason {
    /// Creates a new failure reason.
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A timeout after the given number of milliseconds.
    #[must_use]
    pub fn timeout(after_ms: u128) -> Self {
        Self::new(FailureKind::Timeout, format!("timed out after {after_ms}ms"))
    }

    /// A transport level failure.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message)
    }

    /// A non-success HTTP status.
    #[must_use]
    pub fn http_status(status: u16) -> Self {
        Self::new(FailureKind::HttpStatus(status), format!("server returned HTTP {status}"))
    }

    /// A browser navigation failure.
    #[must_use]
    pub fn navigation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Navigation, message)
    }

    /// A malformed request.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidRequest, message)
    }

    /// The attempt was abandoned because the sweep was cancelled.
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Cancelled, message)
    }

    /// The page task died before producing an outcome.
    #[must_use]
    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Aborted, message)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
