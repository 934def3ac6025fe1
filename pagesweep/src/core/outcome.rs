//! Fetch outcome type with factory methods.

use serde::{Deserialize, Serialize};

use crate::errors::FailureReason;

/// The result of a single fetch attempt.
///
/// Fetchers never return `Err`; every way an attempt can end is one of
/// these three variants, and the retry policy decides what happens next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The page was fetched; `markup` is the rendered document.
    Success {
        /// Raw page markup.
        markup: String,
    },
    /// The attempt failed in a way that may succeed if repeated.
    RetryableFailure {
        /// Why the attempt failed.
        reason: FailureReason,
    },
    /// The attempt failed and repeating it cannot help.
    FatalFailure {
        /// Why the attempt failed.
        reason: FailureReason,
    },
}

impl FetchOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn success(markup: impl Into<String>) -> Self {
        Self::Success {
            markup: markup.into(),
        }
    }

    /// Creates a retryable failure.
    #[must_use]
    pub fn retryable(reason: FailureReason) -> Self {
        Self::RetryableFailure { reason }
    }

    /// Creates a fatal failure.
    #[must_use]
    pub fn fatal(reason: FailureReason) -> Self {
        Self::FatalFailure { reason }
    }

    /// Whether the attempt succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Whether the attempt may be repeated.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetryableFailure { .. })
    }

    /// Whether the attempt must not be repeated.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalFailure { .. })
    }

    /// The failure reason, if the attempt failed.
    #[must_use]
    pub fn reason(&self) -> Option<&FailureReason> {
        match self {
            Self::Success { .. } => None,
            Self::RetryableFailure { reason } | Self::FatalFailure { reason } => Some(reason),
        }
    }

    /// The markup, if the attempt succeeded.
    #[must_use]
    pub fn markup(&self) -> Option<&str> {
        match self {
            Self::Success { markup } => Some(markup),
            _ => None,
        }
    }

    /// Short label used in logs and events.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::RetryableFailure { .. } => "retryable_failure",
            Self::FatalFailure { .. } => "fatal_failure",
        }
    }
}
