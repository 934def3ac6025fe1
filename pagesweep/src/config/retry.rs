//! Retry configuration with backoff and jitter strategies.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::check_seconds;
use crate::errors::ConfigurationError;

/// Backoff strategy for retry delays.
///
/// `attempt` is the 1-based number of the attempt that just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// delay = base * attempt
    #[default]
    Linear,
    /// delay = base * 2^(attempt - 1)
    Exponential,
    /// delay = base
    Constant,
}

impl BackoffStrategy {
    /// Calculates the un-jittered delay after a failed attempt.
    #[must_use]
    pub fn delay(&self, base: Duration, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match self {
            Self::Linear => base.saturating_mul(attempt),
            Self::Exponential => {
                let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
                base.saturating_mul(factor)
            }
            Self::Constant => base,
        }
    }
}

impl std::str::FromStr for BackoffStrategy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            "constant" => Ok(Self::Constant),
            other => Err(ConfigurationError::new(
                "backoff_strategy",
                format!("unknown strategy '{other}'"),
            )
            .with_fix_hint("use linear, exponential or constant")),
        }
    }
}

/// Jitter strategy to spread retries from concurrent pages apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter; delays are exactly what the backoff strategy says.
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
}

impl JitterStrategy {
    /// Applies jitter to a delay.
    #[must_use]
    pub fn apply(&self, delay: Duration) -> Duration {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        match self {
            Self::None => delay,
            Self::Full => {
                if millis == 0 {
                    delay
                } else {
                    Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
                }
            }
            Self::Equal => {
                let half = millis / 2;
                if half == 0 {
                    delay
                } else {
                    Duration::from_millis(half + rand::thread_rng().gen_range(0..=half))
                }
            }
        }
    }
}

/// Configuration for retrying failed page fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum attempts per page, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay between attempts, in seconds.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_seconds: f64,
    /// How the delay grows with each attempt.
    #[serde(default)]
    pub backoff_strategy: BackoffStrategy,
    /// Randomization applied on top of the backoff.
    #[serde(default)]
    pub jitter: JitterStrategy,
    /// Upper bound on any single delay, in seconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_seconds: f64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base() -> f64 {
    2.0
}

fn default_max_backoff() -> f64 {
    30.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_seconds: default_backoff_base(),
            backoff_strategy: BackoffStrategy::default(),
            jitter: JitterStrategy::default(),
            max_backoff_seconds: default_max_backoff(),
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base_seconds = base.as_secs_f64();
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff_strategy = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter = strategy;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff_seconds = max.as_secs_f64();
        self
    }

    /// Base delay as a Duration.
    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs_f64(self.backoff_base_seconds)
    }

    /// Delay cap as a Duration.
    #[must_use]
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs_f64(self.max_backoff_seconds)
    }

    /// Calculates the wait after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .backoff_strategy
            .delay(self.backoff_base(), attempt)
            .min(self.max_backoff());
        self.jitter.apply(delay)
    }

    /// Checks that the retry settings are usable.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_attempts == 0 {
            return Err(ConfigurationError::not_positive("max_attempts")
                .with_fix_hint("use 1 to disable retries"));
        }
        check_seconds("backoff_base_seconds", self.backoff_base_seconds)?;
        check_seconds("max_backoff_seconds", self.max_backoff_seconds)?;
        Ok(())
    }
}
