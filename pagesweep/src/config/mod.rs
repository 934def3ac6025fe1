//! Configuration types for sweeps and transports.

mod fetch;
mod retry;
mod sweep;

pub use fetch::{BrowserFetchConfig, HttpFetchConfig};
pub use retry::{BackoffStrategy, JitterStrategy, RetryConfig};
pub use sweep::SweepConfig;

use std::time::Duration;

use crate::errors::ConfigurationError;

/// Rejects second counts that are negative, NaN, infinite or beyond `Duration`.
pub(crate) fn check_seconds(field: &str, seconds: f64) -> Result<(), ConfigurationError> {
    Duration::try_from_secs_f64(seconds).map(|_| ()).map_err(|_| {
        ConfigurationError::new(
            field,
            format!("must be a non-negative number of seconds, got {seconds}"),
        )
    })
}
