//! Cooperative cancellation for sweeps.
//!
//! A raised token stops new batches from starting and cuts backoff, pacing
//! and permit waits short. In-flight fetches finish within their timeout.

mod token;

pub use token::CancellationToken;
