//! Sweep observability.
//!
//! Observers receive callbacks at every step of a sweep: batch dispatch,
//! fetch attempts, retries, page results and the final stop.

mod observer;

pub use observer::{CollectingObserver, LoggingObserver, NoOpObserver, SweepEvent, SweepObserver};
