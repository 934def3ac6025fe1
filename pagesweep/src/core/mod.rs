//! Core data model for pagesweep.
//!
//! This module contains the fundamental types the engine passes around:
//! - URL templates, page requests and batches
//! - Fetch outcomes with factory methods
//! - Records and the sweep aggregate

mod outcome;
mod record;
mod request;

pub use outcome::FetchOutcome;
pub use record::{AggregateResult, PageRecords, Record};
pub use request::{Batch, PageRequest, UrlTemplate};
