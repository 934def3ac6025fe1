//! Testing utilities for sweeps.
//!
//! This module provides:
//! - A scripted fetcher that counts calls and measures concurrency
//! - Listing page fixtures with a matching extractor

mod fetcher;
mod fixtures;

pub use fetcher::ScriptedFetcher;
pub use fixtures::{fixed_records, listing_extractor, listing_markup};
