//! Record extraction.
//!
//! An [`ExtractionStrategy`] turns rendered page markup into records. It is
//! pure: no I/O, and malformed or missing fields give empty values instead
//! of errors. An empty result for a page is how the end of a catalog shows
//! up, so strategies must not invent records for unrelated markup.

mod css;
pub mod presets;

pub use css::{CssExtractor, FieldSource, FieldSpec};
pub use presets::SitePreset;

use crate::core::Record;

/// Site-specific transformation from markup to records.
pub trait ExtractionStrategy: Send + Sync {
    /// Extracts the records on one page, in document order.
    fn extract(&self, markup: &str) -> Vec<Record>;
}

impl<F> ExtractionStrategy for F
where
    F: Fn(&str) -> Vec<Record> + Send + Sync,
{
    fn extract(&self, markup: &str) -> Vec<Record> {
        self(markup)
    }
}
