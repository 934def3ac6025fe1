//! Markup and record fixtures.

use std::fmt::Write as _;

use crate::core::Record;
use crate::extract::{CssExtractor, FieldSpec};

/// The records `listing_extractor` yields for `listing_markup(page, count)`.
#[must_use]
pub fn fixed_records(page: u32, count: usize) -> Vec<Record> {
    (1..=count)
        .map(|i| {
            Record::new()
                .with("page", page.to_string())
                .with("title", format!("item {page}-{i}"))
        })
        .collect()
}

/// A listing page with `count` items. Zero items renders a "no results" page.
#[must_use]
pub fn listing_markup(page: u32, count: usize) -> String {
    let mut html = String::from("<html><body>");
    if count == 0 {
        html.push_str("<p class=\"empty\">No more results</p>");
    } else {
        html.push_str("<ul>");
        for i in 1..=count {
            let _ = write!(
                html,
                "<li class=\"item\" data-page=\"{page}\"><span class=\"title\">item {page}-{i}</span></li>"
            );
        }
        html.push_str("</ul>");
    }
    html.push_str("</body></html>");
    html
}

/// An extractor for [`listing_markup`] pages.
#[must_use]
#[allow(clippy::expect_used)]
pub fn listing_extractor() -> CssExtractor {
    CssExtractor::new(
        "li.item",
        vec![
            FieldSpec::attr("page", "", "data-page"),
            FieldSpec::text("title", ".title"),
        ],
    )
    .expect("fixture selectors are valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractionStrategy;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extractor_matches_fixed_records() {
        let records = listing_extractor().extract(&listing_markup(4, 3));
        assert_eq!(records, fixed_records(4, 3));
    }

    #[test]
    fn test_empty_listing_has_no_records() {
        assert!(listing_extractor().extract(&listing_markup(9, 0)).is_empty());
    }
}
