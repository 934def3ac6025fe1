//! Page requests, URL templates and batches.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use crate::errors::ConfigurationError;

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(?:page)?\}").expect("placeholder pattern is valid"));

/// A URL with exactly one page-number placeholder.
///
/// Both `{}` and `{page}` are accepted, so templates copied from a
/// format-string style config keep working:
///
/// ```rust
/// use pagesweep::core::UrlTemplate;
///
/// let template = UrlTemplate::parse("https://books.toscrape.com/catalogue/page-{}.html")?;
/// assert_eq!(template.render(3), "https://books.toscrape.com/catalogue/page-3.html");
/// # Ok::<(), pagesweep::errors::ConfigurationError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    raw: String,
    prefix: String,
    suffix: String,
}

impl UrlTemplate {
    /// Parses a template, rejecting anything without exactly one placeholder.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ConfigurationError> {
        let raw = raw.into();
        let matches: Vec<_> = PLACEHOLDER.find_iter(&raw).collect();

        let placeholder = match matches.as_slice() {
            [only] => *only,
            [] => {
                return Err(ConfigurationError::new("url_template", "no page placeholder found")
                    .with_fix_hint("insert {} where the page number belongs"))
            }
            _ => {
                return Err(ConfigurationError::new(
                    "url_template",
                    format!("expected one page placeholder, found {}", matches.len()),
                ))
            }
        };

        Ok(Self {
            prefix: raw[..placeholder.start()].to_string(),
            suffix: raw[placeholder.end()..].to_string(),
            raw,
        })
    }

    /// Renders the URL for a page number.
    #[must_use]
    pub fn render(&self, page_number: u32) -> String {
        format!("{}{}{}", self.prefix, page_number, self.suffix)
    }

    /// Returns the template as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One page to fetch. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    page_number: u32,
    url: String,
}

impl PageRequest {
    /// Creates a request for a page, rendering its URL from the template.
    #[must_use]
    pub fn new(page_number: u32, template: &UrlTemplate) -> Self {
        Self {
            page_number,
            url: template.render(page_number),
        }
    }

    /// Creates a request for an already rendered URL.
    #[must_use]
    pub fn with_url(page_number: u32, url: impl Into<String>) -> Self {
        Self {
            page_number,
            url: url.into(),
        }
    }

    /// The page number. Pages are numbered from 1.
    #[must_use]
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// The URL to fetch.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the request can be fetched at all.
    ///
    /// Page zero never exists; fetchers answer it with a fatal failure.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.page_number >= 1 && !self.url.is_empty()
    }
}

/// A contiguous run of page requests processed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    index: usize,
    requests: Vec<PageRequest>,
}

impl Batch {
    /// Builds the batch of `size` pages starting at `start`.
    ///
    /// With a `limit`, pages past it are left out; the result can be empty
    /// when `start` is already beyond the limit.
    #[must_use]
    pub fn new(
        index: usize,
        start: u32,
        size: usize,
        limit: Option<u32>,
        template: &UrlTemplate,
    ) -> Self {
        let size = u32::try_from(size).unwrap_or(u32::MAX);
        let mut end = start.saturating_add(size);
        if let Some(limit) = limit {
            end = end.min(limit.saturating_add(1));
        }

        let requests = (start..end)
            .map(|page| PageRequest::new(page, template))
            .collect();

        Self { index, requests }
    }

    /// Zero-based position of this batch within the sweep.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The requests, in page order.
    #[must_use]
    pub fn requests(&self) -> &[PageRequest] {
        &self.requests
    }

    /// Number of pages in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether the batch holds no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// The half-open page range `[first, last + 1)`.
    #[must_use]
    pub fn page_range(&self) -> Range<u32> {
        match (self.requests.first(), self.requests.last()) {
            (Some(first), Some(last)) => first.page_number..last.page_number.saturating_add(1),
            _ => 0..0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> UrlTemplate {
        UrlTemplate::parse("http://x/p{}.html").unwrap()
    }

    #[test]
    fn test_template_renders_page_number() {
        assert_eq!(template().render(1), "http://x/p1.html");
        assert_eq!(template().render(42), "http://x/p42.html");
    }

    #[test]
    fn test_template_accepts_named_placeholder() {
        let t = UrlTemplate::parse("https://shop.test/c?q=%3Arelevance&page={page}").unwrap();
        assert_eq!(t.render(7), "https://shop.test/c?q=%3Arelevance&page=7");
    }

    #[test]
    fn test_template_requires_placeholder() {
        let err = UrlTemplate::parse("http://x/list.html").unwrap_err();
        assert_eq!(err.field, "url_template");
        assert!(err.fix_hint.is_some());
    }

    #[test]
    fn test_template_rejects_two_placeholders() {
        let err = UrlTemplate::parse("http://x/{}/p{}.html").unwrap_err();
        assert!(err.message.contains("found 2"));
    }

    #[test]
    fn test_page_request_validity() {
        assert!(PageRequest::new(1, &template()).is_valid());
        assert!(!PageRequest::new(0, &template()).is_valid());
        assert!(!PageRequest::with_url(3, "").is_valid());
    }

    #[test]
    fn test_batch_is_contiguous() {
        let batch = Batch::new(1, 3, 2, None, &template());
        let pages: Vec<u32> = batch.requests().iter().map(PageRequest::page_number).collect();
        assert_eq!(pages, vec![3, 4]);
        assert_eq!(batch.page_range(), 3..5);
        assert_eq!(batch.requests()[1].url(), "http://x/p4.html");
    }

    #[test]
    fn test_batch_truncated_at_limit() {
        let batch = Batch::new(2, 9, 5, Some(10), &template());
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.page_range(), 9..11);

        let past = Batch::new(3, 11, 5, Some(10), &template());
        assert!(past.is_empty());
        assert_eq!(past.page_range(), 0..0);
    }
}
