//! CSS selector based extraction.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ExtractionStrategy;
use crate::core::Record;
use crate::errors::ConfigurationError;

const LAST_CLASS: &str = "class:last";

/// Where a field's value is read from once its node is found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "from", content = "name")]
pub enum FieldSource {
    /// The node's text, trimmed and with whitespace runs collapsed.
    Text,
    /// The value of an attribute.
    Attr(String),
    /// The last token of the `class` attribute (`star-rating Three` gives `Three`).
    LastClass,
}

/// One output field of a [`CssExtractor`].
///
/// Parses from `name=selector`, `name=selector@attr` or
/// `name=selector@class:last`. An empty selector reads from the item node
/// itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name in the produced record.
    pub name: String,
    /// Selector relative to the item node; empty for the item itself.
    pub selector: String,
    /// Value source.
    pub source: FieldSource,
}

impl FieldSpec {
    /// A field holding the text of the first node matching `selector`.
    #[must_use]
    pub fn text(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            source: FieldSource::Text,
        }
    }

    /// A field holding an attribute of the first node matching `selector`.
    #[must_use]
    pub fn attr(
        name: impl Into<String>,
        selector: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            source: FieldSource::Attr(attribute.into()),
        }
    }

    /// A field holding the last class token of the first node matching `selector`.
    #[must_use]
    pub fn last_class(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
            source: FieldSource::LastClass,
        }
    }
}

fn is_source_suffix(suffix: &str) -> bool {
    !suffix.is_empty()
        && suffix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
}

impl FromStr for FieldSpec {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, rest) = s.split_once('=').ok_or_else(|| {
            ConfigurationError::new("field", format!("'{s}' has no '='"))
                .with_fix_hint("write fields as name=selector, name=selector@attr or name=selector@class:last")
        })?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigurationError::new("field", format!("'{s}' has an empty name")));
        }

        let (selector, source) = match rest.rsplit_once('@') {
            Some((selector, suffix)) if is_source_suffix(suffix) => {
                let source = if suffix == LAST_CLASS {
                    FieldSource::LastClass
                } else {
                    FieldSource::Attr(suffix.to_string())
                };
                (selector, source)
            }
            _ => (rest, FieldSource::Text),
        };

        Ok(Self {
            name: name.to_string(),
            selector: selector.trim().to_string(),
            source,
        })
    }
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.selector)?;
        match &self.source {
            FieldSource::Text => Ok(()),
            FieldSource::Attr(attr) => write!(f, "@{attr}"),
            FieldSource::LastClass => write!(f, "@{LAST_CLASS}"),
        }
    }
}

fn compile(field: &str, selector: &str) -> Result<Selector, ConfigurationError> {
    Selector::parse(selector)
        .map_err(|e| ConfigurationError::new(field, format!("invalid selector '{selector}': {e}")))
}

#[derive(Debug, Clone)]
struct CompiledField {
    spec: FieldSpec,
    selector: Option<Selector>,
}

impl CompiledField {
    fn read(&self, item: ElementRef<'_>) -> String {
        let node = match &self.selector {
            Some(selector) => item.select(selector).next(),
            None => Some(item),
        };
        let Some(node) = node else {
            return String::new();
        };

        match &self.spec.source {
            FieldSource::Text => collapse_whitespace(node.text()),
            FieldSource::Attr(attr) => node.value().attr(attr).unwrap_or_default().trim().to_string(),
            // `classes()` is unordered; the raw attribute keeps document order.
            FieldSource::LastClass => node
                .value()
                .attr("class")
                .and_then(|classes| classes.split_whitespace().last())
                .unwrap_or_default()
                .to_string(),
        }
    }
}

fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let text: String = parts.collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts one record per item node, with fields read by CSS selectors.
///
/// ```rust
/// use pagesweep::extract::{CssExtractor, ExtractionStrategy, FieldSpec};
///
/// let extractor = CssExtractor::new(
///     "li.book",
///     vec![FieldSpec::text("title", "h3"), FieldSpec::attr("link", "a", "href")],
/// )?;
/// let records = extractor.extract(r#"<ul><li class="book"><h3> Dune </h3><a href="/dune">x</a></li></ul>"#);
/// assert_eq!(&records[0]["title"], "Dune");
/// assert_eq!(&records[0]["link"], "/dune");
/// # Ok::<(), pagesweep::errors::ConfigurationError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CssExtractor {
    item_source: String,
    item: Selector,
    fields: Vec<CompiledField>,
}

impl CssExtractor {
    /// Builds an extractor, compiling every selector up front.
    pub fn new(
        item_selector: impl Into<String>,
        fields: impl IntoIterator<Item = FieldSpec>,
    ) -> Result<Self, ConfigurationError> {
        let item_source = item_selector.into();
        let item = compile("item_selector", &item_source)?;

        let fields = fields
            .into_iter()
            .map(|spec| {
                let selector = if spec.selector.is_empty() {
                    None
                } else {
                    Some(compile(&format!("field '{}'", spec.name), &spec.selector)?)
                };
                Ok::<_, ConfigurationError>(CompiledField { spec, selector })
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        if fields.is_empty() {
            return Err(ConfigurationError::new("fields", "at least one field is required"));
        }

        Ok(Self {
            item_source,
            item,
            fields,
        })
    }

    /// The item selector as given.
    #[must_use]
    pub fn item_selector(&self) -> &str {
        &self.item_source
    }

    /// Field specs, in output order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().map(|f| &f.spec)
    }

    /// Field names, in output order.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.spec.name.clone()).collect()
    }
}

impl ExtractionStrategy for CssExtractor {
    fn extract(&self, markup: &str) -> Vec<Record> {
        let document = Html::parse_document(markup);
        document
            .select(&self.item)
            .map(|item| {
                self.fields
                    .iter()
                    .map(|field| (field.spec.name.clone(), field.read(item)))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LISTING: &str = r#"
        <html><body><ol>
          <li><article class="product_pod">
            <h3><a href="a-light.html" title="A Light in the Attic">A Light...</a></h3>
            <p class="star-rating Three"></p>
            <p class="price_color">  £51.77 </p>
          </article></li>
          <li><article class="product_pod">
            <h3><a href="tipping.html" title="Tipping the Velvet">Tipping...</a></h3>
            <p class="star-rating One"></p>
          </article></li>
        </ol></body></html>
    "#;

    fn books() -> CssExtractor {
        CssExtractor::new(
            "article.product_pod",
            vec![
                FieldSpec::attr("title", "h3 a", "title"),
                FieldSpec::text("price", ".price_color"),
                FieldSpec::last_class("rating", "p.star-rating"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_extracts_items_in_document_order() {
        let records = books().extract(LISTING);
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0]["title"], "A Light in the Attic");
        assert_eq!(&records[0]["price"], "£51.77");
        assert_eq!(&records[0]["rating"], "Three");
        assert_eq!(&records[1]["title"], "Tipping the Velvet");
        assert_eq!(&records[1]["rating"], "One");
    }

    #[test]
    fn test_last_class_follows_attribute_order() {
        let extractor =
            CssExtractor::new("article", vec![FieldSpec::last_class("rating", "p.star-rating")])
                .unwrap();
        for (markup, expected) in [
            (r#"<article><p class="star-rating Three"></p></article>"#, "Three"),
            (r#"<article><p class="  star-rating   Five "></p></article>"#, "Five"),
            (r#"<article><p class="star-rating"></p></article>"#, "star-rating"),
        ] {
            assert_eq!(&extractor.extract(markup)[0]["rating"], expected);
        }
    }

    #[test]
    fn test_missing_field_is_empty() {
        let records = books().extract(LISTING);
        assert_eq!(records[1].get("price"), Some(""));
    }

    #[test]
    fn test_no_items_gives_no_records() {
        assert!(books().extract("<html><body><p>No more results</p></body></html>").is_empty());
        assert!(books().extract("").is_empty());
    }

    #[test]
    fn test_text_whitespace_collapsed() {
        let extractor = CssExtractor::new("div.tile", vec![FieldSpec::text("name", ".name")]).unwrap();
        let records = extractor.extract(
            "<div class='tile'><span class='name'>\n  Glock <b>19</b>\n  Gen 5 </span></div>",
        );
        assert_eq!(&records[0]["name"], "Glock 19 Gen 5");
    }

    #[test]
    fn test_empty_selector_reads_item() {
        let extractor = CssExtractor::new("a.next", vec![FieldSpec::attr("href", "", "href")]).unwrap();
        let records = extractor.extract("<a class='next' href='page-2.html'>next</a>");
        assert_eq!(&records[0]["href"], "page-2.html");
    }

    #[test]
    fn test_invalid_selectors_rejected() {
        let err = CssExtractor::new("div[", vec![FieldSpec::text("x", "p")]).unwrap_err();
        assert_eq!(err.field, "item_selector");

        let err = CssExtractor::new("div", vec![FieldSpec::text("x", "p[[")]).unwrap_err();
        assert_eq!(err.field, "field 'x'");

        let err = CssExtractor::new("div", Vec::new()).unwrap_err();
        assert_eq!(err.field, "fields");
    }

    #[test]
    fn test_field_spec_parsing() {
        assert_eq!(
            "price=.price_color".parse::<FieldSpec>().unwrap(),
            FieldSpec::text("price", ".price_color")
        );
        assert_eq!(
            "title=h3 a@title".parse::<FieldSpec>().unwrap(),
            FieldSpec::attr("title", "h3 a", "title")
        );
        assert_eq!(
            "rating=p.star-rating@class:last".parse::<FieldSpec>().unwrap(),
            FieldSpec::last_class("rating", "p.star-rating")
        );
        assert_eq!(
            "link=@href".parse::<FieldSpec>().unwrap(),
            FieldSpec::attr("link", "", "href")
        );
    }

    #[test]
    fn test_field_spec_keeps_attribute_selectors() {
        let spec: FieldSpec = "mail=a[href*='@example.com']".parse().unwrap();
        assert_eq!(spec.selector, "a[href*='@example.com']");
        assert_eq!(spec.source, FieldSource::Text);
    }

    #[test]
    fn test_field_spec_parse_errors() {
        assert!("no-equals".parse::<FieldSpec>().is_err());
        assert!("=.price".parse::<FieldSpec>().is_err());
    }

    #[test]
    fn test_field_spec_display_round_trips() {
        let spec = FieldSpec::last_class("rating", "p.star-rating");
        assert_eq!(spec.to_string(), "rating=p.star-rating@class:last");
        assert_eq!(spec.to_string().parse::<FieldSpec>().unwrap(), spec);
    }
}
