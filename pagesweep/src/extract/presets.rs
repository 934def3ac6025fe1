//! Ready-made site configurations.

use super::{CssExtractor, FieldSpec};
use crate::core::UrlTemplate;
use crate::errors::ConfigurationError;

/// A URL template bundled with the extractor for that site's listing pages.
#[derive(Debug, Clone)]
pub struct SitePreset {
    /// Short name used to select the preset.
    pub name: &'static str,
    /// Listing page URL template.
    pub url_template: UrlTemplate,
    /// Extractor for one listing page.
    pub extractor: CssExtractor,
}

/// Names accepted by [`by_name`].
pub const PRESET_NAMES: &[&str] = &["books", "sportsmans"];

/// The `books.toscrape.com` catalogue: title, price and star rating per book.
pub fn books_toscrape() -> Result<SitePreset, ConfigurationError> {
    Ok(SitePreset {
        name: "books",
        url_template: UrlTemplate::parse("https://books.toscrape.com/catalogue/page-{}.html")?,
        extractor: CssExtractor::new(
            "article.product_pod",
            vec![
                FieldSpec::attr("title", "h3 a", "title"),
                FieldSpec::text("price", ".price_color"),
                FieldSpec::last_class("rating", "p.star-rating"),
            ],
        )?,
    })
}

/// Sportsman's Warehouse handgun listings: name and sale price per tile.
pub fn sportsmans_handguns() -> Result<SitePreset, ConfigurationError> {
    Ok(SitePreset {
        name: "sportsmans",
        url_template: UrlTemplate::parse(
            "https://www.sportsmans.com/c/cat139633-hpf-pistols?q=%3Arelevance&page={}",
        )?,
        extractor: CssExtractor::new(
            "div.product-tile",
            vec![
                FieldSpec::text("name", ".product-item"),
                FieldSpec::text("price", ".smw-sale-price.displayed-price"),
            ],
        )?,
    })
}

/// Looks a preset up by name.
pub fn by_name(name: &str) -> Result<SitePreset, ConfigurationError> {
    match name {
        "books" => books_toscrape(),
        "sportsmans" => sportsmans_handguns(),
        other => Err(ConfigurationError::new("preset", format!("unknown preset '{other}'"))
            .with_fix_hint(format!("choose one of: {}", PRESET_NAMES.join(", ")))),
    }
}
