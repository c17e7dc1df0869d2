//! HTML parser for extracting listing records
//!
//! This module turns one result page into:
//! - The records listed on it, in document order
//! - An optional locator for the following page
//!
//! Field extraction is per item and per field: a missing title, link or price
//! degrades that field to [`UNAVAILABLE`] instead of dropping the item or page.

use crate::record::{Record, UNAVAILABLE};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// One result item of the listing
const ITEM_SELECTOR: &str = "li.ui-search-layout__item";

/// Anchor carrying both the title text and the detail link
const ANCHOR_SELECTOR: &str = "a";

/// Integer part of the displayed price
const PRICE_SELECTOR: &str = "span.andes-money-amount__fraction";

/// Next-page selectors, most specific first
const NEXT_PAGE_SELECTORS: [(&str, &str); 3] = [
    (
        "search pagination",
        "ul.ui-search-andes-pagination li.andes-pagination__button--next a[href]",
    ),
    (
        "generic pagination",
        "ul.andes-pagination li.andes-pagination__button--next a[href]",
    ),
    (
        "loose next button",
        "li.andes-pagination__button--next a[href]",
    ),
];

/// A CSS selector that failed to parse
#[derive(Debug, Error)]
#[error("Invalid selector '{selector}': {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

fn parse_selector(css: &str) -> Result<Selector, SelectorError> {
    Selector::parse(css).map_err(|e| SelectorError {
        selector: css.to_string(),
        message: e.to_string(),
    })
}

/// Records and next-page locator extracted from one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Records in document order
    pub records: Vec<Record>,

    /// Locator of the following page, exactly as found in the markup
    pub next: Option<String>,
}

impl ParsedPage {
    /// Returns true if the page listed no items at all
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One way of finding the "next page" control in a document
pub trait NextPageStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Returns the next page locator, if this strategy finds one
    fn locate(&self, document: &Html) -> Option<String>;
}

/// Finds the next page as the `href` of the first element matching a selector
#[derive(Debug)]
pub struct SelectorStrategy {
    name: String,
    selector: Selector,
}

impl SelectorStrategy {
    pub fn new(name: impl Into<String>, css: &str) -> Result<Self, SelectorError> {
        Ok(Self {
            name: name.into(),
            selector: parse_selector(css)?,
        })
    }
}

impl NextPageStrategy for SelectorStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn locate(&self, document: &Html) -> Option<String> {
        document
            .select(&self.selector)
            .filter_map(|element| element.value().attr("href"))
            .map(str::trim)
            .find(|href| !href.is_empty())
            .map(str::to_string)
    }
}

/// Extracts records and the next-page locator from result pages
pub struct PageExtractor {
    item: Selector,
    anchor: Selector,
    price: Selector,
    strategies: Vec<Box<dyn NextPageStrategy>>,
}

impl PageExtractor {
    /// Creates an extractor with the built-in next-page strategies
    pub fn new() -> Result<Self, SelectorError> {
        let strategies = NEXT_PAGE_SELECTORS
            .iter()
            .map(|(name, css)| {
                SelectorStrategy::new(*name, css)
                    .map(|s| Box::new(s) as Box<dyn NextPageStrategy>)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::with_strategies(strategies)
    }

    /// Creates an extractor that tries the given strategies in order
    pub fn with_strategies(
        strategies: Vec<Box<dyn NextPageStrategy>>,
    ) -> Result<Self, SelectorError> {
        Ok(Self {
            item: parse_selector(ITEM_SELECTOR)?,
            anchor: parse_selector(ANCHOR_SELECTOR)?,
            price: parse_selector(PRICE_SELECTOR)?,
            strategies,
        })
    }

    /// Parses a page body
    ///
    /// A page without result items yields an empty [`ParsedPage`] and no next
    /// locator, which ends pagination.
    ///
    /// # Example
    ///
    /// ```
    /// use listwatch::crawler::PageExtractor;
    ///
    /// let html = r#"<ul><li class="ui-search-layout__item">
    ///     <a href="/item-1">Corolla Cross XEI</a>
    ///     <span class="andes-money-amount__fraction">32.500.000</span>
    /// </li></ul>"#;
    ///
    /// let page = PageExtractor::new().unwrap().extract(html);
    /// assert_eq!(page.records[0].title, "Corolla Cross XEI");
    /// assert_eq!(page.records[0].price, "32500000");
    /// assert_eq!(page.next, None);
    /// ```
    pub fn extract(&self, body: &str) -> ParsedPage {
        let document = Html::parse_document(body);

        let records: Vec<Record> = document
            .select(&self.item)
            .map(|item| self.extract_record(item))
            .collect();

        if records.is_empty() {
            tracing::debug!("No result items found on page");
            return ParsedPage::default();
        }

        let next = self.locate_next(&document);

        ParsedPage { records, next }
    }

    /// Extracts one record; every field falls back independently
    fn extract_record(&self, item: ElementRef<'_>) -> Record {
        let anchor = item.select(&self.anchor).next();

        let title = anchor
            .map(|a| a.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNAVAILABLE.to_string());

        let link = anchor
            .and_then(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| UNAVAILABLE.to_string());

        let price = item
            .select(&self.price)
            .next()
            .map(|span| digits_only(&span.text().collect::<String>()))
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| UNAVAILABLE.to_string());

        Record { title, price, link }
    }

    fn locate_next(&self, document: &Html) -> Option<String> {
        for strategy in &self.strategies {
            if let Some(next) = strategy.locate(document) {
                tracing::debug!("Next page found by '{}' strategy: {}", strategy.name(), next);
                return Some(next);
            }
            tracing::trace!("Strategy '{}' found no next page", strategy.name());
        }

        tracing::debug!("No pagination control found");
        None
    }
}

/// Keeps only ASCII digits, dropping currency symbols and separators
pub fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Resolves a next-page locator against the URL of the page it was found on
///
/// Returns None for locators that cannot be followed (non-HTTP schemes,
/// fragment-only links, unparsable URLs).
pub fn resolve_link(href: &str, base_url: &str) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let base = Url::parse(base_url).ok()?;
    match base.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
