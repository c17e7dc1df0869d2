//! Crawler module for listing pages
//!
//! This module contains the crawling logic, including:
//! - HTTP fetching with pacing, retries and block-page detection
//! - HTML parsing into records and a next-page locator
//! - The pagination loop that ties both together

mod fetcher;
mod paginator;
mod parser;

pub use fetcher::{build_http_client, FetchClient, FetchError, FetchFailure, PageBody, PageSource};
pub use paginator::{CrawlResult, Paginator};
pub use parser::{
    digits_only, resolve_link, NextPageStrategy, PageExtractor, ParsedPage, SelectorError,
    SelectorStrategy,
};
