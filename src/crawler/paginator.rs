//! Pagination driver
//!
//! Walks the result pages of one query until a page is empty, has no next-page
//! locator, or cannot be fetched. Pages are fetched strictly one after another.

use crate::crawler::fetcher::PageSource;
use crate::crawler::parser::{resolve_link, PageExtractor};
use crate::output::{Marker, Narrator};
use crate::query::Query;
use crate::record::{dedup, Record};
use crate::state::{CrawlState, StopReason};
use std::io::Write;

/// Everything one crawl produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlResult {
    /// Unique records across all pages, in crawl order
    pub records: Vec<Record>,
    /// Number of pages that contained records
    pub pages: u32,
    pub stop: StopReason,
}

/// Drives the fetch, extract, follow loop for one query
pub struct Paginator<'a, S: PageSource + ?Sized> {
    source: &'a S,
    extractor: &'a PageExtractor,
    base_url: &'a str,
    legacy_offset: bool,
}

impl<'a, S: PageSource + ?Sized> Paginator<'a, S> {
    pub fn new(source: &'a S, extractor: &'a PageExtractor, base_url: &'a str) -> Self {
        Self {
            source,
            extractor,
            base_url,
            legacy_offset: false,
        }
    }

    /// Builds the next URL from the result offset when a page has no next locator
    pub fn with_legacy_offset(mut self, enabled: bool) -> Self {
        self.legacy_offset = enabled;
        self
    }

    /// Crawls every page of `query`
    ///
    /// Each page is deduplicated on its own and the accumulated records are
    /// deduplicated again at the end. Progress is narrated page by page.
    pub async fn crawl<W: Write>(&self, query: &Query, narrator: &mut Narrator<W>) -> CrawlResult {
        let mut state = CrawlState::Start;
        let mut url = query.first_page_url(self.base_url);
        let mut records = Vec::new();
        let mut pages: u32 = 0;

        let stop = loop {
            advance(&mut state, CrawlState::Fetching);
            narrator.say(Marker::Url, format!("Search URL (page {}): {}", pages + 1, url));

            let page = match self.source.fetch(&url).await {
                Ok(page) => page,
                Err(failure) => {
                    narrator.say(Marker::Error, format!("Error fetching page: {}", failure));
                    advance(&mut state, CrawlState::Done);
                    break StopReason::FetchFailed;
                }
            };

            let parsed = self.extractor.extract(&page.body);
            if parsed.is_empty() {
                advance(&mut state, CrawlState::Done);
                break StopReason::EmptyPage;
            }

            advance(&mut state, CrawlState::HasPage);
            pages += 1;

            let page_records = dedup(parsed.records);
            narrator.say(
                Marker::Count,
                format!("{} unique records on page {}.", page_records.len(), pages),
            );
            records.extend(page_records);

            let next = parsed.next.as_deref().and_then(|href| {
                let resolved = resolve_link(href, &page.final_url);
                if resolved.is_none() {
                    tracing::warn!("Ignoring unusable next-page locator '{}'", href);
                }
                resolved
            });

            match next {
                Some(next_url) => url = next_url,
                None if self.legacy_offset => url = query.offset_page_url(self.base_url, pages),
                None => {
                    advance(&mut state, CrawlState::Done);
                    break StopReason::NoNextPage;
                }
            }
        };

        narrator.say(Marker::End, format!("{}. Finished crawling.", stop.describe()));

        let records = dedup(records);
        narrator.say(
            Marker::Count,
            format!("Total unique records crawled: {}", records.len()),
        );
        narrator.blank();

        tracing::info!(
            "Crawl of '{}' stopped after {} page(s): {}",
            query,
            pages,
            stop.describe()
        );

        CrawlResult {
            records,
            pages,
            stop,
        }
    }
}

fn advance(state: &mut CrawlState, next: CrawlState) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid crawl transition {} -> {}",
        state,
        next
    );
    tracing::trace!("Crawl state {} -> {}", state, next);
    *state = next;
}
