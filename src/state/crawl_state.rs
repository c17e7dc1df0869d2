/// Crawl state definitions for the pagination loop
///
/// The loop moves `Start → Fetching → (HasPage | Done)` and from `HasPage` either
/// back to `Fetching` (a next page exists) or to `Done`.
use std::fmt;

/// Represents where the pagination driver is in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlState {
    /// Nothing fetched yet
    Start,

    /// A page request is in flight (including retries)
    Fetching,

    /// A page with at least one record has been extracted
    HasPage,

    /// No further pages will be requested
    Done,
}

impl CrawlState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: CrawlState) -> bool {
        matches!(
            (self, next),
            (Self::Start, Self::Fetching)
                | (Self::Fetching, Self::HasPage)
                | (Self::Fetching, Self::Done)
                | (Self::HasPage, Self::Fetching)
                | (Self::HasPage, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Fetching => "fetching",
            Self::HasPage => "has_page",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a crawl stopped requesting pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// A page contained no result items
    EmptyPage,

    /// A page had results but no link to a following page
    NoNextPage,

    /// A page could not be fetched within the configured attempts
    FetchFailed,
}

impl StopReason {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::EmptyPage => "No more records found",
            Self::NoNextPage => "No more pages available",
            Self::FetchFailed => "Page could not be fetched",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}
