//! Search query handling
//!
//! A [`Query`] is the free-text search term that drives one crawl. It knows how to
//! turn itself into listing URLs and into the filename stem its snapshots are
//! stored under.

use std::fmt;

/// Offset of the first result on the second page of a listing
const FIRST_OFFSET: u32 = 49;

/// Number of results shown per listing page
const PAGE_SIZE: u32 = 48;

/// A free-text search term
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    term: String,
}

impl Query {
    /// Creates a query from a raw search term, trimming surrounding whitespace
    pub fn new(term: impl AsRef<str>) -> Self {
        Self {
            term: term.as_ref().trim().to_string(),
        }
    }

    /// Returns the term as typed by the user
    pub fn term(&self) -> &str {
        &self.term
    }

    /// True when the term is empty after trimming; such a query cannot be stored
    pub fn is_empty(&self) -> bool {
        self.term.is_empty()
    }

    /// Returns the URL path segment for this query: spaces become hyphens, lowercased
    ///
    /// ```
    /// use listwatch::Query;
    ///
    /// assert_eq!(Query::new("Toyota Corolla Cross").slug(), "toyota-corolla-cross");
    /// ```
    pub fn slug(&self) -> String {
        self.term.replace(' ', "-").to_lowercase()
    }

    /// Returns the filename-safe stem used to name snapshots
    ///
    /// Spaces and path separators become underscores, so the stem always names a
    /// file directly inside the data directory. Case is preserved, so `"Corolla"`
    /// and `"corolla"` are distinct queries on disk.
    pub fn file_stem(&self) -> String {
        self.term
            .chars()
            .map(|c| match c {
                ' ' | '/' | '\\' => '_',
                c => c,
            })
            .collect()
    }

    /// Recovers the human-readable term from a snapshot filename stem
    pub fn from_file_stem(stem: &str) -> Self {
        Self::new(stem.replace('_', " "))
    }

    /// Builds the URL of the first result page
    ///
    /// The fragment carries the term with its spaces intact, which is what the
    /// listing site itself generates for a typed search.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Scheme and host of the listing site, e.g. `https://listado.mercadolibre.com.ar`
    pub fn first_page_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}#D[A:{}]",
            base_url.trim_end_matches('/'),
            self.slug(),
            self.term
        )
    }

    /// Builds the URL of a later result page using the legacy offset scheme
    ///
    /// `page` is zero-based, so `page == 1` is the second page (offset 49) and each
    /// further page adds 48. Page 0 has no offset form and yields the first page URL.
    pub fn offset_page_url(&self, base_url: &str, page: u32) -> String {
        if page == 0 {
            return self.first_page_url(base_url);
        }

        let offset = FIRST_OFFSET + PAGE_SIZE * (page - 1);
        format!(
            "{}/{}_Desde_{}_NoIndex_True",
            base_url.trim_end_matches('/'),
            self.slug(),
            offset
        )
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.term)
    }
}
