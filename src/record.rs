//! Listing records and deduplication

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Value stored in a field that could not be extracted
pub const UNAVAILABLE: &str = "No disponible";

/// One item of a search-result listing
///
/// Field names on disk are the ones used by existing snapshot files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "titulo")]
    pub title: String,

    /// Price as digits only, without currency symbol or separators
    #[serde(rename = "precio")]
    pub price: String,

    /// Link to the listing detail, absolute or relative
    #[serde(rename = "enlace")]
    pub link: String,
}

impl Record {
    pub fn new(
        title: impl Into<String>,
        price: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            price: price.into(),
            link: link.into(),
        }
    }

    /// Identity of the record for deduplication and diffing
    ///
    /// The link is deliberately excluded: a relisted item keeps its identity.
    pub fn key(&self) -> (&str, &str) {
        (&self.title, &self.price)
    }
}

/// Removes records whose (title, price) key already occurred earlier in the sequence
///
/// The first occurrence of each key is kept and relative order is preserved, so the
/// function is idempotent.
pub fn dedup(records: Vec<Record>) -> Vec<Record> {
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(records.len());

    records
        .into_iter()
        .filter(|record| seen.insert((record.title.clone(), record.price.clone())))
        .collect()
}
