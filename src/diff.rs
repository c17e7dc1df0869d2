//! Diff engine
//!
//! Compares the records of the current snapshot against the previous snapshot of
//! the same query and decides which ones are new.

use crate::record::Record;
use std::collections::{HashMap, HashSet};

/// Classification of one current record against the previous snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Same title and price were present before
    Existing,
    /// Title never seen, or seen only at other prices
    New,
}

/// Every price seen under each title of a previous snapshot
#[derive(Debug, Default)]
pub struct PriceIndex<'a> {
    prices_by_title: HashMap<&'a str, HashSet<&'a str>>,
}

impl<'a> PriceIndex<'a> {
    pub fn build(previous: &'a [Record]) -> Self {
        let mut prices_by_title: HashMap<&str, HashSet<&str>> = HashMap::new();
        for record in previous {
            prices_by_title
                .entry(record.title.as_str())
                .or_default()
                .insert(record.price.as_str());
        }
        Self { prices_by_title }
    }

    pub fn classify(&self, record: &Record) -> Status {
        match self.prices_by_title.get(record.title.as_str()) {
            Some(prices) if prices.contains(record.price.as_str()) => Status::Existing,
            _ => Status::New,
        }
    }
}

/// Classifies every current record, in current order
///
/// With no previous snapshot every record is [`Status::New`].
pub fn classify<'c>(
    current: &'c [Record],
    previous: Option<&[Record]>,
) -> Vec<(&'c Record, Status)> {
    match previous {
        Some(previous) => {
            let index = PriceIndex::build(previous);
            current
                .iter()
                .map(|record| (record, index.classify(record)))
                .collect()
        }
        None => current.iter().map(|record| (record, Status::New)).collect(),
    }
}

/// Returns the current records that are new relative to `previous`
pub fn diff(current: &[Record], previous: Option<&[Record]>) -> Vec<Record> {
    classify(current, previous)
        .into_iter()
        .filter(|(_, status)| *status == Status::New)
        .map(|(record, _)| record.clone())
        .collect()
}
