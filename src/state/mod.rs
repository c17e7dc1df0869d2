//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: where the pagination driver is in its fetch loop
//! - `StopReason`: why a crawl reached its terminal state

mod crawl_state;

// Re-export main types
pub use crawl_state::{CrawlState, StopReason};
