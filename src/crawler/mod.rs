//! Crawling: fetching, listing discovery and run coordination
//!
//! - `fetcher`: pooled HTTP client with timeout and retry policy
//! - `paginator`: walks the listing pages and collects film URLs
//! - `coordinator`: drives a run through the worker pool to a summary

mod coordinator;
mod fetcher;
mod paginator;

pub use coordinator::{Coordinator, RunRequest};
pub use fetcher::{FetchClient, FetchError};
pub use paginator::{discover, is_not_found_page, listing_url, parse_listing, Discovery, ListingPage};
