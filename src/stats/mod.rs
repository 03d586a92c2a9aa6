//! Aggregation of per-film facts into run statistics
//!
//! - [`Category`] names the counted facts
//! - [`AggregateCounters`] holds the frequency tables
//! - [`Aggregator`] merges facts from concurrent workers
//! - [`RunSummary`] is the finalized, immutable result with rankings

mod aggregator;
mod category;
mod counters;
mod summary;

pub use aggregator::{Aggregator, Tally};
pub use category::Category;
pub use counters::AggregateCounters;
pub use summary::{RankedEntry, RunSummary};
