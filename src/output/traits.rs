//! Persistence interface for finished summaries

use crate::output::records::RecordResult;
use crate::stats::RunSummary;

/// Stores and reloads a completed [`RunSummary`]
///
/// Implementations persist the `section,name,count` record shape produced by
/// [`crate::output::to_records`], so a summary saved by one store can be read
/// back by any other.
pub trait SummaryStore {
    /// Persists a summary, replacing any previous one
    fn save(&self, summary: &RunSummary) -> RecordResult<()>;

    /// Loads the persisted summary
    fn load(&self) -> RecordResult<RunSummary>;
}
