//! Output: persisted records and human-readable reports
//!
//! This module handles:
//! - Converting a `RunSummary` to and from `section,name,count` records
//! - Saving and loading those records as CSV
//! - Plain-text and markdown reports with top-N truncation

mod csv_output;
mod records;
mod report;
mod traits;

pub use csv_output::{read_records, write_records, CsvSummaryStore};
pub use records::{from_records, to_records, RecordError, RecordResult, SummaryRecord};
pub use report::{format_markdown_report, format_text_report, print_report, write_markdown_report};
pub use traits::SummaryStore;
