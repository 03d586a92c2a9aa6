//! Row-oriented summary records
//!
//! A summary is persisted as `(section, name, count)` rows. `META` rows carry
//! the run header; every other section is a category tag whose rows are that
//! category's counts.

use crate::stats::{AggregateCounters, Category, RunSummary};
use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use thiserror::Error;

const META: &str = "META";
const USER: &str = "USER";
const SCRAPED_AT: &str = "SCRAPED_AT";
const FILMS: &str = "FILMS";
const HOURS: &str = "HOURS";
const DAYS: &str = "DAYS";

/// Day-first date written by older exports
const LEGACY_DATE_FORMAT: &str = "%d/%m/%Y";

/// Errors raised while reading or writing summary records
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },

    #[error("invalid count '{value}' for {section} '{name}'")]
    InvalidCount {
        section: String,
        name: String,
        value: String,
    },
}

/// Result type for record operations
pub type RecordResult<T> = Result<T, RecordError>;

/// One persisted row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRecord {
    pub section: String,
    pub name: String,
    pub count: String,
}

impl SummaryRecord {
    pub fn new(section: &str, name: &str, count: impl ToString) -> Self {
        Self {
            section: section.to_string(),
            name: name.to_string(),
            count: count.to_string(),
        }
    }
}

/// Flattens a summary into rows: the META header, then each category table
pub fn to_records(summary: &RunSummary) -> Vec<SummaryRecord> {
    let mut records = vec![
        SummaryRecord::new(META, USER, &summary.user),
        SummaryRecord::new(
            META,
            SCRAPED_AT,
            summary.scraped_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
        SummaryRecord::new(META, FILMS, summary.items),
        SummaryRecord::new(META, HOURS, format!("{:.6}", summary.hours())),
        SummaryRecord::new(META, DAYS, format!("{:.6}", summary.days())),
    ];

    records.extend(
        summary
            .counters
            .iter()
            .map(|(category, name, count)| SummaryRecord::new(category.tag(), name, count)),
    );

    records
}

/// Rebuilds a summary from rows
///
/// Unknown sections and META names are skipped. A malformed META value is
/// replaced by its zero value with a warning; a malformed category count is
/// an error. Repeated category rows add up.
///
/// Only the persisted fields come back: `discovered` equals `items`, and
/// `failed`, `timed_items` and `cancelled` are reset. With `timed_items` at
/// zero, [`RunSummary::average_runtime`] is `None` for a loaded summary.
pub fn from_records<I>(records: I) -> RecordResult<RunSummary>
where
    I: IntoIterator<Item = SummaryRecord>,
{
    let mut user = String::new();
    let mut scraped_at = DateTime::<Utc>::default();
    let mut items: u64 = 0;
    let mut hours: Option<f64> = None;
    let mut days: Option<f64> = None;
    let mut counters = AggregateCounters::new();

    for record in records {
        if record.section == META {
            match record.name.as_str() {
                USER => user = record.count,
                SCRAPED_AT => scraped_at = parse_timestamp(&record.count),
                FILMS => items = meta_number(&record, 0),
                HOURS => hours = Some(meta_number(&record, 0.0)),
                DAYS => days = Some(meta_number(&record, 0.0)),
                other => tracing::debug!("Ignoring META row '{}'", other),
            }
            continue;
        }

        let Some(category) = Category::from_tag(&record.section) else {
            tracing::debug!("Ignoring unknown section '{}'", record.section);
            continue;
        };

        let count: u64 = record
            .count
            .trim()
            .parse()
            .map_err(|_| RecordError::InvalidCount {
                section: record.section.clone(),
                name: record.name.clone(),
                value: record.count.clone(),
            })?;
        counters.add(category, &record.name, count);
    }

    let runtime_minutes = match (hours, days) {
        (Some(h), _) => (h * 60.0).round() as u64,
        (None, Some(d)) => (d * 1440.0).round() as u64,
        (None, None) => 0,
    };

    Ok(RunSummary {
        user,
        scraped_at,
        items,
        runtime_minutes,
        timed_items: 0,
        discovered: items,
        failed: 0,
        cancelled: false,
        counters,
    })
}

fn meta_number<T: std::str::FromStr>(record: &SummaryRecord, zero: T) -> T {
    match record.count.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(
                "Unreadable META {} value '{}', using 0",
                record.name,
                record.count
            );
            zero
        }
    }
}

/// Parses RFC 3339, or the legacy `dd/mm/yyyy` form at midnight UTC
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }

    if let Some(midnight) = NaiveDate::parse_from_str(raw, LEGACY_DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Utc.from_utc_datetime(&midnight);
    }

    tracing::warn!("Unreadable SCRAPED_AT '{}', using the epoch", raw);
    DateTime::<Utc>::default()
}
