use crate::stats::{AggregateCounters, Category, Tally};
use chrono::{DateTime, SubsecRound, Utc};
use std::cmp::Ordering;

/// Minutes per hour and per day, for the derived runtime totals
const MINUTES_PER_HOUR: f64 = 60.0;
const MINUTES_PER_DAY: f64 = 1440.0;

/// Final, immutable result of one run
///
/// `items` is the number of films that were fetched and extracted. It is the
/// denominator of every percentage and is what gets persisted as `FILMS`.
/// Films that failed to fetch are counted in `failed` only.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Account whose listing was crawled
    pub user: String,

    /// When the run finished (whole seconds)
    pub scraped_at: DateTime<Utc>,

    /// Films successfully processed
    pub items: u64,

    /// Sum of runtimes in minutes
    pub runtime_minutes: u64,

    /// Films that reported a non-zero runtime
    pub timed_items: u64,

    /// Distinct film URLs found during discovery
    pub discovered: u64,

    /// Films whose fetch failed after retries
    pub failed: u64,

    /// True if the run was cancelled before every film completed
    pub cancelled: bool,

    /// Final frequency tables
    pub counters: AggregateCounters,
}

/// One row of a ranked category table
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub name: String,
    pub count: u64,
    pub percentage: f64,
}

impl RunSummary {
    /// Builds the summary from a finished tally
    pub fn finalize(user: &str, tally: Tally, discovered: u64, cancelled: bool) -> Self {
        Self::finalize_at(user, tally, discovered, cancelled, Utc::now())
    }

    /// Same as [`RunSummary::finalize`] with an explicit timestamp
    pub fn finalize_at(
        user: &str,
        tally: Tally,
        discovered: u64,
        cancelled: bool,
        scraped_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user: user.to_string(),
            scraped_at: scraped_at.trunc_subsecs(0),
            items: tally.items,
            runtime_minutes: tally.runtime_minutes,
            timed_items: tally.timed_items,
            discovered,
            failed: tally.failed,
            cancelled,
            counters: tally.counters,
        }
    }

    /// Total runtime in hours
    pub fn hours(&self) -> f64 {
        self.runtime_minutes as f64 / MINUTES_PER_HOUR
    }

    /// Total runtime in days
    pub fn days(&self) -> f64 {
        self.runtime_minutes as f64 / MINUTES_PER_DAY
    }

    /// Mean runtime over films with a known runtime
    pub fn average_runtime(&self) -> Option<f64> {
        if self.timed_items == 0 {
            return None;
        }
        Some(self.runtime_minutes as f64 / self.timed_items as f64)
    }

    /// Share of processed films, in percent; 0 when nothing was processed
    pub fn percentage(&self, count: u64) -> f64 {
        if self.items == 0 {
            return 0.0;
        }
        count as f64 / self.items as f64 * 100.0
    }

    /// Full ranked table for one category
    ///
    /// Sorted by count, highest first; ties are broken by value in lexical
    /// order so the output is reproducible. No truncation happens here.
    pub fn ranked(&self, category: Category) -> Vec<RankedEntry> {
        let mut entries: Vec<RankedEntry> = self
            .counters
            .table(category)
            .into_iter()
            .flatten()
            .map(|(name, count)| RankedEntry {
                name: name.clone(),
                count: *count,
                percentage: self.percentage(*count),
            })
            .collect();

        entries.sort_by(compare_ranked);
        entries
    }
}

fn compare_ranked(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name))
}
