//! Concurrent aggregation of per-film facts
//!
//! The [`Aggregator`] is the only state written by more than one worker during a
//! run. All writes go through [`Aggregator::merge`] or [`Aggregator::merge_batch`],
//! each of which takes the lock exactly once, so a reader never observes a
//! half-applied film.

use crate::extract::ItemFacts;
use crate::stats::AggregateCounters;
use std::sync::{Mutex, MutexGuard};

/// Running totals of a run: counters plus the numeric summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    /// Frequency tables
    pub counters: AggregateCounters,

    /// Films fetched and extracted successfully
    pub items: u64,

    /// Films whose fetch failed after retries
    pub failed: u64,

    /// Sum of extracted runtimes in minutes
    pub runtime_minutes: u64,

    /// Films with a non-zero runtime
    pub timed_items: u64,
}

impl Tally {
    /// Folds one film into the tally
    pub fn record(&mut self, facts: &ItemFacts) {
        self.counters.record(facts);
        self.items += 1;
        self.runtime_minutes += u64::from(facts.runtime_minutes);
        if facts.runtime_minutes > 0 {
            self.timed_items += 1;
        }
    }

    /// Adds another tally into this one
    pub fn absorb(&mut self, other: &Tally) {
        self.counters.absorb(&other.counters);
        self.items += other.items;
        self.failed += other.failed;
        self.runtime_minutes += other.runtime_minutes;
        self.timed_items += other.timed_items;
    }
}

/// Thread-safe owner of a run's [`Tally`]
#[derive(Debug, Default)]
pub struct Aggregator {
    tally: Mutex<Tally>,
}

impl Aggregator {
    /// Creates an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one film under the lock
    pub fn merge(&self, facts: &ItemFacts) {
        self.lock().record(facts);
    }

    /// Reduces a batch locally, then applies it with a single lock acquisition
    ///
    /// Produces exactly the same tally as calling [`Aggregator::merge`] for each
    /// element, in any order.
    pub fn merge_batch(&self, batch: &[ItemFacts]) {
        if batch.is_empty() {
            return;
        }

        let mut local = Tally::default();
        for facts in batch {
            local.record(facts);
        }

        self.lock().absorb(&local);
    }

    /// Records a film that could not be fetched
    ///
    /// Failed films contribute to no count and no sum; see [`Tally::failed`].
    pub fn record_failure(&self) {
        self.lock().failed += 1;
    }

    /// Returns a consistent copy of the current tally
    pub fn snapshot(&self) -> Tally {
        self.lock().clone()
    }

    /// Consumes the aggregator and returns its tally
    pub fn into_tally(self) -> Tally {
        self.tally
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock(&self) -> MutexGuard<'_, Tally> {
        // Every critical section is a complete merge, so a poisoned tally is
        // still consistent.
        self.tally
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
