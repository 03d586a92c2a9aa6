use crate::extract::ItemFacts;
use crate::stats::Category;
use std::collections::BTreeMap;

/// Per-category frequency tables
///
/// Each table maps a value (a language, a decade label, ...) to the number of
/// films it appeared in. Tables are ordered maps, so two counters built from
/// the same facts compare equal and iterate identically no matter in which
/// order or batches the facts were recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateCounters {
    tables: BTreeMap<Category, BTreeMap<String, u64>>,
}

impl AggregateCounters {
    /// Creates empty counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one film's facts: every value present adds exactly 1
    pub fn record(&mut self, facts: &ItemFacts) {
        for category in Category::ALL {
            for value in facts.values(category) {
                self.add(category, value, 1);
            }
        }
    }

    /// Adds every count of `other` into these counters
    pub fn absorb(&mut self, other: &AggregateCounters) {
        for (category, name, count) in other.iter() {
            self.add(category, name, count);
        }
    }

    /// Adds `count` to one value; a zero count leaves the tables untouched
    pub fn add(&mut self, category: Category, name: &str, count: u64) {
        if count == 0 {
            return;
        }
        let table = self.tables.entry(category).or_default();
        match table.get_mut(name) {
            Some(existing) => *existing = existing.saturating_add(count),
            None => {
                table.insert(name.to_string(), count);
            }
        }
    }

    /// Returns the count for one value (0 if never seen)
    pub fn count(&self, category: Category, name: &str) -> u64 {
        self.tables
            .get(&category)
            .and_then(|table| table.get(name))
            .copied()
            .unwrap_or(0)
    }

    /// Returns the table of one category, if any value was counted
    pub fn table(&self, category: Category) -> Option<&BTreeMap<String, u64>> {
        self.tables.get(&category)
    }

    /// Number of distinct values counted in one category
    pub fn distinct(&self, category: Category) -> usize {
        self.tables.get(&category).map_or(0, BTreeMap::len)
    }

    /// Iterates `(category, value, count)` in category then value order
    pub fn iter(&self) -> impl Iterator<Item = (Category, &str, u64)> + '_ {
        self.tables.iter().flat_map(|(category, table)| {
            table
                .iter()
                .map(move |(name, count)| (*category, name.as_str(), *count))
        })
    }

    /// Largest count across all categories
    pub fn max_count(&self) -> u64 {
        self.iter().map(|(_, _, count)| count).max().unwrap_or(0)
    }

    /// Returns true if nothing has been counted
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
