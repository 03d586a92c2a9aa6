//! Property tests for aggregation
//!
//! Merging must give the same counters regardless of arrival order or batch
//! size, and counts must stay within the number of films merged.

use proptest::prelude::*;
use reel_census::{Aggregator, Category, ItemFacts};

fn name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["Alpha", "Beta", "Gamma", "Delta", "Epsilon"]).prop_map(str::to_string)
}

fn facts() -> impl Strategy<Value = ItemFacts> {
    (
        prop::collection::btree_set(name(), 0..4),
        prop::collection::btree_set(name(), 0..3),
        prop::collection::btree_set(name(), 0..3),
        prop::option::of(prop::sample::select(vec!["1960s", "1990s", "2010s"])),
        0u32..240,
    )
        .prop_map(|(languages, genres, actors, decade, runtime)| ItemFacts {
            languages,
            genres,
            actors,
            decade: decade.map(str::to_string),
            runtime_minutes: runtime,
            ..ItemFacts::default()
        })
}

fn films() -> impl Strategy<Value = Vec<ItemFacts>> {
    prop::collection::vec(facts(), 0..40)
}

fn merged_one_by_one(films: &[ItemFacts]) -> Aggregator {
    let aggregator = Aggregator::new();
    for film in films {
        aggregator.merge(film);
    }
    aggregator
}

proptest! {
    #[test]
    fn merge_order_does_not_matter(
        (original, shuffled) in films().prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let a = merged_one_by_one(&original).into_tally();
        let b = merged_one_by_one(&shuffled).into_tally();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn batch_size_does_not_matter(films in films(), batch_size in 1usize..10) {
        let batched = Aggregator::new();
        for chunk in films.chunks(batch_size) {
            batched.merge_batch(chunk);
        }

        prop_assert_eq!(batched.into_tally(), merged_one_by_one(&films).into_tally());
    }

    #[test]
    fn counts_are_bounded_and_monotonic(films in films()) {
        let aggregator = Aggregator::new();
        let mut previous = aggregator.snapshot();

        for film in &films {
            aggregator.merge(film);
            let current = aggregator.snapshot();

            for (category, name, count) in previous.counters.iter() {
                prop_assert!(current.counters.count(category, name) >= count);
            }
            for (_, _, count) in current.counters.iter() {
                prop_assert!(count <= current.items);
            }
            previous = current;
        }

        prop_assert_eq!(previous.items, films.len() as u64);
    }

    #[test]
    fn each_film_counts_a_value_once(films in films()) {
        let tally = merged_one_by_one(&films).into_tally();

        for category in Category::ALL {
            for (name, count) in tally.counters.table(category).into_iter().flatten() {
                let expected = films
                    .iter()
                    .filter(|film| film.values(category).any(|value| value == name))
                    .count() as u64;
                prop_assert_eq!(*count, expected);
            }
        }
    }
}
