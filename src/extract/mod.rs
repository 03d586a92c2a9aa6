//! Field extraction from film pages
//!
//! [`ExtractionPolicy::extract`] is a pure, total function: any input yields an
//! [`ItemFacts`], possibly empty. Each field is located by its own selector
//! (see [`selectors::paths`]) so a missing field never hides the others.

pub mod selectors;
pub mod text;

use crate::stats::Category;
use scraper::{ElementRef, Html, Selector};
use self::selectors::FieldSelectors;
use std::collections::BTreeSet;

/// Facts extracted from one film page
///
/// Category values are sets, so a value found in two places on the same page
/// counts once for that film.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFacts {
    pub languages: BTreeSet<String>,
    pub countries: BTreeSet<String>,
    pub genres: BTreeSet<String>,
    pub directors: BTreeSet<String>,
    pub actors: BTreeSet<String>,

    /// Decade label such as "1990s"; absent when no plausible year was found
    pub decade: Option<String>,

    /// Runtime in minutes; 0 when the page did not state one
    pub runtime_minutes: u32,
}

impl ItemFacts {
    /// Values this film contributes to one category
    pub fn values(&self, category: Category) -> impl Iterator<Item = &str> + '_ {
        let set = match category {
            Category::Language => Some(&self.languages),
            Category::Country => Some(&self.countries),
            Category::Genre => Some(&self.genres),
            Category::Director => Some(&self.directors),
            Category::Actor => Some(&self.actors),
            Category::Decade => None,
        };
        let decade = match category {
            Category::Decade => self.decade.as_deref(),
            _ => None,
        };

        set.into_iter()
            .flatten()
            .map(String::as_str)
            .chain(decade)
    }

    /// True when no field yielded anything
    pub fn is_empty(&self) -> bool {
        self.decade.is_none()
            && self.runtime_minutes == 0
            && Category::SETS
                .iter()
                .all(|category| self.values(*category).next().is_none())
    }
}

/// Extracts [`ItemFacts`] from film page markup
///
/// Holds only compiled selectors, so one policy is shared by every worker of
/// a run.
#[derive(Debug, Default)]
pub struct ExtractionPolicy {
    selectors: FieldSelectors,
}

impl ExtractionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts every field from one page
    pub fn extract(&self, html: &str) -> ItemFacts {
        let document = Html::parse_document(html);
        let s = &self.selectors;

        let mut directors = collect(&document, s.directors.as_ref(), text::clean_value);
        if directors.is_empty() {
            directors = collect(&document, s.directors_fallback.as_ref(), text::clean_value);
        }

        ItemFacts {
            languages: collect(&document, s.languages.as_ref(), text::normalize_language),
            countries: collect(&document, s.countries.as_ref(), text::clean_value),
            genres: collect(&document, s.genres.as_ref(), text::normalize_genre),
            directors,
            actors: collect(&document, s.actors.as_ref(), text::normalize_actor),
            decade: self.release_year(&document).map(text::decade_label),
            runtime_minutes: self.runtime(&document).unwrap_or(0),
        }
    }

    /// Release year from the date link, then from JSON-LD
    fn release_year(&self, document: &Html) -> Option<i32> {
        let from_date = self
            .selectors
            .release_date
            .as_ref()
            .and_then(|selector| document.select(selector).next())
            .and_then(|element| text::find_year(&element_text(element)));

        from_date.or_else(|| {
            let selector = self.selectors.json_ld.as_ref()?;
            document
                .select(selector)
                .find_map(|script| text::year_from_json_ld(&element_text(script)))
        })
    }

    fn runtime(&self, document: &Html) -> Option<u32> {
        let selector = self.selectors.runtime.as_ref()?;
        document
            .select(selector)
            .find_map(|element| text::find_runtime(&element_text(element)))
    }
}

fn collect<F>(document: &Html, selector: Option<&Selector>, normalize: F) -> BTreeSet<String>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(selector) = selector else {
        return BTreeSet::new();
    };

    document
        .select(selector)
        .filter_map(|element| normalize(&element_text(element)))
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}
