//! Text normalisation and numeric pattern helpers for field extraction

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Release years outside this range are treated as noise
const PLAUSIBLE_YEARS: std::ops::RangeInclusive<i32> = 1870..=2100;

/// Label the site uses for films without dialogue
const NO_LANGUAGE_SENTINEL: &str = "No spoken language";

/// Label that replaces [`NO_LANGUAGE_SENTINEL`] in the language table
pub const NO_LANGUAGE_LABEL: &str = "None";

static YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\D)(\d{4})(?:\D|$)").expect("Invalid year regex"));

static RUNTIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|\D)(\d{1,4})\s*min").expect("Invalid runtime regex"));

/// Trims a value and cuts it at the first comma
///
/// A value holding a list ("Drama, Thriller") keeps only its first token.
/// Returns None when nothing is left.
pub fn clean_value(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let head = match trimmed.split_once(',') {
        Some((head, _)) => head.trim_end(),
        None => trimmed,
    };

    if head.is_empty() {
        None
    } else {
        Some(head.to_string())
    }
}

/// Cleans a language value and maps the no-dialogue sentinel to a fixed label
pub fn normalize_language(text: &str) -> Option<String> {
    clean_value(text).map(|lang| {
        if lang.eq_ignore_ascii_case(NO_LANGUAGE_SENTINEL) {
            NO_LANGUAGE_LABEL.to_string()
        } else {
            lang
        }
    })
}

/// Cleans a genre and capitalises it: first letter upper case, the rest lower
pub fn normalize_genre(text: &str) -> Option<String> {
    clean_value(text).map(|genre| {
        let mut chars = genre.chars();
        match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => genre,
        }
    })
}

/// Cleans an actor name, dropping "Show All…" style interface labels
pub fn normalize_actor(text: &str) -> Option<String> {
    clean_value(text).filter(|actor| !is_cast_chrome(actor))
}

fn is_cast_chrome(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.starts_with("show all") || lower.starts_with("show ")
}

/// Finds the first plausible four-digit year in free text
pub fn find_year(text: &str) -> Option<i32> {
    YEAR_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<i32>().ok())
        .find(|year| PLAUSIBLE_YEARS.contains(year))
}

/// Parses a short runtime pattern such as "118 mins"
pub fn find_runtime(text: &str) -> Option<u32> {
    RUNTIME_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Buckets a year into its decade label, e.g. 1994 -> "1990s"
pub fn decade_label(year: i32) -> String {
    format!("{}s", year.div_euclid(10) * 10)
}

/// Extracts a release year from a JSON-LD block
///
/// Looks at `releasedEvent[0].startDate`, then `dateCreated`, then
/// `datePublished`. Tolerates the CDATA comment wrapper some pages put
/// around the JSON body.
pub fn year_from_json_ld(raw: &str) -> Option<i32> {
    let value = json_body(raw, '{', '}').or_else(|| json_body(raw, '[', ']'))?;
    match &value {
        Value::Array(items) => items.iter().find_map(year_from_json_object),
        _ => year_from_json_object(&value),
    }
}

fn json_body(raw: &str, open: char, close: char) -> Option<Value> {
    let start = raw.find(open)?;
    let end = raw.rfind(close)?;
    if end < start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

fn year_from_json_object(value: &Value) -> Option<i32> {
    let object = value.as_object()?;

    let released = match object.get("releasedEvent") {
        Some(Value::Array(events)) => events.first(),
        Some(event @ Value::Object(_)) => Some(event),
        _ => None,
    };

    let from_event = released
        .and_then(|event| event.get("startDate"))
        .and_then(json_year);

    from_event
        .or_else(|| object.get("dateCreated").and_then(json_year))
        .or_else(|| object.get("datePublished").and_then(json_year))
}

fn json_year(value: &Value) -> Option<i32> {
    match value {
        Value::String(s) => find_year(s),
        Value::Number(n) => n.as_i64().and_then(|n| find_year(&n.to_string())),
        _ => None,
    }
}
