/// Categorical facts counted per film
///
/// The five set-valued categories come first; [`Category::Decade`] is the
/// single optional label derived from the release year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Language,
    Country,
    Genre,
    Director,
    Actor,
    Decade,
}

impl Category {
    /// Every category, in record order
    pub const ALL: [Category; 6] = [
        Self::Language,
        Self::Country,
        Self::Genre,
        Self::Director,
        Self::Actor,
        Self::Decade,
    ];

    /// Categories that hold a set of values per film
    pub const SETS: [Category; 5] = [
        Self::Language,
        Self::Country,
        Self::Genre,
        Self::Director,
        Self::Actor,
    ];

    /// Section tag used in persisted records
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Language => "LANGUAGE",
            Self::Country => "COUNTRY",
            Self::Genre => "GENRE",
            Self::Director => "DIRECTOR",
            Self::Actor => "ACTOR",
            Self::Decade => "DECADE",
        }
    }

    /// Parses a section tag; returns None for unknown tags
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "LANGUAGE" => Some(Self::Language),
            "COUNTRY" => Some(Self::Country),
            "GENRE" => Some(Self::Genre),
            "DIRECTOR" => Some(Self::Director),
            "ACTOR" => Some(Self::Actor),
            "DECADE" => Some(Self::Decade),
            _ => None,
        }
    }

    /// Column heading for reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Language => "Language",
            Self::Country => "Country",
            Self::Genre => "Genre",
            Self::Director => "Director",
            Self::Actor => "Actor",
            Self::Decade => "Decade",
        }
    }
}
