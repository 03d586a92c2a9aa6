use scraper::Selector;

/// CSS paths used to locate each field on a film page
///
/// Keeping every path in one table means markup drift is fixed here and
/// nowhere else.
pub mod paths {
    pub const RELEASE_DATE: &str = "span.releasedate a";
    pub const JSON_LD: &str = r#"script[type="application/ld+json"]"#;
    pub const RUNTIME: &str = ".text-link.text-footer";
    pub const LANGUAGES: &str = r#"#tab-details .text-sluglist a[href*="/language/"]"#;
    pub const COUNTRIES: &str = r#"#tab-details a[href*="/country/"]"#;
    pub const GENRES: &str = r#"#tab-genres a[href*="/genre/"]"#;
    pub const DIRECTORS: &str = r#"section.production-masthead .credits a[href*="/director/"]"#;
    pub const DIRECTORS_FALLBACK: &str = r#"#tab-crew a[href*="/director/"]"#;
    pub const ACTORS: &str = r#"#tab-cast .cast-list a.text-slug, .cast-list.text-sluglist a.text-slug, .cast-list a[href^="/actor/"]"#;
}

/// Compiled selectors, one per field
///
/// A selector that fails to compile is kept as `None`; its field is then
/// always reported as absent while the other fields still extract.
#[derive(Debug)]
pub struct FieldSelectors {
    pub release_date: Option<Selector>,
    pub json_ld: Option<Selector>,
    pub runtime: Option<Selector>,
    pub languages: Option<Selector>,
    pub countries: Option<Selector>,
    pub genres: Option<Selector>,
    pub directors: Option<Selector>,
    pub directors_fallback: Option<Selector>,
    pub actors: Option<Selector>,
}

impl FieldSelectors {
    /// Compiles the standard film page paths
    pub fn standard() -> Self {
        Self {
            release_date: compile(paths::RELEASE_DATE),
            json_ld: compile(paths::JSON_LD),
            runtime: compile(paths::RUNTIME),
            languages: compile(paths::LANGUAGES),
            countries: compile(paths::COUNTRIES),
            genres: compile(paths::GENRES),
            directors: compile(paths::DIRECTORS),
            directors_fallback: compile(paths::DIRECTORS_FALLBACK),
            actors: compile(paths::ACTORS),
        }
    }
}

impl Default for FieldSelectors {
    fn default() -> Self {
        Self::standard()
    }
}

/// Compiles a CSS selector, logging instead of failing
pub fn compile(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::warn!("Invalid selector '{}': {:?}", css, e);
            None
        }
    }
}
