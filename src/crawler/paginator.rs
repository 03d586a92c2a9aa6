//! Listing discovery
//!
//! Walks `{base}/{user}/films/page/{N}/` from page 1, collecting film URLs
//! until a page has no "next" link. Continuation depends only on that link,
//! never on how many films a page held.

use crate::config::SiteConfig;
use crate::crawler::{FetchClient, FetchError};
use crate::extract::selectors::compile;
use crate::{CensusError, ConfigError};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Body markers the site serves for an unknown account
const NOT_FOUND_MARKERS: &[&str] = &["Sorry, we can't find the page", "Page not found"];

static POSTER: Lazy<Option<Selector>> =
    Lazy::new(|| compile(r#"div.react-component[data-component-class="LazyPoster"]"#));

static LEGACY_POSTER: Lazy<Option<Selector>> =
    Lazy::new(|| compile("div.film-poster[data-target-link]"));

static NEXT_PAGE: Lazy<Option<Selector>> = Lazy::new(|| {
    compile(
        r#"div.pagination a.next, a.next[rel="next"], div.paginate-nextprev a.next, .paginate-next"#,
    )
});

/// Film links and continuation flag read from one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Absolute film URLs, in page order
    pub links: Vec<String>,

    /// True if the page offers a link to the following page
    pub has_next: bool,
}

/// Result of walking a whole listing
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Distinct film URLs, in discovery order
    pub urls: Vec<String>,

    /// Listing pages fetched
    pub pages_visited: u32,

    /// True if the walk stopped at the page ceiling
    pub hit_ceiling: bool,

    /// True if the walk stopped because the run was cancelled
    pub cancelled: bool,
}

/// Builds the URL of one listing page
pub fn listing_url(base_url: &str, user: &str, page: u32) -> String {
    format!(
        "{}/{}/films/page/{}/",
        base_url.trim_end_matches('/'),
        user,
        page
    )
}

/// Returns true if the body is the site's "page not found" screen
pub fn is_not_found_page(html: &str) -> bool {
    NOT_FOUND_MARKERS.iter().any(|marker| html.contains(marker))
}

/// Reads up to `max_items` film links and the next-page flag from a listing page
pub fn parse_listing(html: &str, base: &Url, max_items: usize) -> ListingPage {
    let document = Html::parse_document(html);

    let mut links: Vec<String> = Vec::new();
    if let Some(selector) = POSTER.as_ref() {
        links.extend(document.select(selector).filter_map(|poster| {
            let element = poster.value();
            let href = match (element.attr("data-item-link"), element.attr("data-item-slug")) {
                (Some(link), _) if !link.trim().is_empty() => link.trim().to_string(),
                (_, Some(slug)) if !slug.trim().is_empty() => format!("/film/{}/", slug.trim()),
                _ => return None,
            };
            resolve(base, &href)
        }));
    }

    if links.is_empty() {
        if let Some(selector) = LEGACY_POSTER.as_ref() {
            links.extend(
                document
                    .select(selector)
                    .filter_map(|poster| poster.value().attr("data-target-link"))
                    .filter_map(|href| resolve(base, href.trim())),
            );
        }
    }

    links.truncate(max_items);

    let has_next = NEXT_PAGE
        .as_ref()
        .is_some_and(|selector| document.select(selector).next().is_some());

    ListingPage { links, has_next }
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    let url = base.join(href).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url.to_string()),
        _ => None,
    }
}

/// Walks the listing of `user` and returns every distinct film URL
///
/// # Errors
///
/// * `TargetNotFound` - page 1 is missing or shows the not-found screen
/// * `Discovery` - page 1 could not be fetched for any other reason
///
/// A failure on a later page ends the walk with what was collected so far.
pub async fn discover(
    client: &FetchClient,
    site: &SiteConfig,
    user: &str,
    max_pages: u32,
    cancel: &CancellationToken,
) -> Result<Discovery, CensusError> {
    let base = Url::parse(&site.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", site.base_url, e)))?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut discovery = Discovery::default();
    let mut page: u32 = 1;

    loop {
        if cancel.is_cancelled() {
            tracing::info!("Discovery cancelled after {} page(s)", discovery.pages_visited);
            discovery.cancelled = true;
            break;
        }

        if page > max_pages {
            tracing::debug!(
                "Listing page ceiling ({}) reached for '{}'; keeping {} films",
                max_pages,
                user,
                discovery.urls.len()
            );
            discovery.hit_ceiling = true;
            break;
        }

        let url = listing_url(base.as_str(), user, page);
        let fetched = tokio::select! {
            _ = cancel.cancelled() => {
                discovery.cancelled = true;
                break;
            }
            result = client.fetch(&url) => result,
        };

        let body = match fetched {
            Ok(body) => body,
            Err(e) => {
                if page == 1 {
                    return Err(first_page_error(user, e));
                }
                tracing::warn!("Stopping discovery at page {}: {}", page, e);
                break;
            }
        };

        if page == 1 && is_not_found_page(&body) {
            return Err(CensusError::TargetNotFound {
                user: user.to_string(),
            });
        }

        discovery.pages_visited += 1;
        let listing = parse_listing(&body, &base, site.items_per_page);
        let before = discovery.urls.len();
        for link in listing.links {
            if seen.insert(link.clone()) {
                discovery.urls.push(link);
            }
        }
        tracing::debug!(
            "Listing page {} yielded {} new film(s)",
            page,
            discovery.urls.len() - before
        );

        if !listing.has_next {
            break;
        }
        page += 1;
    }

    tracing::info!(
        "Discovered {} film(s) across {} page(s) for '{}'",
        discovery.urls.len(),
        discovery.pages_visited,
        user
    );

    Ok(discovery)
}

fn first_page_error(user: &str, error: FetchError) -> CensusError {
    if error.is_not_found() {
        CensusError::TargetNotFound {
            user: user.to_string(),
        }
    } else {
        CensusError::Discovery(error)
    }
}
