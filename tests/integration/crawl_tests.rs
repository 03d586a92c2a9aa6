//! Integration tests for the census pipeline
//!
//! These tests use wiremock to serve listing and film pages and run the
//! coordinator end-to-end against them.

use reel_census::config::Config;
use reel_census::crawler::{discover, FetchClient, FetchError};
use reel_census::{Category, CensusError, Coordinator, RunRequest, RunState};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER: &str = "cinephile";

/// Creates a configuration pointing at the mock server with fast retries
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.http.backoff_base_ms = 1;
    config.http.request_timeout_ms = 2_000;
    config.crawler.merge_batch_size = 2;
    config
}

fn listing_page(slugs: &[&str], has_next: bool) -> String {
    let posters: String = slugs
        .iter()
        .map(|slug| {
            format!(
                r#"<li><div class="react-component" data-component-class="LazyPoster" data-item-slug="{slug}" data-item-link="/film/{slug}/"></div></li>"#
            )
        })
        .collect();
    let next = if has_next {
        r#"<div class="pagination"><a class="next" href="/next/">Older</a></div>"#
    } else {
        ""
    };
    format!("<html><body><ul class=\"poster-list\">{posters}</ul>{next}</body></html>")
}

fn film_page(year: u32, languages: &[&str], runtime: Option<u32>) -> String {
    let languages: String = languages
        .iter()
        .map(|lang| {
            format!(r#"<a class="text-slug" href="/films/language/{lang}/">{lang}</a>"#)
        })
        .collect();
    let footer = match runtime {
        Some(minutes) => format!("{minutes}&nbsp;mins &nbsp; More at IMDb"),
        None => "More at IMDb".to_string(),
    };
    format!(
        r#"<html><body>
<section class="production-masthead"><span class="releasedate"><a href="/films/year/{year}/">{year}</a></span></section>
<div id="tab-details"><div class="text-sluglist">{languages}</div></div>
<p class="text-link text-footer">{footer}</p>
</body></html>"#
    )
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn listing_route(page: u32) -> String {
    format!("/{USER}/films/page/{page}/")
}

#[tokio::test]
async fn test_pagination_stops_without_next_link_and_deduplicates() {
    let server = MockServer::start().await;

    mount_html(&server, &listing_route(1), listing_page(&["alien", "brazil"], true)).await;
    mount_html(&server, &listing_route(2), listing_page(&["brazil", "casablanca"], false)).await;
    Mock::given(method("GET"))
        .and(path(listing_route(3)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    for slug in ["alien", "brazil", "casablanca"] {
        mount_html(
            &server,
            &format!("/film/{slug}/"),
            film_page(1985, &["English"], Some(100)),
        )
        .await;
    }

    let mut coordinator = Coordinator::new(create_test_config(&server.uri())).unwrap();
    let summary = coordinator.run(RunRequest::new(USER)).await.unwrap();

    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.items, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.counters.count(Category::Language, "English"), 3);
    assert_eq!(summary.counters.count(Category::Decade, "1980s"), 3);
    assert_eq!(summary.runtime_minutes, 300);
    assert!(!summary.cancelled);
    assert_eq!(coordinator.state(), RunState::Done);
}

#[tokio::test]
async fn test_unknown_account_fails_before_fetching_films() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(listing_route(1)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/film/alien/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri())).unwrap();
    let err = coordinator.run(RunRequest::new(USER)).await.unwrap_err();

    assert!(matches!(err, CensusError::TargetNotFound { ref user } if user == USER));
    assert_eq!(coordinator.state(), RunState::Failed);
}

#[tokio::test]
async fn test_not_found_marker_in_body_is_fatal() {
    let server = MockServer::start().await;

    mount_html(
        &server,
        &listing_route(1),
        "<html><body><h1>Sorry, we can't find the page you've requested.</h1></body></html>"
            .to_string(),
    )
    .await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri())).unwrap();
    let err = coordinator.run(RunRequest::new(USER)).await.unwrap_err();

    assert!(matches!(err, CensusError::TargetNotFound { .. }));
}

#[tokio::test]
async fn test_unreachable_listing_root_is_discovery_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(listing_route(1)))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri())).unwrap();
    let err = coordinator.run(RunRequest::new(USER)).await.unwrap_err();

    assert!(matches!(
        err,
        CensusError::Discovery(FetchError::Status { status: 503, attempts: 3, .. })
    ));
}

#[tokio::test]
async fn test_later_page_failure_keeps_collected_films() {
    let server = MockServer::start().await;

    mount_html(&server, &listing_route(1), listing_page(&["alien"], true)).await;
    Mock::given(method("GET"))
        .and(path(listing_route(2)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_html(&server, "/film/alien/", film_page(1979, &["English"], Some(117))).await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri())).unwrap();
    let summary = coordinator.run(RunRequest::new(USER)).await.unwrap();

    assert_eq!(summary.items, 1);
    assert_eq!(summary.runtime_minutes, 117);
}

#[tokio::test]
async fn test_transient_error_is_retried() {
    let server = MockServer::start().await;

    mount_html(&server, &listing_route(1), listing_page(&["heat"], false)).await;
    Mock::given(method("GET"))
        .and(path("/film/heat/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_html(&server, "/film/heat/", film_page(1995, &["English"], Some(170))).await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri())).unwrap();
    let summary = coordinator.run(RunRequest::new(USER)).await.unwrap();

    assert_eq!(summary.items, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.counters.count(Category::Decade, "1990s"), 1);
}

#[tokio::test]
async fn test_fetch_timeout_is_typed_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_millis(500)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri());
    config.http.request_timeout_ms = 100;
    config.http.max_attempts = 2;
    let client = FetchClient::new(&config.http, &config.user_agent).unwrap();

    let err = client
        .fetch(&format!("{}/slow/", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Timeout { attempts: 2, .. }));
}

#[tokio::test]
async fn test_not_found_film_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/film/gone/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri());
    let client = FetchClient::new(&config.http, &config.user_agent).unwrap();

    let err = client
        .fetch(&format!("{}/film/gone/", server.uri()))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_failed_films_are_excluded_from_totals() {
    let server = MockServer::start().await;

    mount_html(&server, &listing_route(1), listing_page(&["a", "b", "c"], false)).await;
    mount_html(&server, "/film/a/", film_page(2015, &["English"], Some(90))).await;
    mount_html(
        &server,
        "/film/b/",
        film_page(2004, &["English", "French", "English"], None),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/film/c/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri())).unwrap();
    let summary = coordinator.run(RunRequest::new(USER)).await.unwrap();

    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.items, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.counters.count(Category::Language, "English"), 2);
    assert_eq!(summary.counters.count(Category::Language, "French"), 1);
    assert_eq!(summary.counters.count(Category::Decade, "2010s"), 1);
    assert_eq!(summary.counters.count(Category::Decade, "2000s"), 1);
    assert_eq!(summary.runtime_minutes, 90);
    assert_eq!(summary.timed_items, 1);
    assert!((summary.percentage(2) - 100.0).abs() < 1e-9);
    assert_eq!(summary.average_runtime(), Some(90.0));
}

#[tokio::test]
async fn test_empty_listing_yields_empty_summary() {
    let server = MockServer::start().await;

    mount_html(&server, &listing_route(1), listing_page(&[], false)).await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri())).unwrap();
    let summary = coordinator.run(RunRequest::new(USER)).await.unwrap();

    assert_eq!(summary.items, 0);
    assert_eq!(summary.discovered, 0);
    assert!(summary.counters.is_empty());
    assert_eq!(coordinator.state(), RunState::Done);
}

#[tokio::test]
async fn test_progress_reaches_done() {
    let server = MockServer::start().await;

    mount_html(&server, &listing_route(1), listing_page(&["x", "y"], false)).await;
    mount_html(&server, "/film/x/", film_page(1960, &["Italian"], Some(100))).await;
    mount_html(&server, "/film/y/", film_page(1962, &["Italian"], Some(120))).await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri())).unwrap();
    let progress = coordinator.subscribe();
    let summary = coordinator
        .run(RunRequest::new(USER).with_concurrency(1))
        .await
        .unwrap();

    let last = *progress.borrow();
    assert_eq!(last.state, RunState::Done);
    assert_eq!(last.discovered, 2);
    assert_eq!(last.completed, 2);
    assert_eq!(summary.counters.count(Category::Language, "Italian"), 2);
}

#[tokio::test]
async fn test_cancellation_returns_partial_summary() {
    let server = MockServer::start().await;

    mount_html(&server, &listing_route(1), listing_page(&["long", "longer"], false)).await;
    Mock::given(method("GET"))
        .and(path_regex_film())
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(film_page(2001, &["English"], Some(150)))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri());
    config.http.request_timeout_ms = 10_000;
    let mut coordinator = Coordinator::new(config).unwrap();

    let mut progress = coordinator.subscribe();
    let token = coordinator.cancellation_token();
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let state = progress.borrow().state;
            if state == RunState::Fetching {
                token.cancel();
                break;
            }
        }
    });

    let summary = tokio::time::timeout(Duration::from_secs(3), coordinator.run(RunRequest::new(USER)))
        .await
        .expect("cancelled run should finish promptly")
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.discovered, 2);
    assert_eq!(summary.items, 0);
    assert_eq!(coordinator.state(), RunState::Done);
}

#[tokio::test]
async fn test_invalid_concurrency_makes_no_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri())).unwrap();
    let err = coordinator
        .run(RunRequest::new(USER).with_concurrency(0))
        .await
        .unwrap_err();

    assert!(matches!(err, CensusError::Config(_)));
}

#[tokio::test]
async fn test_discovery_stops_at_page_ceiling() {
    let server = MockServer::start().await;

    for page in 1..=3 {
        Mock::given(method("GET"))
            .and(path(listing_route(page)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(listing_page(&[format!("film-{page}").as_str()], true)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(listing_route(4)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri());
    let client = FetchClient::new(&config.http, &config.user_agent).unwrap();
    let discovery = discover(&client, &config.site, USER, 3, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(discovery.pages_visited, 3);
    assert_eq!(discovery.urls.len(), 3);
    assert!(discovery.hit_ceiling);
    assert!(!discovery.cancelled);
}

#[tokio::test]
async fn test_slow_film_times_out_while_others_complete() {
    let server = MockServer::start().await;

    mount_html(&server, &listing_route(1), listing_page(&["quick", "brisk", "stalled"], false)).await;
    mount_html(&server, "/film/quick/", film_page(1999, &["English"], Some(100))).await;
    mount_html(&server, "/film/brisk/", film_page(2003, &["Korean"], Some(120))).await;
    Mock::given(method("GET"))
        .and(path("/film/stalled/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(film_page(2010, &["English"], Some(90)))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let mut config = create_test_config(&server.uri());
    config.http.request_timeout_ms = 200;
    config.http.max_attempts = 1;
    let mut coordinator = Coordinator::new(config).unwrap();
    let summary = coordinator.run(RunRequest::new(USER)).await.unwrap();

    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.items, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.runtime_minutes, 220);
    assert_eq!(summary.counters.count(Category::Language, "English"), 1);
    assert_eq!(summary.counters.count(Category::Decade, "2010s"), 0);
    assert!(!summary.cancelled);
    assert_eq!(coordinator.state(), RunState::Done);
}

#[tokio::test]
async fn test_coordinator_recovers_after_abandoned_run() {
    let server = MockServer::start().await;

    mount_html(&server, &listing_route(1), listing_page(&["slow"], false)).await;
    Mock::given(method("GET"))
        .and(path("/film/slow/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(film_page(1977, &["English"], Some(121)))
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&server)
        .await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri())).unwrap();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(300), coordinator.run(RunRequest::new(USER))).await;
    assert!(abandoned.is_err());
    assert_eq!(coordinator.state(), RunState::Fetching);

    let summary = coordinator.run(RunRequest::new(USER)).await.unwrap();
    assert_eq!(summary.items, 1);
    assert_eq!(summary.runtime_minutes, 121);
    assert!(!summary.cancelled);
    assert_eq!(coordinator.state(), RunState::Done);
}

#[tokio::test]
async fn test_cancellation_applies_to_one_run_only() {
    let server = MockServer::start().await;

    mount_html(&server, &listing_route(1), listing_page(&["only"], false)).await;
    mount_html(&server, "/film/only/", film_page(1955, &["Japanese"], Some(207))).await;

    let mut coordinator = Coordinator::new(create_test_config(&server.uri())).unwrap();

    coordinator.cancellation_token().cancel();
    let cancelled = coordinator.run(RunRequest::new(USER)).await.unwrap();
    assert!(cancelled.cancelled);
    assert_eq!(cancelled.items, 0);

    let next = coordinator.run(RunRequest::new(USER)).await.unwrap();
    assert!(!next.cancelled);
    assert_eq!(next.discovered, 1);
    assert_eq!(next.items, 1);
    assert_eq!(next.counters.count(Category::Language, "Japanese"), 1);
    assert!(!coordinator.cancellation_token().is_cancelled());
}

fn path_regex_film() -> wiremock::matchers::PathRegexMatcher {
    wiremock::matchers::path_regex(r"^/film/[^/]+/$")
}
