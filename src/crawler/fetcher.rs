//! HTTP fetcher
//!
//! One [`FetchClient`] is built per run and shared by discovery and every
//! worker. The underlying `reqwest::Client` pools keep-alive connections, so
//! cloning the fetcher is cheap and never opens a new session.
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 404 / 410 | Immediate failure, never retried |
//! | Other non-2xx | Retry up to `max-attempts` |
//! | Timeout | Retry up to `max-attempts` |
//! | Connection error | Retry up to `max-attempts` |
//! | Body read error | Retry up to `max-attempts` |
//!
//! The delay before attempt `n + 1` is `backoff-base-ms * n`.

use crate::config::{HttpConfig, UserAgentConfig};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Typed failure of a single page fetch, after retries
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("{url} returned HTTP {status} after {attempts} attempt(s)")]
    Status {
        url: String,
        status: u16,
        attempts: u32,
    },

    #[error("{url} timed out after {attempts} attempt(s)")]
    Timeout { url: String, attempts: u32 },

    #[error("{url} unreachable after {attempts} attempt(s): {message}")]
    Network {
        url: String,
        message: String,
        attempts: u32,
    },

    #[error("failed to read body of {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    /// True for responses saying the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Status { status, .. }
                if *status == StatusCode::NOT_FOUND.as_u16() || *status == StatusCode::GONE.as_u16()
        )
    }

    fn is_permanent(&self) -> bool {
        self.is_not_found()
    }
}

/// Pooled, retrying page fetcher
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    max_attempts: u32,
    backoff_base: Duration,
}

impl FetchClient {
    /// Builds the shared client
    ///
    /// The user agent has the form `Name/Version (+ContactURL)`.
    pub fn new(http: &HttpConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.8"));

        let client = Client::builder()
            .user_agent(user_agent.header_value())
            .default_headers(headers)
            .timeout(Duration::from_millis(http.request_timeout_ms))
            .connect_timeout(Duration::from_millis(http.connect_timeout_ms))
            .pool_max_idle_per_host(http.pool_max_idle_per_host)
            .tcp_keepalive(Duration::from_secs(60))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            max_attempts: http.max_attempts.max(1),
            backoff_base: Duration::from_millis(http.backoff_base_ms),
        })
    }

    /// Number of attempts made before a transient failure is returned
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fetches a page body, retrying transient failures
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once(url, attempt).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_permanent() || attempt >= self.max_attempts => {
                    tracing::debug!("Giving up on {}: {}", url, e);
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.backoff_base * attempt;
                    tracing::debug!(
                        "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        url,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn fetch_once(&self, url: &str, attempt: u32) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, &e, attempt))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                attempts: attempt,
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    attempts: attempt,
                }
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }
}

/// Maps a transport error onto the fetch taxonomy
fn classify(url: &str, error: &reqwest::Error, attempt: u32) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            attempts: attempt,
        }
    } else {
        let message = if error.is_connect() {
            "connection failed".to_string()
        } else {
            error.to_string()
        };
        FetchError::Network {
            url: url.to_string(),
            message,
            attempts: attempt,
        }
    }
}
