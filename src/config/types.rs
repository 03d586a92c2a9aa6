use serde::{Deserialize, Deserializer};
use std::fmt;
use std::num::NonZeroUsize;

/// Main configuration structure for Reel-Census
///
/// Every section is optional in the TOML file; missing keys fall back to the
/// values documented on each field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Crawl scheduling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Size limit of the film page worker pool (default 20)
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: usize,

    /// Hard ceiling on listing pages walked during discovery (default 1000)
    #[serde(rename = "max-listing-pages")]
    pub max_listing_pages: u32,

    /// Number of items reduced locally before one exclusive merge (default 50)
    #[serde(rename = "merge-batch-size")]
    pub merge_batch_size: usize,

    /// Log progress every N completed items (default 25)
    #[serde(rename = "progress-log-interval")]
    pub progress_log_interval: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 20,
            max_listing_pages: 1000,
            merge_batch_size: 50,
            progress_log_interval: 25,
        }
    }
}

/// HTTP session configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Total time allowed for one request attempt (milliseconds)
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Time allowed to establish a connection (milliseconds)
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,

    /// Attempts per URL, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Backoff unit; attempt n waits `backoff_base_ms * n` before retrying
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Idle keep-alive connections kept per host
    #[serde(rename = "pool-max-idle-per-host")]
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 15_000,
            connect_timeout_ms: 10_000,
            max_attempts: 3,
            backoff_base_ms: 100,
            pool_max_idle_per_host: 32,
        }
    }
}

/// Target site layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Root of the site; listing and film URLs are resolved against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum number of item links taken from one listing page
    #[serde(rename = "items-per-page")]
    pub items_per_page: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://letterboxd.com".to_string(),
            items_per_page: 72,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler (may be empty)
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "reel-census".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: String::new(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// `Name/Version (+ContactURL)`, or `Name/Version` when no contact URL is set.
    pub fn header_value(&self) -> String {
        if self.contact_url.is_empty() {
            format!("{}/{}", self.crawler_name, self.crawler_version)
        } else {
            format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, self.contact_url
            )
        }
    }
}

/// Presentation configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Rows shown per ranked table
    #[serde(rename = "top-n")]
    pub top_n: TopN,
}

/// Top-N truncation limit applied when displaying ranked tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopN {
    Limited(NonZeroUsize),
    Unlimited,
}

impl TopN {
    /// Returns how many rows to keep out of `len`
    pub fn take(&self, len: usize) -> usize {
        match self {
            Self::Limited(n) => len.min(n.get()),
            Self::Unlimited => len,
        }
    }

    /// Parses `"unlimited"`, `"-1"` or a positive integer
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unlimited") || s == "-1" {
            return Some(Self::Unlimited);
        }
        s.parse::<usize>()
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self::Limited)
    }
}

impl Default for TopN {
    fn default() -> Self {
        match NonZeroUsize::new(200) {
            Some(n) => Self::Limited(n),
            None => Self::Unlimited,
        }
    }
}

impl fmt::Display for TopN {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{}", n),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}

impl std::str::FromStr for TopN {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!(
                "expected a positive integer or \"unlimited\", got '{}'",
                s
            )
        })
    }
}

impl<'de> Deserialize<'de> for TopN {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        let parsed = match Raw::deserialize(deserializer)? {
            Raw::Number(-1) => Some(Self::Unlimited),
            Raw::Number(n) => usize::try_from(n)
                .ok()
                .and_then(NonZeroUsize::new)
                .map(Self::Limited),
            Raw::Text(s) => Self::parse(&s),
        };

        parsed.ok_or_else(|| {
            serde::de::Error::custom("top-n must be a positive integer or \"unlimited\"")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.crawler.max_concurrent_fetches, 20);
        assert_eq!(config.crawler.max_listing_pages, 1000);
        assert_eq!(config.http.max_attempts, 3);
        assert_eq!(config.site.items_per_page, 72);
        assert_eq!(config.display.top_n, TopN::Limited(NonZeroUsize::new(200).unwrap()));
    }

    #[test]
    fn test_top_n_parse() {
        assert_eq!(TopN::parse("unlimited"), Some(TopN::Unlimited));
        assert_eq!(TopN::parse("-1"), Some(TopN::Unlimited));
        assert_eq!(
            TopN::parse("10"),
            Some(TopN::Limited(NonZeroUsize::new(10).unwrap()))
        );
        assert_eq!(TopN::parse("0"), None);
        assert_eq!(TopN::parse("many"), None);
    }

    #[test]
    fn test_top_n_take() {
        let five = TopN::Limited(NonZeroUsize::new(5).unwrap());
        assert_eq!(five.take(3), 3);
        assert_eq!(five.take(9), 5);
        assert_eq!(TopN::Unlimited.take(9), 9);
    }

    #[test]
    fn test_user_agent_header() {
        let mut ua = UserAgentConfig {
            crawler_name: "Census".to_string(),
            crawler_version: "2.0".to_string(),
            contact_url: String::new(),
        };
        assert_eq!(ua.header_value(), "Census/2.0");

        ua.contact_url = "https://example.com/bot".to_string();
        assert_eq!(ua.header_value(), "Census/2.0 (+https://example.com/bot)");
    }
}
