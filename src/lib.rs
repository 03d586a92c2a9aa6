//! Reel-Census: a film diary census
//!
//! This crate crawls the paginated film listing of one account, fetches every
//! linked film page, extracts categorical and numeric facts from each page and
//! aggregates them into frequency tables plus a runtime summary.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod state;
pub mod stats;

use thiserror::Error;

/// Main error type for Reel-Census operations
#[derive(Debug, Error)]
pub enum CensusError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Account '{user}' not found")]
    TargetNotFound { user: String },

    #[error("Listing root could not be fetched: {0}")]
    Discovery(#[source] crawler::FetchError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunState,
        to: state::RunState,
    },

    #[error("Record error: {0}")]
    Record(#[from] output::RecordError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Reel-Census operations
pub type Result<T> = std::result::Result<T, CensusError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, RunRequest};
pub use extract::{ExtractionPolicy, ItemFacts};
pub use state::{Progress, RunState};
pub use stats::{AggregateCounters, Aggregator, Category, RunSummary};
