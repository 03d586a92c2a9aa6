use crate::config::types::{Config, CrawlerConfig, HttpConfig, SiteConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on the worker pool, shared by config and run requests
const MAX_CONCURRENCY: usize = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_site_config(&config.site)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates a worker concurrency limit
pub fn validate_concurrency(limit: usize) -> Result<(), ConfigError> {
    if limit == 0 || limit > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency limit must be between 1 and {}, got {}",
            MAX_CONCURRENCY, limit
        )));
    }
    Ok(())
}

/// Validates an account name before it is placed into a URL path
pub fn validate_user(user: &str) -> Result<(), ConfigError> {
    if user.is_empty() {
        return Err(ConfigError::Validation(
            "account name cannot be empty".to_string(),
        ));
    }

    if !user
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "account name must contain only ASCII letters, digits, '_' or '-', got '{}'",
            user
        )));
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_concurrency(config.max_concurrent_fetches)?;

    if config.max_listing_pages < 1 {
        return Err(ConfigError::Validation(
            "max_listing_pages must be >= 1".to_string(),
        ));
    }

    if config.merge_batch_size < 1 {
        return Err(ConfigError::Validation(
            "merge_batch_size must be >= 1".to_string(),
        ));
    }

    if config.progress_log_interval < 1 {
        return Err(ConfigError::Validation(
            "progress_log_interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.request_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_ms must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "connect_timeout_ms must be >= 1".to_string(),
        ));
    }

    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' has no host",
            config.base_url
        )));
    }

    if config.items_per_page < 1 {
        return Err(ConfigError::Validation(
            "items_per_page must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if !config.contact_url.is_empty() {
        Url::parse(&config.contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}
