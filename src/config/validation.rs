use crate::config::types::{Config, CrawlConfig, FetcherConfig, SourceConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_crawl_config(&config.crawl)?;
    Ok(())
}

/// Validates the base domain
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    if config.domain.trim().is_empty() {
        return Err(ConfigError::Validation("domain cannot be empty".to_string()));
    }

    let url = Url::parse(&config.domain)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid domain '{}': {}", config.domain, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "domain '{}' must use http or https",
            config.domain
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "domain '{}' has no host",
            config.domain
        )));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidUrl(format!(
            "domain '{}' cannot carry a query or fragment",
            config.domain
        )));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.max_concurrent_fetches > 1024 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 0 and 1024, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.empty_pages_to_stop < 1 {
        return Err(ConfigError::Validation(format!(
            "empty_pages_to_stop must be >= 1, got {}",
            config.empty_pages_to_stop
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}
