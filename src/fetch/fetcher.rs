//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the pipeline:
//! - Building the HTTP client with timeouts and user agent
//! - GET requests for profile and listing pages
//! - Error classification (timeout, unreachable, HTTP status)
//!
//! There is no retry: a failed page is reported once and the caller decides
//! whether that degrades or aborts.

use crate::config::FetcherConfig;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

/// Errors from fetching a single page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Host unreachable for {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("HTTP error for {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    fn classify(url: &Url, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            Self::Timeout { url }
        } else if err.is_connect() {
            Self::Unreachable {
                url,
                message: err.to_string(),
            }
        } else {
            Self::Network { url, source: err }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sinta_harvest::config::FetcherConfig;
/// use sinta_harvest::fetch::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page fetcher shared by every worker of a batch
///
/// Cloning is cheap; clones share the client's connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = build_http_client(config).map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetches `url` and returns the body of a 200 response
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The page body
    /// * `Err(FetchError)` - Network failure or any non-200 status
    pub async fn get_page(&self, url: &Url) -> Result<String, FetchError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::classify(url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::classify(url, e))
    }
}
