use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Sinta-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
}

impl Config {
    /// Builds a configuration with defaults for everything but the domain
    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self {
            source: SourceConfig {
                domain: domain.into(),
            },
            fetcher: FetcherConfig::default(),
            cache: CacheConfig::default(),
            crawl: CrawlConfig::default(),
        }
    }
}

/// Where the directory lives
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Base URL every page URL is built from
    pub domain: String,
}

/// HTTP fetching and dispatch configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// User agent sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Maximum number of in-flight page fetches per batch (0 = unbounded)
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: usize,

    /// Timeout for a single request, in seconds
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Timeout for establishing a connection, in seconds
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Overall deadline for one batch, in seconds (0 = none)
    #[serde(rename = "batch-deadline-secs")]
    pub batch_deadline_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("sinta-harvest/{}", env!("CARGO_PKG_VERSION")),
            max_concurrent_fetches: 16,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            batch_deadline_secs: 0,
        }
    }
}

impl FetcherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn batch_deadline(&self) -> Option<Duration> {
        (self.batch_deadline_secs > 0).then(|| Duration::from_secs(self.batch_deadline_secs))
    }
}

/// Storage backend for the enumeration cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// One JSON file per parent key
    #[default]
    Json,
    /// A single SQLite database
    Sqlite,
}

/// Enumeration cache configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Cache location; a directory for `json`, a database file for `sqlite`.
    /// Defaults to the user cache directory.
    pub directory: Option<PathBuf>,
}

/// Paginated listing crawl configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Consecutive empty listing pages that end a crawl
    #[serde(rename = "empty-pages-to-stop")]
    pub empty_pages_to_stop: u32,

    /// Hard cap on listing pages fetched per crawl
    #[serde(rename = "max-pages")]
    pub max_pages: Option<u32>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            empty_pages_to_stop: 1,
            max_pages: None,
        }
    }
}
