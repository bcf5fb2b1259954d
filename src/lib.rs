//! Sinta-Harvest: a concurrent record fetcher for the SINTA research directory
//!
//! This crate fetches researcher, affiliation and department profiles from a
//! paginated web directory, extracts fixed fields from each page and returns
//! them as uniform records. Department lookups go through a read-through
//! enumeration cache keyed by the parent affiliation.
//!
//! Batches tolerate partial failure: a page that cannot be fetched or parsed is
//! dropped from the result instead of failing the call. Callers that need to
//! know which identifiers were dropped should use the `*_report` methods on
//! [`SintaClient`], or reconcile their input against the returned ids.

pub mod cache;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod extract;
pub mod fetch;
pub mod ids;
pub mod output;
pub mod record;

use thiserror::Error;

/// Main error type for Sinta-Harvest operations
#[derive(Debug, Error)]
pub enum SintaError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] fetch::FetchError),

    #[error("Extraction error: {0}")]
    Extract(#[from] extract::ExtractError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("No matching entries for ids [{}] under parent {parent}", .ids.join(", "))]
    NoMatchingEntries { parent: String, ids: Vec<String> },

    #[error("Listing for parent {parent} has no entries")]
    EmptyEnumeration { parent: String },

    #[error("Identifier must not be empty")]
    EmptyIdentifier,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SintaError {
    /// Returns true for per-item failures that a batch absorbs as "no record"
    ///
    /// Network and parse failures degrade; caller input and configuration
    /// errors do not.
    pub fn is_degradable(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Extract(_))
    }
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

    #[error("Unknown output format '{0}' (expected dict, list or dataframe)")]
    UnknownOutputFormat(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Sinta-Harvest operations
pub type Result<T> = std::result::Result<T, SintaError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use client::SintaClient;
pub use config::Config;
pub use fetch::{BatchReport, Dispatcher};
pub use ids::{Identifier, Identifiers};
pub use output::{format_output, Output, OutputFormat, Table};
pub use record::{AffiliationRecord, AuthorRecord, DepartmentRecord, Record};
