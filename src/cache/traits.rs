//! Cache store trait and error types

use crate::cache::EnumerationTable;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt cache entry {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Could not determine a cache directory for this user")]
    NoCacheDir,
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Persistent store for enumeration tables, keyed by parent key
///
/// Implementations replace tables wholesale; there is no partial update.
pub trait CacheStore: Send + Sync {
    /// Loads the table stored for `parent_key`, if any
    fn get(&self, parent_key: &str) -> CacheResult<Option<EnumerationTable>>;

    /// Stores `table` for `parent_key`, replacing any previous table
    fn put(&self, parent_key: &str, table: &EnumerationTable) -> CacheResult<()>;

    /// Removes the table for `parent_key`
    ///
    /// Returns true if something was removed.
    fn remove(&self, parent_key: &str) -> CacheResult<bool>;

    /// Human-readable description of where tables live, for logging
    fn location(&self) -> String;
}
