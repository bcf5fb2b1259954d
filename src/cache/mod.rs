//! Enumeration cache for department listings
//!
//! Departments can only be addressed by hashed ids that are discovered by
//! crawling an affiliation's paginated department listing. That crawl is
//! memoized per affiliation (the parent key) in a [`CacheStore`]:
//! - A hit serves the whole stored table, with no freshness check
//! - A miss crawls every listing page, stores the result, then serves it
//! - Entries are never patched; a table is replaced or removed as a whole
//!
//! The store sits behind a trait so the JSON-file and SQLite backends are
//! interchangeable.

mod enumerator;
mod json;
mod schema;
mod sqlite;
mod traits;

pub use enumerator::{CrawlPolicy, Enumerator};
pub use json::JsonFileCache;
pub use sqlite::SqliteCache;
pub use traits::{CacheError, CacheResult, CacheStore};

use crate::config::{CacheBackend, CacheConfig};
use crate::ids::Identifiers;
use crate::SintaError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Header summary of the affiliation a listing page belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliationSummary {
    pub id: String,
    pub code: String,
    pub name: String,
    pub univ_abbrev: String,
    pub url: String,
    pub location: String,
}

/// One department row discovered while crawling a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationEntry {
    /// Human-readable department code
    pub department_id: String,
    pub name: String,
    pub level: String,
    pub full_name: String,
    pub url: String,
    /// Internal hashed id; unique within one affiliation
    pub department_id_hash: String,
    /// Hashed id of the owning affiliation, needed to build profile URLs
    pub univ_id_hash: String,
    pub affiliation: AffiliationSummary,
}

/// The full enumeration for one parent key, indexed by hashed id
///
/// Serializes as a JSON object whose keys are hashed ids. Iteration order is
/// the key order, so filtering is deterministic across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnumerationTable {
    entries: BTreeMap<String, EnumerationEntry>,
}

impl EnumerationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry under its hashed id, replacing any previous row
    pub fn insert(&mut self, entry: EnumerationEntry) -> Option<EnumerationEntry> {
        self.entries.insert(entry.department_id_hash.clone(), entry)
    }

    pub fn get(&self, hashed_id: &str) -> Option<&EnumerationEntry> {
        self.entries.get(hashed_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &EnumerationEntry> {
        self.entries.values()
    }

    /// Selects the rows whose human-readable id is one of `ids`
    ///
    /// # Returns
    ///
    /// * `Ok(rows)` - At least one row matched
    /// * `Err(SintaError::NoMatchingEntries)` - Nothing matched; this is always
    ///   a caller error (unknown id) or a corrupt cache, never "no data"
    pub fn select(
        &self,
        parent_key: &str,
        ids: &Identifiers,
    ) -> Result<Vec<&EnumerationEntry>, SintaError> {
        let rows: Vec<_> = self
            .entries
            .values()
            .filter(|entry| ids.contains(&entry.department_id))
            .collect();

        if rows.is_empty() {
            return Err(SintaError::NoMatchingEntries {
                parent: parent_key.to_string(),
                ids: ids.to_strings(),
            });
        }
        Ok(rows)
    }
}

impl FromIterator<EnumerationEntry> for EnumerationTable {
    fn from_iter<I: IntoIterator<Item = EnumerationEntry>>(iter: I) -> Self {
        let mut table = Self::new();
        for entry in iter {
            table.insert(entry);
        }
        table
    }
}

/// Derives the storage name for a parent key
///
/// Keys made only of ASCII alphanumerics, `-` and `_` are used as-is; anything
/// else is replaced by the SHA-256 hex digest of the key so it is always a
/// safe file name.
pub fn storage_name(parent_key: &str) -> String {
    let safe = !parent_key.is_empty()
        && parent_key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if safe {
        parent_key.to_string()
    } else {
        hex::encode(Sha256::digest(parent_key.as_bytes()))
    }
}

/// Default cache location under the user's cache directory
pub fn default_cache_dir() -> Result<PathBuf, CacheError> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.cache_dir().join("sinta").join("department"))
        .ok_or(CacheError::NoCacheDir)
}

/// Opens the store described by the cache configuration
///
/// # Returns
///
/// * `Ok(store)` - The configured backend, rooted at the configured or default location
/// * `Err(CacheError)` - The location could not be resolved or opened
pub fn open_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    let dir = match &config.directory {
        Some(dir) => dir.clone(),
        None => default_cache_dir()?,
    };

    Ok(match config.backend {
        CacheBackend::Json => Arc::new(JsonFileCache::new(dir)),
        CacheBackend::Sqlite => {
            let path = if config.directory.is_some() {
                dir
            } else {
                dir.join("departments.db")
            };
            Arc::new(SqliteCache::open(&path)?)
        }
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::entry;
    use super::*;

    fn table() -> EnumerationTable {
        [entry("A", "1"), entry("B", "2"), entry("C", "3")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_select_matching_rows() {
        let table = table();
        let ids = Identifiers::parse(["A", "C"]).unwrap();

        let rows = table.select("404", &ids).unwrap();
        let hashes: Vec<_> = rows.iter().map(|r| r.department_id_hash.as_str()).collect();
        assert_eq!(hashes, vec!["1", "3"]);
    }

    #[test]
    fn test_select_unknown_id_is_fatal() {
        let table = table();
        let ids = Identifiers::parse(["Z"]).unwrap();

        let err = table.select("404", &ids).unwrap_err();
        match err {
            SintaError::NoMatchingEntries { parent, ids } => {
                assert_eq!(parent, "404");
                assert_eq!(ids, vec!["Z"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_select_on_empty_table_is_fatal() {
        let ids = Identifiers::parse(["A"]).unwrap();
        assert!(EnumerationTable::new().select("404", &ids).is_err());
    }

    #[test]
    fn test_table_is_keyed_by_hash() {
        let mut table = table();
        let replaced = table.insert(entry("A2", "1"));

        assert_eq!(replaced.unwrap().department_id, "A");
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("1").unwrap().department_id, "A2");
    }

    #[test]
    fn test_table_serializes_as_object_keyed_by_hash() {
        let value = serde_json::to_value(table()).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 3);
        assert_eq!(object["2"]["department_id"], "B");
        assert_eq!(object["2"]["affiliation"]["code"], "001002");
    }

    #[test]
    fn test_storage_name() {
        assert_eq!(storage_name("404"), "404");
        assert_eq!(storage_name("univ_x-1"), "univ_x-1");

        let hashed = storage_name("../etc/passwd");
        assert_eq!(hashed.len(), 64);
        assert!(hashed.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hashed, storage_name("../etc/passwd"));
    }
}
