//! JSON-file cache backend
//!
//! One pretty-printed JSON object per parent key, stored as
//! `<dir>/<storage_name(parent_key)>.json`.

use crate::cache::traits::{CacheError, CacheResult, CacheStore};
use crate::cache::{storage_name, EnumerationTable};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Cache backend writing one JSON file per parent key
#[derive(Debug, Clone)]
pub struct JsonFileCache {
    dir: PathBuf,
}

impl JsonFileCache {
    /// Creates a cache rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `parent_key`'s table
    pub fn path_for(&self, parent_key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", storage_name(parent_key)))
    }
}

impl CacheStore for JsonFileCache {
    fn get(&self, parent_key: &str) -> CacheResult<Option<EnumerationTable>> {
        let path = self.path_for(parent_key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        let table = serde_json::from_str(&content)
            .map_err(|source| CacheError::Corrupt { path, source })?;
        Ok(Some(table))
    }

    fn put(&self, parent_key: &str, table: &EnumerationTable) -> CacheResult<()> {
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(parent_key);
        let content = serde_json::to_string_pretty(table)?;

        // Write to a sibling file and rename so readers never see a partial table
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|source| CacheError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| CacheError::Io { path, source })?;
        Ok(())
    }

    fn remove(&self, parent_key: &str) -> CacheResult<bool> {
        let path = self.path_for(parent_key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}
