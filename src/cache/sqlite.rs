//! SQLite cache backend
//!
//! Stores every parent key's table in one database file. Each `put` replaces
//! the key's rows inside a single transaction.

use crate::cache::schema::initialize_schema;
use crate::cache::traits::{CacheError, CacheResult, CacheStore};
use crate::cache::{EnumerationEntry, EnumerationTable};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// SQLite-backed cache store
pub struct SqliteCache {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteCache {
    /// Opens (or creates) the cache database at `path`
    pub fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory cache (for testing)
    pub fn open_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// When the table for `parent_key` was stored, if it is cached
    pub fn cached_at(&self, parent_key: &str) -> CacheResult<Option<DateTime<Utc>>> {
        let conn = self.conn();
        let stamp: Option<String> = conn
            .query_row(
                "SELECT cached_at FROM parents WHERE parent_key = ?1",
                params![parent_key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(stamp
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc)))
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves SQLite itself consistent
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CacheStore for SqliteCache {
    fn get(&self, parent_key: &str) -> CacheResult<Option<EnumerationTable>> {
        let conn = self.conn();

        let known: Option<String> = conn
            .query_row(
                "SELECT parent_key FROM parents WHERE parent_key = ?1",
                params![parent_key],
                |row| row.get(0),
            )
            .optional()?;
        if known.is_none() {
            return Ok(None);
        }

        let mut stmt = conn.prepare(
            "SELECT entry_json FROM entries WHERE parent_key = ?1 ORDER BY hashed_id",
        )?;
        let documents = stmt
            .query_map(params![parent_key], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let table = documents
            .iter()
            .map(|doc| serde_json::from_str::<EnumerationEntry>(doc))
            .collect::<Result<EnumerationTable, _>>()?;
        Ok(Some(table))
    }

    fn put(&self, parent_key: &str, table: &EnumerationTable) -> CacheResult<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM entries WHERE parent_key = ?1",
            params![parent_key],
        )?;
        tx.execute(
            "INSERT INTO parents (parent_key, cached_at) VALUES (?1, ?2)
             ON CONFLICT(parent_key) DO UPDATE SET cached_at = excluded.cached_at",
            params![parent_key, Utc::now().to_rfc3339()],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO entries (parent_key, hashed_id, department_id, entry_json)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for entry in table.entries() {
                insert.execute(params![
                    parent_key,
                    entry.department_id_hash,
                    entry.department_id,
                    serde_json::to_string(entry)?
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn remove(&self, parent_key: &str) -> CacheResult<bool> {
        // Entries go with their parent row (ON DELETE CASCADE)
        let conn = self.conn();
        let removed = conn.execute(
            "DELETE FROM parents WHERE parent_key = ?1",
            params![parent_key],
        )?;
        Ok(removed > 0)
    }

    fn location(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => ":memory:".to_string(),
        }
    }
}
