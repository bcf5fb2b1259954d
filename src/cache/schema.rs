//! Database schema for the SQLite cache backend

/// SQL schema for the cache database
pub const SCHEMA_SQL: &str = r#"
-- One row per cached parent key, present even when its listing was empty
CREATE TABLE IF NOT EXISTS parents (
    parent_key TEXT PRIMARY KEY,
    cached_at TEXT NOT NULL
);

-- Enumeration entries, stored as JSON documents keyed by hashed id
CREATE TABLE IF NOT EXISTS entries (
    parent_key TEXT NOT NULL REFERENCES parents(parent_key) ON DELETE CASCADE,
    hashed_id TEXT NOT NULL,
    department_id TEXT NOT NULL,
    entry_json TEXT NOT NULL,
    PRIMARY KEY (parent_key, hashed_id)
);

CREATE INDEX IF NOT EXISTS idx_entries_department ON entries(parent_key, department_id);
"#;

/// Initializes the database schema
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        initialize_schema(&conn).unwrap();
        let result = initialize_schema(&conn);

        assert!(result.is_ok());
    }

    #[test]
    fn test_tables_exist_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        for table in ["parents", "entries"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }
}
