//! SQLite-backed cache store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::error::CacheError;
use super::traits::CacheStore;
use super::types::CacheEntry;

/// SQLite-backed classification cache.
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    /// Opens (or creates) a cache database at the given path.
    pub fn new(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Database(e.to_string()))?;
        }
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory cache (useful for testing).
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CacheError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS classification_cache (
                path TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                category TEXT NOT NULL,
                subcategory TEXT,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (path, fingerprint)
            );

            CREATE INDEX IF NOT EXISTS idx_classification_cache_path
                ON classification_cache(path);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<CacheEntry> {
        let cached_at_str: String = row.get(4)?;
        let cached_at = DateTime::parse_from_rfc3339(&cached_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(CacheEntry {
            path: row.get(0)?,
            fingerprint: row.get(1)?,
            category: row.get(2)?,
            subcategory: row.get(3)?,
            cached_at,
        })
    }
}

impl CacheStore for SqliteCacheStore {
    fn get(&self, path: &str, fingerprint: &str) -> Result<Option<CacheEntry>, CacheError> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                "SELECT path, fingerprint, category, subcategory, cached_at FROM classification_cache WHERE path = ? AND fingerprint = ?",
                params![path, fingerprint],
                Self::row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO classification_cache (path, fingerprint, category, subcategory, cached_at) VALUES (?, ?, ?, ?, ?)",
            params![
                entry.path,
                entry.fingerprint,
                entry.category,
                entry.subcategory,
                entry.cached_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn len(&self) -> Result<usize, CacheError> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM classification_cache", [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }
}
