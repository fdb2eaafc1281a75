//! Error types for the cache module.

use thiserror::Error;

/// Errors raised by cache stores.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing database failed.
    #[error("Cache database error: {0}")]
    Database(String),

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("Cache store lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for CacheError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}
