//! Storage trait for the result cache.

use super::error::CacheError;
use super::types::CacheEntry;

/// Durable key-value storage keyed by `(path, fingerprint)`.
///
/// Implementations must tolerate concurrent writers. Writing the same key
/// twice replaces the row; a different fingerprint for the same path is a
/// different key.
pub trait CacheStore: Send + Sync {
    /// Returns the entry stored under exactly this key.
    fn get(&self, path: &str, fingerprint: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Stores an entry.
    fn put(&self, entry: &CacheEntry) -> Result<(), CacheError>;

    /// Number of stored entries.
    fn len(&self) -> Result<usize, CacheError>;

    /// Whether the store holds no entries.
    fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}
