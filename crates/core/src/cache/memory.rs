//! In-memory cache store.

use std::collections::HashMap;
use std::sync::RwLock;

use super::error::CacheError;
use super::traits::CacheStore;
use super::types::CacheEntry;

/// Cache store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<(String, String), CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, path: &str, fingerprint: &str) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::LockPoisoned)?;
        Ok(entries
            .get(&(path.to_string(), fingerprint.to_string()))
            .cloned())
    }

    fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::LockPoisoned)?;
        entries.insert(
            (entry.path.clone(), entry.fingerprint.clone()),
            entry.clone(),
        );
        Ok(())
    }

    fn len(&self) -> Result<usize, CacheError> {
        let entries = self.entries.read().map_err(|_| CacheError::LockPoisoned)?;
        Ok(entries.len())
    }
}
