//! Lookup/store semantics on top of a cache store.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::error::CacheError;
use super::traits::CacheStore;
use super::types::{cache_key, CacheEntry, CacheStats, ClassificationResult};

/// Content-addressed classification cache.
///
/// An entry is trusted only when its fingerprint matches the current one
/// exactly; anything else is a miss. Un-fingerprinted work is never cached.
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// Wraps a cache store.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the backing store.
    pub fn backend(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Looks up a cached classification for `path` at `fingerprint`.
    pub fn lookup(
        &self,
        path: &Path,
        fingerprint: Option<&str>,
    ) -> Result<Option<ClassificationResult>, CacheError> {
        let Some(fingerprint) = fingerprint.filter(|f| !f.is_empty()) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let found = self
            .store
            .get(&cache_key(path), fingerprint)?
            .filter(|entry| entry.fingerprint == fingerprint)
            .and_then(|entry| {
                ClassificationResult::new(
                    path,
                    entry.category,
                    entry.subcategory,
                    Some(entry.fingerprint),
                )
                .ok()
            });

        match &found {
            Some(_) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(path = %path.display(), fingerprint, "Cache hit");
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(path = %path.display(), fingerprint, "Cache miss");
            }
        }

        Ok(found)
    }

    /// Stores a classification.
    ///
    /// Returns `false` without touching the store when the result carries
    /// no fingerprint.
    pub fn store(&self, result: &ClassificationResult) -> Result<bool, CacheError> {
        let Some(entry) = CacheEntry::from_result(result) else {
            return Ok(false);
        };
        self.store.put(&entry)?;
        Ok(true)
    }

    /// Hit and miss counters since creation.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
