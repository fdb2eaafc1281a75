//! Types for the result cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Outcome of classifying a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Absolute path of the classified file.
    pub path: PathBuf,
    /// Category assigned by the oracle. Never empty.
    pub category: String,
    /// Optional subcategory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// Fingerprint of the file at classification time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Returned when a classification carries an empty category.
#[derive(Debug, Clone, Error)]
#[error("Classification for {path} has an empty category")]
pub struct EmptyCategoryError {
    pub path: PathBuf,
}

impl ClassificationResult {
    /// Creates a result, rejecting blank categories.
    ///
    /// Blank subcategories are normalized to `None`.
    pub fn new(
        path: impl Into<PathBuf>,
        category: impl Into<String>,
        subcategory: Option<String>,
        fingerprint: Option<String>,
    ) -> Result<Self, EmptyCategoryError> {
        let path = path.into();
        let category = category.into().trim().to_string();
        if category.is_empty() {
            return Err(EmptyCategoryError { path });
        }

        let subcategory = subcategory
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            path,
            category,
            subcategory,
            fingerprint,
        })
    }
}

/// A persisted cache row keyed by `(path, fingerprint)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub path: String,
    pub fingerprint: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Builds an entry from a fingerprinted result.
    ///
    /// Returns `None` when the result has no fingerprint.
    pub fn from_result(result: &ClassificationResult) -> Option<Self> {
        let fingerprint = result.fingerprint.as_ref().filter(|f| !f.is_empty())?;
        Some(Self {
            path: cache_key(&result.path),
            fingerprint: fingerprint.clone(),
            category: result.category.clone(),
            subcategory: result.subcategory.clone(),
            cached_at: Utc::now(),
        })
    }
}

/// Hit and miss counters for a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// String form of a path used as the cache key.
pub(crate) fn cache_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_blank_category() {
        let result = ClassificationResult::new("/tmp/a.txt", "  ", None, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_new_trims_and_drops_blank_subcategory() {
        let result =
            ClassificationResult::new("/tmp/a.txt", " Documents ", Some(" ".into()), None).unwrap();
        assert_eq!(result.category, "Documents");
        assert_eq!(result.subcategory, None);
    }

    #[test]
    fn test_entry_requires_fingerprint() {
        let unhashed = ClassificationResult::new("/tmp/a.txt", "Documents", None, None).unwrap();
        assert!(CacheEntry::from_result(&unhashed).is_none());

        let empty =
            ClassificationResult::new("/tmp/a.txt", "Documents", None, Some(String::new())).unwrap();
        assert!(CacheEntry::from_result(&empty).is_none());

        let hashed = ClassificationResult::new(
            "/tmp/a.txt",
            "Documents",
            Some("Invoices".into()),
            Some("abcd".into()),
        )
        .unwrap();
        let entry = CacheEntry::from_result(&hashed).unwrap();
        assert_eq!(entry.path, "/tmp/a.txt");
        assert_eq!(entry.fingerprint, "abcd");
        assert_eq!(entry.subcategory.as_deref(), Some("Invoices"));
    }
}
