//! Types for the scheduler module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::cache::ClassificationResult;
use crate::hasher::{Fingerprinter, HashError};
use crate::oracle::{FailureKind, OracleOptions};

/// A file queued for classification.
///
/// The fingerprint is computed at most once, on first use.
#[derive(Debug)]
pub struct WorkItem {
    path: PathBuf,
    fingerprint: OnceCell<String>,
}

impl WorkItem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fingerprint: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the fingerprint, computing it on first call.
    pub async fn fingerprint(&self, fingerprinter: &Fingerprinter) -> Result<&str, HashError> {
        self.fingerprint
            .get_or_try_init(|| fingerprinter.fingerprint(&self.path))
            .await
            .map(String::as_str)
    }
}

/// Where an item is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Hashing,
    CacheCheck,
    CacheHit,
    CacheMiss,
    Classifying,
    /// Waiting to make call number `n + 1`.
    Retry(u32),
    Done,
    Failed,
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Hashing => write!(f, "hashing"),
            Self::CacheCheck => write!(f, "cache_check"),
            Self::CacheHit => write!(f, "cache_hit"),
            Self::CacheMiss => write!(f, "cache_miss"),
            Self::Classifying => write!(f, "classifying"),
            Self::Retry(n) => write!(f, "retry({n})"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// An item that was dropped from the results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    /// Oracle calls made before giving up.
    pub attempts: u32,
    pub error: String,
}

/// Called once for every failed item.
pub type FailureCallback = Arc<dyn Fn(ItemFailure) + Send + Sync>;

/// Per-run options.
#[derive(Debug, Clone, Default)]
pub struct ClassifyOptions {
    /// Forwarded unchanged to the oracle.
    pub oracle: OracleOptions,
}

impl ClassifyOptions {
    pub fn with_oracle_options(mut self, options: OracleOptions) -> Self {
        self.oracle = options;
        self
    }
}

/// Results and failures of one scheduling run, each sorted by path.
#[derive(Debug, Clone, Default)]
pub struct ClassificationBatch {
    pub results: Vec<ClassificationResult>,
    pub failures: Vec<ItemFailure>,
}

impl ClassificationBatch {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.failures.is_empty()
    }

    pub fn total(&self) -> usize {
        self.results.len() + self.failures.len()
    }
}
