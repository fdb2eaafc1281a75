//! Error types for the scheduler module.

use std::path::PathBuf;
use thiserror::Error;

use crate::cache::CacheError;
use crate::guard::GuardError;
use crate::journal::JournalError;

/// Errors that abort a whole run. Per-item failures never surface here.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The directory to classify does not exist or is not a directory.
    #[error("Invalid directory {path}: {reason}")]
    InvalidDirectory { path: PathBuf, reason: String },

    /// The directory was rejected by the path guard.
    #[error(transparent)]
    Guard(#[from] GuardError),

    /// The directory could not be listed.
    #[error("Failed to read directory {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),
}

impl SchedulerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
