//! Error types for the placer module.

use std::path::PathBuf;
use thiserror::Error;

use crate::journal::JournalError;

/// Errors that can occur while resolving or performing a move.
#[derive(Debug, Error)]
pub enum PlacerError {
    /// The computed destination escapes the base directory.
    #[error("Destination {destination} escapes base directory {base_dir}")]
    SecurityViolation {
        base_dir: PathBuf,
        destination: PathBuf,
    },

    /// The destination is taken and the strategy is `Skip`.
    #[error("Destination already exists, skipping: {destination}")]
    ConflictSkip { destination: PathBuf },

    /// Every rename candidate was taken.
    #[error("No free name for {destination} after {attempts} attempts")]
    TooManyConflicts {
        destination: PathBuf,
        attempts: usize,
    },

    /// The conflict strategy has no non-interactive implementation.
    #[error("Conflict strategy not implemented: {0}")]
    StrategyNotImplemented(&'static str),

    /// Source file not found.
    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// The source path has no usable file name.
    #[error("Invalid file name: {path}")]
    InvalidFileName { path: PathBuf },

    /// Failed to create destination directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to move/rename file.
    #[error("Failed to move file from {source} to {destination}")]
    MoveFailed {
        source: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to copy file.
    #[error("Failed to copy file from {source} to {destination}")]
    CopyFailed {
        source: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// The move happened but could not be journaled.
    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlacerError {
    /// Creates a copy failed error.
    pub fn copy_failed(source: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::CopyFailed {
            source,
            destination,
            error,
        }
    }

    /// Creates a move failed error.
    pub fn move_failed(source: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::MoveFailed {
            source,
            destination,
            error,
        }
    }

    /// Whether this error is the result of a conflict policy rather than a fault.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::ConflictSkip { .. }
                | Self::TooManyConflicts { .. }
                | Self::StrategyNotImplemented(_)
        )
    }
}
