//! Error types for the journal module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the operation journal.
#[derive(Debug, Error)]
pub enum JournalError {
    /// No session with this id exists.
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// The session was already rolled back.
    #[error("Session already rolled back: {0}")]
    AlreadyRolledBack(String),

    /// The session has ended and accepts no more records.
    #[error("Session is closed: {0}")]
    SessionClosed(String),

    /// The persisted journal uses a format version this build cannot read.
    #[error("Unsupported journal version: {0}")]
    UnsupportedVersion(u64),

    /// Reading or writing the journal file failed.
    #[error("Journal I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted journal could not be encoded or decoded.
    #[error("Journal serialization error: {0}")]
    Serialization(String),
}

impl JournalError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
