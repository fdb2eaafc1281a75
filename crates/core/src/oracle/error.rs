//! Typed oracle failures and their classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure returned by an oracle call.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    /// Connection-level failure (refused, reset, DNS).
    #[error("Network error: {0}")]
    Network(String),

    /// The call did not complete in time.
    #[error("Oracle call timed out after {0:?}")]
    Timeout(Duration),

    /// The service refused the call because of quota or rate limits.
    #[error("Rate limited (retry after {retry_after_ms:?} ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    /// Credentials were missing or rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The service answered with an error status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The file cannot be classified (unsupported, corrupt, too large).
    #[error("Invalid file {path}: {reason}")]
    InvalidFile { path: PathBuf, reason: String },

    /// The service answered but the payload made no sense.
    #[error("Invalid oracle response: {0}")]
    InvalidResponse(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Classification of a failed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Network,
    ApiLimit,
    Auth,
    ApiError,
    InvalidFile,
    Unknown,
    /// The scheduler stopped admitting work before the item started.
    /// Never produced by a classifier.
    Aborted,
}

impl FailureKind {
    /// Only network failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::ApiLimit => "api-limit",
            Self::Auth => "auth",
            Self::ApiError => "api-error",
            Self::InvalidFile => "invalid-file",
            Self::Unknown => "unknown",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a raw oracle failure to a [`FailureKind`].
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &OracleError) -> FailureKind;
}

/// Structural classification of [`OracleError`] variants.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl ErrorClassifier for DefaultClassifier {
    fn classify(&self, error: &OracleError) -> FailureKind {
        match error {
            OracleError::Network(_) | OracleError::Timeout(_) => FailureKind::Network,
            OracleError::RateLimited { .. } => FailureKind::ApiLimit,
            OracleError::Auth(_) => FailureKind::Auth,
            OracleError::Api { .. } => FailureKind::ApiError,
            OracleError::InvalidFile { .. } => FailureKind::InvalidFile,
            OracleError::InvalidResponse(_) | OracleError::Other(_) => FailureKind::Unknown,
        }
    }
}

impl<F> ErrorClassifier for F
where
    F: Fn(&OracleError) -> FailureKind + Send + Sync,
{
    fn classify(&self, error: &OracleError) -> FailureKind {
        self(error)
    }
}
