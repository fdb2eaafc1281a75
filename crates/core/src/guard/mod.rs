//! Validation and normalization of user-supplied paths.
//!
//! Every path that enters the core from the outside (the directory to
//! organize, an explicit base directory) goes through [`validate_path`]
//! before anything touches the filesystem.

mod validator;

pub use validator::{
    normalize_path, validate_path, validate_path_with, GuardOptions, MAX_FILENAME_LEN,
};

use thiserror::Error;

/// Errors produced by path validation.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The path was rejected.
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The current working directory could not be resolved.
    #[error("Failed to resolve current directory")]
    CurrentDir(#[source] std::io::Error),
}

impl GuardError {
    pub(crate) fn invalid(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
