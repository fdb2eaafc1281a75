//! Types for the placer module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cache::ClassificationResult;

use super::error::PlacerError;

/// What to do when the destination path is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    /// Leave the source where it is.
    Skip,
    /// Replace the existing file.
    Overwrite,
    /// Pick the first free `name(n).ext`.
    #[default]
    Rename,
    /// Defer to the user. Reserved for interactive surfaces.
    Ask,
}

/// A request to move one classified file into its category folder.
#[derive(Debug, Clone)]
pub struct PlacementRequest {
    /// Directory the category folders live under.
    pub base_dir: PathBuf,
    /// File to move.
    pub path: PathBuf,
    pub category: String,
    pub subcategory: Option<String>,
    pub strategy: ConflictStrategy,
    /// Compute the destination without touching the filesystem.
    pub dry_run: bool,
    /// Journal session to record into, if any.
    pub session_id: Option<String>,
}

impl PlacementRequest {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        path: impl Into<PathBuf>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            path: path.into(),
            category: category.into(),
            subcategory: None,
            strategy: ConflictStrategy::default(),
            dry_run: false,
            session_id: None,
        }
    }

    /// Builds a request from a classification result.
    pub fn from_result(base_dir: impl Into<PathBuf>, result: &ClassificationResult) -> Self {
        let mut request = Self::new(base_dir, result.path.clone(), result.category.clone());
        request.subcategory = result.subcategory.clone();
        request
    }

    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    pub fn with_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// What happened to a single file.
#[derive(Debug)]
pub enum OperationOutcome {
    /// The file now lives at `destination`.
    Moved {
        source: PathBuf,
        destination: PathBuf,
    },
    /// The destination was taken and the strategy said to leave it.
    Skipped {
        source: PathBuf,
        destination: PathBuf,
    },
    /// Where the file would have gone.
    DryRun {
        source: PathBuf,
        destination: PathBuf,
    },
    /// Nothing was moved.
    Failed { source: PathBuf, error: PlacerError },
}

impl OperationOutcome {
    /// Whether the outcome is anything but a failure.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    pub fn source(&self) -> &PathBuf {
        match self {
            Self::Moved { source, .. }
            | Self::Skipped { source, .. }
            | Self::DryRun { source, .. }
            | Self::Failed { source, .. } => source,
        }
    }

    /// Final or intended destination, if one was computed.
    pub fn destination(&self) -> Option<&PathBuf> {
        match self {
            Self::Moved { destination, .. }
            | Self::Skipped { destination, .. }
            | Self::DryRun { destination, .. } => Some(destination),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&PlacerError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}
