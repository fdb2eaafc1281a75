use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::oracle::FailureKind;

/// Events surfaced to the diagnostics collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    /// An oracle failure that no rule could classify.
    UnknownFailure {
        path: PathBuf,
        error: String,
        attempt: u32,
        oracle: String,
    },

    /// An item was dropped from the result set.
    ItemFailed {
        path: PathBuf,
        kind: FailureKind,
        attempts: u32,
        error: String,
    },

    /// A journal session was rolled back.
    RollbackCompleted {
        session_id: String,
        reverted: usize,
        errors: usize,
    },
}

impl DiagnosticEvent {
    /// Short name of the event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::UnknownFailure { .. } => "unknown_failure",
            Self::ItemFailed { .. } => "item_failed",
            Self::RollbackCompleted { .. } => "rollback_completed",
        }
    }
}
