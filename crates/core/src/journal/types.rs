//! Types for the operation journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A single filesystem mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationRecord {
    /// A file was moved from `source` to `destination`.
    Move {
        source: PathBuf,
        destination: PathBuf,
        timestamp: DateTime<Utc>,
    },
    /// A directory was created.
    CreateDirectory {
        path: PathBuf,
        timestamp: DateTime<Utc>,
    },
}

impl OperationRecord {
    pub fn moved(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::Move {
            source: source.into(),
            destination: destination.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn created_directory(path: impl Into<PathBuf>) -> Self {
        Self::CreateDirectory {
            path: path.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Move { timestamp, .. } | Self::CreateDirectory { timestamp, .. } => *timestamp,
        }
    }

    /// Path most relevant to the record, for log lines.
    pub fn primary_path(&self) -> &Path {
        match self {
            Self::Move { destination, .. } => destination,
            Self::CreateDirectory { path, .. } => path,
        }
    }
}

/// A batch of operations that can be rolled back as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub operations: Vec<OperationRecord>,
    #[serde(default)]
    pub rolled_back: bool,
}

impl Session {
    /// Creates a fresh session with a random id.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            ended_at: None,
            operations: Vec::new(),
            rolled_back: false,
        }
    }

    /// Whether the session still accepts records.
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none() && !self.rolled_back
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Failure to undo one operation during rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackError {
    /// Index of the record in the session's operation list.
    pub operation_index: usize,
    pub message: String,
}

/// Result of rolling back a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackResult {
    pub session_id: String,
    /// Operations successfully undone (moves and removed directories).
    pub reverted: usize,
    /// Directories removed. Included in `reverted`.
    pub directories_removed: usize,
    /// Per-operation failures, in the order they were hit.
    pub errors: Vec<RollbackError>,
}

impl RollbackResult {
    /// Whether every move was undone.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_with_discriminator() {
        let record = OperationRecord::moved("/in/a.txt", "/in/Documents/a.txt");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "move");
        assert_eq!(json["source"], "/in/a.txt");

        let dir = OperationRecord::created_directory("/in/Documents");
        let json = serde_json::to_value(&dir).unwrap();
        assert_eq!(json["type"], "create_directory");
    }

    #[test]
    fn test_session_lifecycle_flags() {
        let mut session = Session::new();
        assert!(session.is_open());

        session.ended_at = Some(Utc::now());
        assert!(!session.is_open());

        let mut rolled = Session::new();
        rolled.rolled_back = true;
        assert!(!rolled.is_open());
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(Session::new().id, Session::new().id);
    }
}
