//! Durable storage for journal sessions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::error::JournalError;
use super::types::Session;

/// Current on-disk format version.
pub const JOURNAL_VERSION: u64 = 1;

/// Load/save boundary for journal sessions.
///
/// The journal always hands over the complete session list, so an
/// implementation is free to rewrite the whole document or append.
pub trait JournalStore: Send + Sync {
    /// Loads every persisted session.
    fn load(&self) -> Result<Vec<Session>, JournalError>;

    /// Persists the full session list.
    fn save(&self, sessions: &[Session]) -> Result<(), JournalError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct JournalDocument {
    version: u64,
    sessions: Vec<Session>,
}

#[derive(Debug, Deserialize)]
struct VersionProbe {
    version: Option<u64>,
}

/// Versioned JSON document on disk.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so readers never observe a half-written journal.
#[derive(Debug, Clone)]
pub struct JsonFileJournalStore {
    path: PathBuf,
}

impl JsonFileJournalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl JournalStore for JsonFileJournalStore {
    fn load(&self) -> Result<Vec<Session>, JournalError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(JournalError::io(&self.path, e)),
        };

        // Check the version before touching the session payload.
        let probe: VersionProbe = serde_json::from_str(&contents)
            .map_err(|e| JournalError::Serialization(e.to_string()))?;
        match probe.version {
            Some(JOURNAL_VERSION) => {}
            Some(other) => return Err(JournalError::UnsupportedVersion(other)),
            None => {
                return Err(JournalError::Serialization(
                    "journal document has no version".to_string(),
                ))
            }
        }

        let document: JournalDocument = serde_json::from_str(&contents)
            .map_err(|e| JournalError::Serialization(e.to_string()))?;
        Ok(document.sessions)
    }

    fn save(&self, sessions: &[Session]) -> Result<(), JournalError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| JournalError::io(parent, e))?;
        }

        let document = JournalDocument {
            version: JOURNAL_VERSION,
            sessions: sessions.to_vec(),
        };
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| JournalError::Serialization(e.to_string()))?;

        let temp = self.temp_path();
        std::fs::write(&temp, json).map_err(|e| JournalError::io(&temp, e))?;
        std::fs::rename(&temp, &self.path).map_err(|e| JournalError::io(&self.path, e))?;
        Ok(())
    }
}

/// In-memory store. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryJournalStore {
    sessions: Arc<Mutex<Vec<Session>>>,
}

impl MemoryJournalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JournalStore for MemoryJournalStore {
    fn load(&self) -> Result<Vec<Session>, JournalError> {
        Ok(self
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn save(&self, sessions: &[Session]) -> Result<(), JournalError> {
        *self.sessions.lock().unwrap_or_else(|e| e.into_inner()) = sessions.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::OperationRecord;
    use tempfile::TempDir;

    fn session_with_move() -> Session {
        let mut session = Session::new();
        session
            .operations
            .push(OperationRecord::created_directory("/in/Documents"));
        session
            .operations
            .push(OperationRecord::moved("/in/a.txt", "/in/Documents/a.txt"));
        session
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileJournalStore::new(temp.path().join("journal.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileJournalStore::new(temp.path().join("state/journal.json"));
        let session = session_with_move();

        store.save(std::slice::from_ref(&session)).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded, vec![session]);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_document_is_versioned() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("journal.json");
        JsonFileJournalStore::new(&path)
            .save(&[session_with_move()])
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], JOURNAL_VERSION);
        assert_eq!(raw["sessions"][0]["operations"][1]["type"], "move");
    }

    #[test]
    fn test_unknown_version_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("journal.json");
        // The session payload is garbage on purpose: it must never be parsed.
        std::fs::write(&path, r#"{"version": 2, "sessions": [{"nonsense": true}]}"#).unwrap();

        let result = JsonFileJournalStore::new(&path).load();
        assert!(matches!(result, Err(JournalError::UnsupportedVersion(2))));
    }

    #[test]
    fn test_missing_version_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("journal.json");
        std::fs::write(&path, r#"{"sessions": []}"#).unwrap();

        let result = JsonFileJournalStore::new(&path).load();
        assert!(matches!(result, Err(JournalError::Serialization(_))));
    }

    #[test]
    fn test_memory_store_clones_share_state() {
        let store = MemoryJournalStore::new();
        let other = store.clone();
        store.save(&[Session::new()]).unwrap();
        assert_eq!(other.load().unwrap().len(), 1);
    }
}
