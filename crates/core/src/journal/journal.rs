//! Session-grouped journal of filesystem mutations.

use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::diagnostics::{DiagnosticEvent, DiagnosticsHandle};
use crate::placer::relocate;

use super::error::JournalError;
use super::store::{JournalStore, MemoryJournalStore};
use super::types::{OperationRecord, RollbackError, RollbackResult, Session};

/// Buffer used when a rollback move has to fall back to copying.
const ROLLBACK_COPY_BUFFER: usize = 1024 * 1024;

/// Records every mutation the mover performs and can undo a session.
///
/// Each session sits behind its own mutex, so appends to one session are
/// linearized while different sessions never wait on each other beyond the
/// brief map lookup.
pub struct OperationJournal {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    store: Box<dyn JournalStore>,
    diagnostics: Option<DiagnosticsHandle>,
}

impl OperationJournal {
    /// Creates an empty journal backed by `store`. Call [`restore`](Self::restore)
    /// to load previously persisted sessions.
    pub fn new(store: impl JournalStore + 'static) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            store: Box::new(store),
            diagnostics: None,
        }
    }

    /// Creates a journal that persists nowhere (useful for testing).
    pub fn in_memory() -> Self {
        Self::new(MemoryJournalStore::new())
    }

    /// Creates a journal and loads the persisted sessions.
    pub async fn open(store: impl JournalStore + 'static) -> Result<Self, JournalError> {
        let journal = Self::new(store);
        journal.restore().await?;
        Ok(journal)
    }

    /// Sets the diagnostics handle for rollback events.
    pub fn with_diagnostics(mut self, diagnostics: DiagnosticsHandle) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    async fn get(&self, session_id: &str) -> Result<Arc<Mutex<Session>>, JournalError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| JournalError::UnknownSession(session_id.to_string()))
    }

    /// Starts a new session and returns its id.
    pub async fn start_session(&self) -> String {
        let session = Session::new();
        let id = session.id.clone();
        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        info!(session_id = %id, "Started journal session");
        id
    }

    /// Fails unless the session exists and still accepts records.
    pub async fn ensure_open(&self, session_id: &str) -> Result<(), JournalError> {
        let session = self.get(session_id).await?;
        let session = session.lock().await;
        if session.rolled_back {
            return Err(JournalError::AlreadyRolledBack(session_id.to_string()));
        }
        if !session.is_open() {
            return Err(JournalError::SessionClosed(session_id.to_string()));
        }
        Ok(())
    }

    /// Appends a record to an open session.
    pub async fn record(
        &self,
        session_id: &str,
        record: OperationRecord,
    ) -> Result<(), JournalError> {
        let session = self.get(session_id).await?;
        let mut session = session.lock().await;
        if session.rolled_back {
            return Err(JournalError::AlreadyRolledBack(session_id.to_string()));
        }
        if !session.is_open() {
            return Err(JournalError::SessionClosed(session_id.to_string()));
        }
        debug!(
            session_id,
            path = %record.primary_path().display(),
            index = session.operations.len(),
            "Journaled operation"
        );
        session.operations.push(record);
        Ok(())
    }

    /// Marks a session as ended. Ending twice is a no-op.
    pub async fn end_session(&self, session_id: &str) -> Result<(), JournalError> {
        let session = self.get(session_id).await?;
        let mut session = session.lock().await;
        if session.rolled_back {
            return Err(JournalError::AlreadyRolledBack(session_id.to_string()));
        }
        if session.ended_at.is_none() {
            session.ended_at = Some(Utc::now());
            info!(
                session_id,
                operations = session.operations.len(),
                "Ended journal session"
            );
        }
        Ok(())
    }

    /// Undoes every operation of a session in strict reverse order.
    ///
    /// Not transactional: a failed step is recorded and the remaining
    /// (earlier) operations are still attempted. The session is marked
    /// rolled back once the full pass has run, and cannot be rolled back
    /// again.
    pub async fn rollback(&self, session_id: &str) -> Result<RollbackResult, JournalError> {
        let session = self.get(session_id).await?;
        let mut session = session.lock().await;
        if session.rolled_back {
            return Err(JournalError::AlreadyRolledBack(session_id.to_string()));
        }

        info!(
            session_id,
            operations = session.operations.len(),
            "Rolling back session"
        );

        let mut reverted = 0;
        let mut directories_removed = 0;
        let mut errors = Vec::new();

        for (index, record) in session.operations.iter().enumerate().rev() {
            match record {
                OperationRecord::Move {
                    source,
                    destination,
                    ..
                } => match undo_move(source, destination).await {
                    Ok(()) => {
                        debug!(
                            from = %destination.display(),
                            to = %source.display(),
                            "Reverted move"
                        );
                        reverted += 1;
                    }
                    Err(message) => {
                        warn!(index, error = %message, "Failed to revert move");
                        errors.push(RollbackError {
                            operation_index: index,
                            message,
                        });
                    }
                },
                OperationRecord::CreateDirectory { path, .. } => {
                    // Only succeeds on empty directories; anything else stays.
                    match fs::remove_dir(path).await {
                        Ok(()) => {
                            reverted += 1;
                            directories_removed += 1;
                        }
                        Err(e) => {
                            debug!(path = %path.display(), error = %e, "Left directory in place");
                        }
                    }
                }
            }
        }

        session.rolled_back = true;
        if session.ended_at.is_none() {
            session.ended_at = Some(Utc::now());
        }

        let result = RollbackResult {
            session_id: session_id.to_string(),
            reverted,
            directories_removed,
            errors,
        };

        info!(
            session_id,
            reverted = result.reverted,
            errors = result.errors.len(),
            "Rollback finished"
        );

        if let Some(ref diagnostics) = self.diagnostics {
            diagnostics
                .emit(DiagnosticEvent::RollbackCompleted {
                    session_id: session_id.to_string(),
                    reverted: result.reverted,
                    errors: result.errors.len(),
                })
                .await;
        }

        Ok(result)
    }

    /// Snapshot of a single session.
    pub async fn session(&self, session_id: &str) -> Option<Session> {
        let session = self.get(session_id).await.ok()?;
        let snapshot = session.lock().await.clone();
        Some(snapshot)
    }

    /// Snapshots of all sessions, newest first.
    pub async fn sessions(&self) -> Vec<Session> {
        let handles: Vec<Arc<Mutex<Session>>> =
            self.sessions.read().await.values().cloned().collect();

        let mut sessions = Vec::with_capacity(handles.len());
        for handle in handles {
            sessions.push(handle.lock().await.clone());
        }
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions
    }

    /// Writes all sessions to the backing store.
    pub async fn persist(&self) -> Result<(), JournalError> {
        let mut sessions = self.sessions().await;
        sessions.reverse();
        self.store.save(&sessions)?;
        debug!(sessions = sessions.len(), "Persisted journal");
        Ok(())
    }

    /// Replaces the in-memory sessions with the persisted ones.
    pub async fn restore(&self) -> Result<(), JournalError> {
        let loaded = self.store.load()?;
        let count = loaded.len();
        let restored = loaded
            .into_iter()
            .map(|s| (s.id.clone(), Arc::new(Mutex::new(s))))
            .collect();
        *self.sessions.write().await = restored;
        debug!(sessions = count, "Restored journal");
        Ok(())
    }
}

async fn undo_move(source: &Path, destination: &Path) -> Result<(), String> {
    if !destination.exists() {
        return Err(format!("{} no longer exists", destination.display()));
    }
    if source.exists() {
        return Err(format!(
            "{} is occupied, refusing to overwrite",
            source.display()
        ));
    }
    if let Some(parent) = source.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("Failed to recreate {}: {}", parent.display(), e))?;
    }
    relocate(destination, source, false, ROLLBACK_COPY_BUFFER)
        .await
        .map_err(|e| e.to_string())
}
