//! Write-ahead journal of filesystem mutations, grouped into sessions.
//!
//! The mover appends a record for every directory it creates and every
//! file it moves. A session can later be rolled back exactly once, which
//! replays its records in reverse.

mod error;
#[allow(clippy::module_inception)]
mod journal;
mod store;
mod types;

pub use error::JournalError;
pub use journal::OperationJournal;
pub use store::{JournalStore, JsonFileJournalStore, MemoryJournalStore, JOURNAL_VERSION};
pub use types::{OperationRecord, RollbackError, RollbackResult, Session};
