//! Conflict resolution and atomic moves into category folders.
//!
//! `FsPlacer` computes `base_dir/category[/subcategory]/file_name`, refuses
//! anything that escapes `base_dir`, resolves name conflicts and moves the
//! file with a rename (falling back to copy and delete across devices).
//! When given a journal and a session id, every created directory and
//! every move is recorded so the run can be undone.
//!
//! # Example
//!
//! ```ignore
//! use sortvault_core::placer::{FsPlacer, Placer, PlacementRequest};
//!
//! let placer = FsPlacer::new(PlacerConfig::default(), Some(journal));
//! let request = PlacementRequest::new("/home/me/inbox", "/home/me/inbox/a.pdf", "Documents")
//!     .with_session(&session_id);
//!
//! match placer.place(&request).await {
//!     OperationOutcome::Moved { destination, .. } => println!("-> {}", destination.display()),
//!     other => println!("{:?}", other),
//! }
//! ```

mod config;
mod conflict;
mod error;
mod fs_placer;
mod traits;
mod types;

pub use config::PlacerConfig;
pub use conflict::{resolve_conflict, ConflictResolver, Reservation, MAX_RENAME_ATTEMPTS};
pub use error::PlacerError;
pub use fs_placer::{compute_destination, FsPlacer};
pub(crate) use fs_placer::relocate;
pub use traits::Placer;
pub use types::{ConflictStrategy, OperationOutcome, PlacementRequest};
