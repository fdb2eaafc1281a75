//! Diagnostic events for failures that need later investigation.
//!
//! The core only emits; storing or shipping events is up to whoever holds
//! the receiver.

mod events;
mod handle;

pub use events::*;
pub use handle::*;
