//! Trait definitions for the placer module.

use async_trait::async_trait;

use super::types::{OperationOutcome, PlacementRequest};

/// Moves classified files into their category folders.
///
/// Placement never returns an error: every failure is folded into
/// [`OperationOutcome::Failed`] so a batch keeps going.
#[async_trait]
pub trait Placer: Send + Sync {
    /// Returns the name of this placer implementation.
    fn name(&self) -> &str;

    /// Places one file according to the request.
    async fn place(&self, request: &PlacementRequest) -> OperationOutcome;
}
