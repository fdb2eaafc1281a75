//! Trait definitions for the oracle module.

use async_trait::async_trait;
use std::path::Path;

use super::error::OracleError;
use super::types::{OracleOptions, OracleVerdict};

/// External service that assigns a category to a file.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Returns the name of this oracle implementation.
    fn name(&self) -> &str;

    /// Classifies a single file.
    ///
    /// Implementations report failures as typed [`OracleError`]s so the
    /// scheduler can decide on retries without inspecting message text.
    async fn classify(
        &self,
        path: &Path,
        options: &OracleOptions,
    ) -> Result<OracleVerdict, OracleError>;
}
