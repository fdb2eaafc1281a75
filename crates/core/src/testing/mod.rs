//! Testing utilities and mock implementations.
//!
//! This module provides a mock oracle and filesystem fixtures so the
//! scheduler and organize runs can be exercised without a real
//! classification service.
//!
//! # Example
//!
//! ```rust,ignore
//! use sortvault_core::testing::{fixtures, MockOracle};
//!
//! let oracle = MockOracle::new();
//! oracle.set_verdict("a.pdf", fixtures::verdict("Documents")).await;
//! fixtures::write_file(dir.path(), "a.pdf", "pdf bytes").await;
//! ```

mod mock_oracle;

pub use mock_oracle::{MockOracle, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use crate::cache::{MemoryCacheStore, ResultCache};
    use crate::oracle::OracleVerdict;

    /// Create a verdict with no subcategory.
    pub fn verdict(category: &str) -> OracleVerdict {
        OracleVerdict::new(category)
    }

    /// Create a verdict with a subcategory.
    pub fn verdict_with_sub(category: &str, subcategory: &str) -> OracleVerdict {
        OracleVerdict::new(category).with_subcategory(subcategory)
    }

    /// Create a result cache backed by memory.
    pub fn memory_cache() -> Arc<ResultCache> {
        Arc::new(ResultCache::new(Arc::new(MemoryCacheStore::new())))
    }

    /// Write a file (and its parents) and return its path.
    pub async fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        let _ = tokio::fs::write(&path, contents).await;
        path
    }
}
