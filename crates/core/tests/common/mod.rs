//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use sortvault_core::{
    testing::{fixtures, MockOracle},
    ClassificationScheduler, FsPlacer, OperationJournal, Organizer, PlacerConfig, ResultCache,
    SchedulerConfig,
};

/// Installs a test-writer subscriber once. Set `RUST_LOG` to see output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// A scratch directory, a mock oracle and an in-memory cache.
pub struct TestHarness {
    pub oracle: MockOracle,
    pub cache: Arc<ResultCache>,
    pub dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        init_tracing();
        Self {
            oracle: MockOracle::new(),
            cache: fixtures::memory_cache(),
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn path_str(&self) -> String {
        self.dir.path().to_string_lossy().to_string()
    }

    pub async fn write(&self, name: &str, contents: &str) -> PathBuf {
        fixtures::write_file(self.dir.path(), name, contents).await
    }

    pub fn scheduler(&self, config: SchedulerConfig) -> ClassificationScheduler {
        ClassificationScheduler::new(
            config,
            Arc::new(self.oracle.clone()),
            Arc::clone(&self.cache),
        )
    }

    /// An organizer over an in-memory journal.
    pub fn organizer(&self, config: SchedulerConfig) -> Organizer {
        let journal = Arc::new(OperationJournal::in_memory());
        let placer = FsPlacer::new(PlacerConfig::default(), Some(Arc::clone(&journal)));
        Organizer::new(self.scheduler(config), placer, journal)
    }
}
