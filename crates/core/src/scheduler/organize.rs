//! Classify-then-move runs over a directory, journaled for undo.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{CacheStore, MemoryCacheStore, ResultCache, SqliteCacheStore};
use crate::config::Config;
use crate::guard::{validate_path_with, GuardOptions};
use crate::journal::{JsonFileJournalStore, OperationJournal, RollbackResult};
use crate::oracle::Oracle;
use crate::placer::{ConflictStrategy, FsPlacer, OperationOutcome, Placer, PlacementRequest};

use super::error::SchedulerError;
use super::runner::ClassificationScheduler;
use super::types::{ClassifyOptions, ItemFailure};

/// Options for a single organize run.
#[derive(Debug, Clone, Default)]
pub struct OrganizeOptions {
    pub classify: ClassifyOptions,
    /// Conflict strategy. Falls back to the placer's default.
    pub strategy: Option<ConflictStrategy>,
    /// Report destinations without moving anything or opening a session.
    pub dry_run: bool,
    /// Directory the category folders are created in. Defaults to the
    /// organized directory.
    pub base_dir: Option<String>,
}

impl OrganizeOptions {
    pub fn with_classify_options(mut self, classify: ClassifyOptions) -> Self {
        self.classify = classify;
        self
    }

    pub fn with_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<String>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }
}

/// What an organize run did, file by file.
#[derive(Debug, Default)]
pub struct OrganizeReport {
    /// Journal session of the run. `None` for dry runs.
    pub session_id: Option<String>,
    pub moved: Vec<OperationOutcome>,
    pub skipped: Vec<OperationOutcome>,
    pub dry_run: Vec<OperationOutcome>,
    pub failed_placements: Vec<OperationOutcome>,
    pub classification_failures: Vec<ItemFailure>,
}

impl OrganizeReport {
    /// Whether every file was classified and placed.
    pub fn is_clean(&self) -> bool {
        self.failed_placements.is_empty() && self.classification_failures.is_empty()
    }

    fn push(&mut self, outcome: OperationOutcome) {
        match outcome {
            OperationOutcome::Moved { .. } => self.moved.push(outcome),
            OperationOutcome::Skipped { .. } => self.skipped.push(outcome),
            OperationOutcome::DryRun { .. } => self.dry_run.push(outcome),
            OperationOutcome::Failed { .. } => self.failed_placements.push(outcome),
        }
    }
}

/// Drives a scheduler, a placer and a journal through a full run.
pub struct Organizer {
    scheduler: ClassificationScheduler,
    placer: FsPlacer,
    journal: Arc<OperationJournal>,
    guard: GuardOptions,
}

impl Organizer {
    /// `placer` should share `journal`, or moves will not be undoable.
    pub fn new(
        scheduler: ClassificationScheduler,
        placer: FsPlacer,
        journal: Arc<OperationJournal>,
    ) -> Self {
        Self {
            scheduler,
            placer,
            journal,
            guard: GuardOptions::default(),
        }
    }

    /// Builds every component from configuration.
    ///
    /// Without a cache path the cache lives in memory; without a journal
    /// path sessions are not persisted across processes.
    pub async fn from_config(
        config: &Config,
        oracle: Arc<dyn Oracle>,
    ) -> Result<Self, SchedulerError> {
        let store: Arc<dyn CacheStore> = match config.cache.path {
            Some(ref path) => Arc::new(SqliteCacheStore::new(path)?),
            None => Arc::new(MemoryCacheStore::new()),
        };
        let cache = Arc::new(ResultCache::new(store));

        let journal = match config.journal.path {
            Some(ref path) => OperationJournal::open(JsonFileJournalStore::new(path)).await?,
            None => OperationJournal::in_memory(),
        };
        let journal = Arc::new(journal);

        let scheduler = ClassificationScheduler::new(config.scheduler.clone(), oracle, cache);
        let placer = FsPlacer::new(config.placer.clone(), Some(Arc::clone(&journal)));
        Ok(Self::new(scheduler, placer, journal))
    }

    pub fn with_guard_options(mut self, guard: GuardOptions) -> Self {
        self.guard = guard;
        self
    }

    pub fn scheduler(&self) -> &ClassificationScheduler {
        &self.scheduler
    }

    pub fn journal(&self) -> &Arc<OperationJournal> {
        &self.journal
    }

    /// Classifies every file in `directory` and moves it into its category
    /// folder.
    pub async fn organize(
        &self,
        directory: &str,
        options: &OrganizeOptions,
    ) -> Result<OrganizeReport, SchedulerError> {
        let directory = validate_path_with(directory, &self.guard)?;
        let base_dir = match options.base_dir {
            Some(ref base) => validate_path_with(base, &self.guard)?,
            None => directory.clone(),
        };
        let strategy = options
            .strategy
            .unwrap_or(self.placer.config().default_strategy);

        let files = self.scheduler.enumerate(&directory).await?;

        let session_id = if options.dry_run {
            None
        } else {
            Some(self.journal.start_session().await)
        };

        info!(
            directory = %directory.display(),
            files = files.len(),
            dry_run = options.dry_run,
            session_id = session_id.as_deref().unwrap_or("-"),
            "Organizing directory"
        );

        let batch = self.scheduler.classify_items(files, &options.classify).await;

        let requests: Vec<PlacementRequest> = batch
            .results
            .iter()
            .map(|result| {
                let mut request = PlacementRequest::from_result(base_dir.clone(), result)
                    .with_strategy(strategy)
                    .with_dry_run(options.dry_run);
                request.session_id = session_id.clone();
                request
            })
            .collect();

        let outcomes: Vec<OperationOutcome> = stream::iter(requests.iter())
            .map(|request| self.placer.place(request))
            .buffer_unordered(self.scheduler.config().concurrency.max(1))
            .collect()
            .await;

        let mut report = OrganizeReport {
            session_id: session_id.clone(),
            classification_failures: batch.failures,
            ..Default::default()
        };
        for outcome in outcomes {
            report.push(outcome);
        }
        for list in [
            &mut report.moved,
            &mut report.skipped,
            &mut report.dry_run,
            &mut report.failed_placements,
        ] {
            list.sort_by(|a, b| a.source().cmp(b.source()));
        }

        if let Some(ref id) = session_id {
            self.journal.end_session(id).await?;
            self.journal.persist().await?;
        }

        if !report.is_clean() {
            warn!(
                failed_placements = report.failed_placements.len(),
                classification_failures = report.classification_failures.len(),
                "Organize run finished with failures"
            );
        }
        info!(
            moved = report.moved.len(),
            skipped = report.skipped.len(),
            planned = report.dry_run.len(),
            "Organize run finished"
        );

        Ok(report)
    }

    /// Rolls back a previous run and persists the journal.
    pub async fn undo(&self, session_id: &str) -> Result<RollbackResult, SchedulerError> {
        let result = self.journal.rollback(session_id).await?;
        self.journal.persist().await?;
        Ok(result)
    }
}
