//! Bounded-concurrency classification of a directory's files.

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::cache::{ClassificationResult, ResultCache};
use crate::diagnostics::{DiagnosticEvent, DiagnosticsHandle};
use crate::hasher::Fingerprinter;
use crate::oracle::{
    DefaultClassifier, ErrorClassifier, FailureKind, Oracle, OracleError, OracleVerdict,
};

use super::config::SchedulerConfig;
use super::error::SchedulerError;
use super::metrics::SchedulerMetrics;
use super::retry::RetryPolicy;
use super::types::{
    ClassificationBatch, ClassifyOptions, FailureCallback, ItemFailure, ItemState, WorkItem,
};

/// Classifies files through an oracle, consulting the cache first.
///
/// At most `concurrency` items are in flight at once. Transient (network)
/// failures are retried with linear backoff; every other failure drops the
/// item from the results and is reported through the failure callback and
/// the diagnostics channel.
pub struct ClassificationScheduler {
    config: SchedulerConfig,
    policy: RetryPolicy,
    oracle: Arc<dyn Oracle>,
    cache: Arc<ResultCache>,
    fingerprinter: Fingerprinter,
    classifier: Arc<dyn ErrorClassifier>,
    metrics: Option<SchedulerMetrics>,
    diagnostics: Option<DiagnosticsHandle>,
    on_failure: Option<FailureCallback>,
    aborted: AtomicBool,
}

/// Keeps the in-flight gauge honest even when an item bails out early.
struct InFlight<'a>(Option<&'a SchedulerMetrics>);

impl<'a> InFlight<'a> {
    fn enter(metrics: Option<&'a SchedulerMetrics>) -> Self {
        if let Some(m) = metrics {
            m.in_flight.inc();
        }
        Self(metrics)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(m) = self.0 {
            m.in_flight.dec();
        }
    }
}

impl ClassificationScheduler {
    pub fn new(config: SchedulerConfig, oracle: Arc<dyn Oracle>, cache: Arc<ResultCache>) -> Self {
        let policy = RetryPolicy::from(&config.retry);
        Self {
            config,
            policy,
            oracle,
            cache,
            fingerprinter: Fingerprinter::default(),
            classifier: Arc::new(DefaultClassifier),
            metrics: None,
            diagnostics: None,
            on_failure: None,
            aborted: AtomicBool::new(false),
        }
    }

    /// Replaces the default structural error classifier.
    pub fn with_classifier(mut self, classifier: impl ErrorClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn with_metrics(mut self, metrics: SchedulerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticsHandle) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Sets a callback invoked once per failed item.
    pub fn with_failure_callback(
        mut self,
        callback: impl Fn(ItemFailure) + Send + Sync + 'static,
    ) -> Self {
        self.on_failure = Some(Arc::new(callback));
        self
    }

    pub fn with_fingerprinter(mut self, fingerprinter: Fingerprinter) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Stops admitting new items. Items already running finish normally;
    /// the rest are reported as [`FailureKind::Aborted`].
    pub fn abort(&self) {
        if !self.aborted.swap(true, Ordering::SeqCst) {
            info!("Classification aborted, no new items will start");
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Clears a previous [`abort`](Self::abort).
    pub fn reset_abort(&self) {
        self.aborted.store(false, Ordering::SeqCst);
    }

    /// Lists the regular, non-hidden files directly inside `directory`,
    /// sorted by path.
    pub async fn enumerate(&self, directory: &Path) -> Result<Vec<PathBuf>, SchedulerError> {
        match fs::metadata(directory).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(SchedulerError::InvalidDirectory {
                    path: directory.to_path_buf(),
                    reason: "not a directory".to_string(),
                })
            }
            Err(e) => {
                return Err(SchedulerError::InvalidDirectory {
                    path: directory.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        }

        let mut entries = fs::read_dir(directory)
            .await
            .map_err(|e| SchedulerError::io(directory, e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SchedulerError::io(directory, e))?
        {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            match fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable entry"),
            }
        }

        files.sort();
        Ok(files)
    }

    /// Classifies every file directly inside `directory`.
    ///
    /// Failed items are left out of the returned results.
    pub async fn classify_all(
        &self,
        directory: &Path,
        options: &ClassifyOptions,
    ) -> Result<Vec<ClassificationResult>, SchedulerError> {
        let files = self.enumerate(directory).await?;
        Ok(self.classify_items(files, options).await.results)
    }

    /// Classifies an explicit list of files.
    pub async fn classify_items(
        &self,
        paths: Vec<PathBuf>,
        options: &ClassifyOptions,
    ) -> ClassificationBatch {
        let total = paths.len();
        info!(
            items = total,
            concurrency = self.config.concurrency,
            oracle = self.oracle.name(),
            "Starting classification"
        );

        let outcomes: Vec<Result<ClassificationResult, ItemFailure>> = stream::iter(paths)
            .map(|path| self.process(WorkItem::new(path), options))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut batch = ClassificationBatch::default();
        for outcome in outcomes {
            match outcome {
                Ok(result) => batch.results.push(result),
                Err(failure) => batch.failures.push(failure),
            }
        }
        batch.results.sort_by(|a, b| a.path.cmp(&b.path));
        batch.failures.sort_by(|a, b| a.path.cmp(&b.path));

        info!(
            items = total,
            classified = batch.results.len(),
            failed = batch.failures.len(),
            "Classification finished"
        );
        batch
    }

    fn transition(&self, item: &WorkItem, state: ItemState) {
        debug!(path = %item.path().display(), state = %state, "Item state");
    }

    async fn process(
        &self,
        item: WorkItem,
        options: &ClassifyOptions,
    ) -> Result<ClassificationResult, ItemFailure> {
        self.transition(&item, ItemState::Pending);

        if self.is_aborted() {
            return Err(self.fail(
                &item,
                FailureKind::Aborted,
                0,
                "aborted before start".to_string(),
            ));
        }

        let _in_flight = InFlight::enter(self.metrics.as_ref());

        self.transition(&item, ItemState::Hashing);
        let fingerprint = match item.fingerprint(&self.fingerprinter).await {
            Ok(fingerprint) => fingerprint.to_string(),
            Err(e) => {
                return Err(self.fail(&item, FailureKind::InvalidFile, 0, e.to_string()));
            }
        };

        self.transition(&item, ItemState::CacheCheck);
        match self.cache.lookup(item.path(), Some(&fingerprint)) {
            Ok(Some(hit)) => {
                self.transition(&item, ItemState::CacheHit);
                if let Some(ref m) = self.metrics {
                    m.record_cache_hit();
                }
                self.transition(&item, ItemState::Done);
                return Ok(hit);
            }
            Ok(None) => self.transition(&item, ItemState::CacheMiss),
            Err(e) => {
                warn!(
                    path = %item.path().display(),
                    error = %e,
                    "Cache lookup failed, treating as miss"
                );
                self.transition(&item, ItemState::CacheMiss);
            }
        }

        let (verdict, attempts) = self.call_with_retry(&item, options).await?;

        let result = match ClassificationResult::new(
            item.path(),
            verdict.category,
            verdict.subcategory,
            Some(fingerprint),
        ) {
            Ok(result) => result,
            Err(e) => {
                let error = e.to_string();
                self.report_unknown(&item, &error, attempts);
                return Err(self.fail(&item, FailureKind::Unknown, attempts, error));
            }
        };

        if let Err(e) = self.cache.store(&result) {
            warn!(path = %item.path().display(), error = %e, "Failed to cache classification");
        }
        if let Some(ref m) = self.metrics {
            m.record_oracle_success();
        }

        self.transition(&item, ItemState::Done);
        debug!(
            path = %item.path().display(),
            category = %result.category,
            attempts,
            "Classified"
        );
        Ok(result)
    }

    /// Calls the oracle until it succeeds, fails permanently, or the
    /// attempt budget runs out. Returns the verdict and the calls made.
    async fn call_with_retry(
        &self,
        item: &WorkItem,
        options: &ClassifyOptions,
    ) -> Result<(OracleVerdict, u32), ItemFailure> {
        let call_timeout = self.config.call_timeout();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.transition(item, ItemState::Classifying);

            let call = self.oracle.classify(item.path(), &options.oracle);
            let outcome = match tokio::time::timeout(call_timeout, call).await {
                Ok(outcome) => outcome,
                Err(_) => Err(OracleError::Timeout(call_timeout)),
            };

            let error = match outcome {
                Ok(verdict) => return Ok((verdict, attempt)),
                Err(error) => error,
            };

            let kind = self.classifier.classify(&error);
            if kind == FailureKind::Unknown {
                self.report_unknown(item, &error.to_string(), attempt);
            }

            if self.policy.should_retry(kind, attempt) {
                let delay = self.policy.delay_for(attempt);
                warn!(
                    path = %item.path().display(),
                    attempt,
                    max_attempts = self.policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Transient oracle failure, retrying"
                );
                if let Some(ref m) = self.metrics {
                    m.retries.inc();
                }
                self.transition(item, ItemState::Retry(attempt));
                sleep(delay).await;
                continue;
            }

            return Err(self.fail(item, kind, attempt, error.to_string()));
        }
    }

    fn report_unknown(&self, item: &WorkItem, error: &str, attempt: u32) {
        warn!(
            path = %item.path().display(),
            attempt,
            oracle = self.oracle.name(),
            error,
            "Unclassified oracle failure"
        );
        if let Some(ref diagnostics) = self.diagnostics {
            diagnostics.try_emit(DiagnosticEvent::UnknownFailure {
                path: item.path().to_path_buf(),
                error: error.to_string(),
                attempt,
                oracle: self.oracle.name().to_string(),
            });
        }
    }

    fn fail(
        &self,
        item: &WorkItem,
        kind: FailureKind,
        attempts: u32,
        error: String,
    ) -> ItemFailure {
        self.transition(item, ItemState::Failed);
        if kind != FailureKind::Aborted {
            warn!(
                path = %item.path().display(),
                kind = %kind,
                attempts,
                error = %error,
                "Item failed"
            );
        }

        let failure = ItemFailure {
            path: item.path().to_path_buf(),
            kind,
            attempts,
            error,
        };

        if let Some(ref m) = self.metrics {
            m.record_failure(kind);
        }
        if let Some(ref diagnostics) = self.diagnostics {
            diagnostics.try_emit(DiagnosticEvent::ItemFailed {
                path: failure.path.clone(),
                kind,
                attempts,
                error: failure.error.clone(),
            });
        }
        if let Some(ref callback) = self.on_failure {
            callback(failure.clone());
        }
        failure
    }
}

async fn sleep(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
