//! Mock oracle for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::oracle::{Oracle, OracleError, OracleOptions, OracleVerdict};

/// A recorded oracle call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// The file that was classified.
    pub path: PathBuf,
    /// Options as received.
    pub options: OracleOptions,
    /// When the call started (tokio clock, so paused-time tests see
    /// virtual timestamps).
    pub at: Instant,
}

/// Mock implementation of the Oracle trait.
///
/// Provides controllable behavior for testing:
/// - Scripted verdicts per file name, with a fallback verdict
/// - Scripted failure sequences per file name, consumed one per call
/// - Permanent failures per file name
/// - Artificial latency
/// - Call recording and peak concurrency tracking
///
/// # Example
///
/// ```rust,ignore
/// use sortvault_core::testing::MockOracle;
///
/// let oracle = MockOracle::new();
/// oracle.set_verdict("report.pdf", OracleVerdict::new("Documents")).await;
/// oracle.push_failures("flaky.txt", vec![OracleError::Network("reset".into())]).await;
///
/// // Run the scheduler...
///
/// assert_eq!(oracle.calls_for("flaky.txt").await.len(), 2);
/// assert!(oracle.max_in_flight() <= 5);
/// ```
#[derive(Debug, Clone)]
pub struct MockOracle {
    /// Verdicts by file name.
    verdicts: Arc<RwLock<HashMap<String, OracleVerdict>>>,
    /// Verdict for files without a scripted one.
    default_verdict: Arc<RwLock<OracleVerdict>>,
    /// Failures returned before a file's verdict, in order.
    failures: Arc<RwLock<HashMap<String, VecDeque<OracleError>>>>,
    /// Failures returned on every call for a file.
    permanent_failures: Arc<RwLock<HashMap<String, OracleError>>>,
    /// Recorded calls.
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    /// Simulated call duration.
    latency: Arc<RwLock<Duration>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter even if the call future is dropped.
struct CallGuard<'a>(&'a AtomicUsize);

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockOracle {
    /// Create a new mock oracle that files everything under "Other".
    pub fn new() -> Self {
        Self {
            verdicts: Arc::new(RwLock::new(HashMap::new())),
            default_verdict: Arc::new(RwLock::new(OracleVerdict::new("Other"))),
            failures: Arc::new(RwLock::new(HashMap::new())),
            permanent_failures: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            latency: Arc::new(RwLock::new(Duration::ZERO)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Script the verdict for a file name.
    pub async fn set_verdict(&self, file_name: &str, verdict: OracleVerdict) {
        self.verdicts
            .write()
            .await
            .insert(file_name.to_string(), verdict);
    }

    /// Set the verdict for files without a scripted one.
    pub async fn set_default_verdict(&self, verdict: OracleVerdict) {
        *self.default_verdict.write().await = verdict;
    }

    /// Queue failures returned before the file's verdict.
    pub async fn push_failures(&self, file_name: &str, errors: Vec<OracleError>) {
        self.failures
            .write()
            .await
            .entry(file_name.to_string())
            .or_default()
            .extend(errors);
    }

    /// Make every call for a file fail with `error`.
    pub async fn fail_always(&self, file_name: &str, error: OracleError) {
        self.permanent_failures
            .write()
            .await
            .insert(file_name.to_string(), error);
    }

    /// Set the simulated call duration.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    /// Get all recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    /// Get the calls made for one file name.
    pub async fn calls_for(&self, file_name: &str) -> Vec<RecordedCall> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| call.path.file_name().is_some_and(|n| n == file_name))
            .cloned()
            .collect()
    }

    /// Get the number of calls made.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Clear recorded calls and the concurrency peak.
    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
        self.max_in_flight.store(0, Ordering::SeqCst);
    }

    /// Highest number of calls that were running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn respond(&self, file_name: &str) -> Result<OracleVerdict, OracleError> {
        if let Some(error) = self.permanent_failures.read().await.get(file_name) {
            return Err(error.clone());
        }
        if let Some(error) = self
            .failures
            .write()
            .await
            .get_mut(file_name)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        match self.verdicts.read().await.get(file_name) {
            Some(verdict) => Ok(verdict.clone()),
            None => Ok(self.default_verdict.read().await.clone()),
        }
    }
}

#[async_trait]
impl Oracle for MockOracle {
    fn name(&self) -> &str {
        "mock"
    }

    async fn classify(
        &self,
        path: &Path,
        options: &OracleOptions,
    ) -> Result<OracleVerdict, OracleError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = CallGuard(&self.in_flight);
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        self.calls.write().await.push(RecordedCall {
            path: path.to_path_buf(),
            options: options.clone(),
            at: Instant::now(),
        });

        let latency = *self.latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.respond(&file_name).await
    }
}
