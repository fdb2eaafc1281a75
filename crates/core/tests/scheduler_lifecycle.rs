//! Classification scheduler integration tests.
//!
//! These tests drive the scheduler against a mock oracle:
//! - Cache reuse across runs
//! - Concurrency bound
//! - Retry count and backoff of transient failures
//! - Failure classification, reporting and abort

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use prometheus::Registry;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

use sortvault_core::{
    create_diagnostics_channel,
    testing::fixtures,
    ClassificationScheduler, ClassifyOptions, DiagnosticEvent, FailureKind, ItemFailure,
    OracleError, OracleOptions, ResultCache, RetryConfig, SchedulerConfig, SchedulerError,
    SchedulerMetrics, SqliteCacheStore,
};

use common::TestHarness;

fn fast_retry(max_attempts: u32) -> SchedulerConfig {
    SchedulerConfig::default()
        .with_retry(RetryConfig::default().with_max_attempts(max_attempts).with_delays(1, 5))
}

fn collect_failures() -> (Arc<Mutex<Vec<ItemFailure>>>, impl Fn(ItemFailure) + Send + Sync) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |failure| sink.lock().unwrap().push(failure))
}

// =============================================================================
// Cache Tests
// =============================================================================

#[tokio::test]
async fn test_three_documents_are_classified_once() {
    let harness = TestHarness::new();
    for name in ["a.txt", "b.txt", "c.txt"] {
        harness.write(name, &format!("contents of {name}")).await;
        harness
            .oracle
            .set_verdict(name, fixtures::verdict("Documents"))
            .await;
    }
    let scheduler = harness.scheduler(SchedulerConfig::default().with_concurrency(2));
    let options = ClassifyOptions::default();

    let first = scheduler
        .classify_all(harness.path(), &options)
        .await
        .unwrap();

    assert_eq!(first.len(), 3);
    assert!(first.iter().all(|r| r.category == "Documents"));
    assert!(first.iter().all(|r| r.fingerprint.is_some()));
    assert_eq!(harness.cache.backend().len().unwrap(), 3);
    assert_eq!(harness.oracle.call_count().await, 3);

    let second = scheduler
        .classify_all(harness.path(), &options)
        .await
        .unwrap();

    assert_eq!(second, first);
    assert_eq!(
        harness.oracle.call_count().await,
        3,
        "Second run must be served from cache"
    );
    assert_eq!(harness.cache.stats().hits, 3);
}

#[tokio::test]
async fn test_changed_file_is_reclassified() {
    let harness = TestHarness::new();
    harness.write("same.txt", "unchanged").await;
    let edited = harness.write("edited.txt", "before").await;
    let scheduler = harness.scheduler(SchedulerConfig::default());
    let options = ClassifyOptions::default();

    scheduler.classify_all(harness.path(), &options).await.unwrap();
    tokio::fs::write(&edited, "after, and longer").await.unwrap();
    scheduler.classify_all(harness.path(), &options).await.unwrap();

    assert_eq!(harness.oracle.calls_for("same.txt").await.len(), 1);
    assert_eq!(harness.oracle.calls_for("edited.txt").await.len(), 2);
}

#[tokio::test]
async fn test_sqlite_cache_survives_scheduler_restart() {
    let harness = TestHarness::new();
    harness.write("a.pdf", "pdf").await;
    harness
        .oracle
        .set_verdict("a.pdf", fixtures::verdict_with_sub("Documents", "Invoices"))
        .await;

    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("cache.db");

    for _ in 0..2 {
        let store = Arc::new(SqliteCacheStore::new(&db_path).unwrap());
        let scheduler = ClassificationScheduler::new(
            SchedulerConfig::default(),
            Arc::new(harness.oracle.clone()),
            Arc::new(ResultCache::new(store)),
        );
        let results = scheduler
            .classify_all(harness.path(), &ClassifyOptions::default())
            .await
            .unwrap();
        assert_eq!(results[0].subcategory.as_deref(), Some("Invoices"));
    }

    assert_eq!(harness.oracle.call_count().await, 1);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[tokio::test]
async fn test_in_flight_calls_never_exceed_limit() {
    let harness = TestHarness::new();
    for i in 0..12 {
        harness.write(&format!("file{i:02}.txt"), &format!("{i}")).await;
    }
    harness.oracle.set_latency(Duration::from_millis(30)).await;

    let registry = Registry::new();
    let metrics = SchedulerMetrics::registered(&registry).unwrap();
    let scheduler = harness
        .scheduler(SchedulerConfig::default().with_concurrency(3))
        .with_metrics(metrics.clone());

    let results = scheduler
        .classify_all(harness.path(), &ClassifyOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 12);
    assert!(
        harness.oracle.max_in_flight() <= 3,
        "Peak concurrency was {}",
        harness.oracle.max_in_flight()
    );
    assert!(harness.oracle.max_in_flight() >= 1);
    assert_eq!(metrics.in_flight.get(), 0);
    assert_eq!(
        metrics.classifications.with_label_values(&["oracle"]).get(),
        12
    );
}

#[tokio::test]
async fn test_results_sorted_and_options_forwarded() {
    let harness = TestHarness::new();
    for name in ["c.txt", "a.txt", "b.txt"] {
        harness.write(name, name).await;
    }
    harness.oracle.set_latency(Duration::from_millis(5)).await;
    let scheduler = harness.scheduler(SchedulerConfig::default().with_concurrency(3));

    let options = ClassifyOptions::default().with_oracle_options(
        OracleOptions::default()
            .with_model("small")
            .with_language("de"),
    );
    let results = scheduler.classify_all(harness.path(), &options).await.unwrap();

    let names: Vec<String> = results
        .iter()
        .map(|r| r.path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);

    for call in harness.oracle.recorded_calls().await {
        assert_eq!(call.options.model.as_deref(), Some("small"));
        assert_eq!(call.options.language.as_deref(), Some("de"));
    }
}

// =============================================================================
// Retry Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_network_failure_retried_with_increasing_backoff() {
    let harness = TestHarness::new();
    harness.write("flaky.txt", "data").await;
    harness
        .oracle
        .fail_always("flaky.txt", OracleError::Network("connection reset".into()))
        .await;

    let (seen, callback) = collect_failures();
    let scheduler = harness
        .scheduler(SchedulerConfig::default())
        .with_failure_callback(callback);

    let results = scheduler
        .classify_all(harness.path(), &ClassifyOptions::default())
        .await
        .unwrap();

    assert!(results.is_empty());

    let calls = harness.oracle.calls_for("flaky.txt").await;
    assert_eq!(calls.len(), 3, "max_attempts counts every call");

    let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1].at - w[0].at).collect();
    assert!(gaps[0] >= Duration::from_millis(1000));
    assert!(gaps[1] > gaps[0], "Backoff must grow: {gaps:?}");

    let failures = seen.lock().unwrap().clone();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::Network);
    assert_eq!(failures[0].attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_then_success() {
    let harness = TestHarness::new();
    harness.write("a.txt", "data").await;
    harness
        .oracle
        .push_failures("a.txt", vec![OracleError::Network("refused".into())])
        .await;
    harness
        .oracle
        .set_verdict("a.txt", fixtures::verdict("Notes"))
        .await;

    let registry = Registry::new();
    let metrics = SchedulerMetrics::registered(&registry).unwrap();
    let scheduler = harness
        .scheduler(SchedulerConfig::default())
        .with_metrics(metrics.clone());

    let results = scheduler
        .classify_all(harness.path(), &ClassifyOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].category, "Notes");
    assert_eq!(harness.oracle.call_count().await, 2);
    assert_eq!(metrics.retries.get(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_treated_as_network() {
    let harness = TestHarness::new();
    harness.write("slow.txt", "data").await;
    harness.oracle.set_latency(Duration::from_secs(600)).await;

    let (seen, callback) = collect_failures();
    let scheduler = harness
        .scheduler(fast_retry(2).with_call_timeout(1))
        .with_failure_callback(callback);

    let results = scheduler
        .classify_all(harness.path(), &ClassifyOptions::default())
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(harness.oracle.call_count().await, 2);
    let failures = seen.lock().unwrap().clone();
    assert_eq!(failures[0].kind, FailureKind::Network);
    assert!(failures[0].error.contains("timed out"));
}

#[tokio::test]
async fn test_permanent_failures_are_not_retried() {
    let harness = TestHarness::new();
    harness.write("auth.txt", "1").await;
    harness.write("quota.txt", "2").await;
    harness.write("bad.txt", "3").await;
    harness.write("good.txt", "4").await;
    harness
        .oracle
        .fail_always("auth.txt", OracleError::Auth("invalid key".into()))
        .await;
    harness
        .oracle
        .fail_always(
            "quota.txt",
            OracleError::RateLimited {
                retry_after_ms: Some(1000),
            },
        )
        .await;
    harness
        .oracle
        .fail_always(
            "bad.txt",
            OracleError::InvalidFile {
                path: "bad.txt".into(),
                reason: "unsupported".into(),
            },
        )
        .await;

    let (seen, callback) = collect_failures();
    let scheduler = harness
        .scheduler(fast_retry(5))
        .with_failure_callback(callback);

    let results = scheduler
        .classify_all(harness.path(), &ClassifyOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].path.ends_with("good.txt"));
    assert_eq!(harness.oracle.call_count().await, 4);

    let mut kinds: Vec<(String, FailureKind)> = seen
        .lock()
        .unwrap()
        .iter()
        .map(|f| {
            (
                f.path.file_name().unwrap().to_string_lossy().to_string(),
                f.kind,
            )
        })
        .collect();
    kinds.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        kinds,
        vec![
            ("auth.txt".to_string(), FailureKind::Auth),
            ("bad.txt".to_string(), FailureKind::InvalidFile),
            ("quota.txt".to_string(), FailureKind::ApiLimit),
        ]
    );
}

#[tokio::test]
async fn test_custom_classifier_controls_retries() {
    let harness = TestHarness::new();
    harness.write("a.txt", "data").await;
    harness
        .oracle
        .push_failures("a.txt", vec![OracleError::Other("gateway hiccup".into())])
        .await;

    // Treat everything as transient.
    let scheduler = harness
        .scheduler(fast_retry(3))
        .with_classifier(|_: &OracleError| FailureKind::Network);

    let results = scheduler
        .classify_all(harness.path(), &ClassifyOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(harness.oracle.call_count().await, 2);
}

// =============================================================================
// Reporting Tests
// =============================================================================

#[tokio::test]
async fn test_unknown_failures_reach_diagnostics() {
    let harness = TestHarness::new();
    harness.write("weird.txt", "data").await;
    harness
        .oracle
        .fail_always("weird.txt", OracleError::InvalidResponse("not json".into()))
        .await;

    let (diagnostics, mut rx) = create_diagnostics_channel(16);
    let scheduler = harness
        .scheduler(SchedulerConfig::default())
        .with_diagnostics(diagnostics);

    let results = scheduler
        .classify_all(harness.path(), &ClassifyOptions::default())
        .await
        .unwrap();
    assert!(results.is_empty());
    drop(scheduler);

    let mut events = Vec::new();
    while let Some(envelope) = rx.recv().await {
        events.push(envelope.event);
    }

    assert!(matches!(
        &events[0],
        DiagnosticEvent::UnknownFailure { attempt: 1, oracle, error, .. }
            if oracle == "mock" && error.contains("not json")
    ));
    assert!(matches!(
        &events[1],
        DiagnosticEvent::ItemFailed {
            kind: FailureKind::Unknown,
            attempts: 1,
            ..
        }
    ));
}

#[tokio::test]
async fn test_empty_category_fails_as_unknown() {
    let harness = TestHarness::new();
    harness.write("blank.txt", "data").await;
    harness
        .oracle
        .set_verdict("blank.txt", fixtures::verdict("   "))
        .await;

    let (seen, callback) = collect_failures();
    let scheduler = harness
        .scheduler(SchedulerConfig::default())
        .with_failure_callback(callback);

    let results = scheduler
        .classify_all(harness.path(), &ClassifyOptions::default())
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(harness.cache.backend().len().unwrap(), 0);
    assert_eq!(seen.lock().unwrap()[0].kind, FailureKind::Unknown);
}

#[tokio::test]
async fn test_unreadable_item_is_invalid_file() {
    let harness = TestHarness::new();
    let ghost = harness.path().join("ghost.txt");

    let (seen, callback) = collect_failures();
    let scheduler = harness
        .scheduler(SchedulerConfig::default())
        .with_failure_callback(callback);

    let batch = scheduler
        .classify_items(vec![ghost], &ClassifyOptions::default())
        .await;

    assert!(batch.results.is_empty());
    assert_eq!(batch.failures[0].kind, FailureKind::InvalidFile);
    assert_eq!(batch.failures[0].attempts, 0);
    assert_eq!(harness.oracle.call_count().await, 0);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

// =============================================================================
// Enumeration and Abort Tests
// =============================================================================

#[tokio::test]
async fn test_enumeration_skips_hidden_files_and_directories() {
    let harness = TestHarness::new();
    harness.write("visible.txt", "v").await;
    harness.write(".hidden", "h").await;
    harness.write("nested/inner.txt", "i").await;
    let scheduler = harness.scheduler(SchedulerConfig::default());

    let files = scheduler.enumerate(harness.path()).await.unwrap();

    assert_eq!(files, vec![harness.path().join("visible.txt")]);
}

#[tokio::test]
async fn test_invalid_directory() {
    let harness = TestHarness::new();
    let file = harness.write("plain.txt", "x").await;
    let scheduler = harness.scheduler(SchedulerConfig::default());

    let missing = scheduler
        .classify_all(&harness.path().join("missing"), &ClassifyOptions::default())
        .await;
    assert!(matches!(
        missing,
        Err(SchedulerError::InvalidDirectory { .. })
    ));

    let not_dir = scheduler
        .classify_all(&file, &ClassifyOptions::default())
        .await;
    assert_err!(not_dir);

    assert_ok!(
        scheduler
            .classify_all(harness.path(), &ClassifyOptions::default())
            .await
    );
}

#[tokio::test]
async fn test_abort_reports_unstarted_items() {
    let harness = TestHarness::new();
    for name in ["a.txt", "b.txt"] {
        harness.write(name, name).await;
    }
    let scheduler = harness.scheduler(SchedulerConfig::default());
    scheduler.abort();

    let files = scheduler.enumerate(harness.path()).await.unwrap();
    let batch = scheduler
        .classify_items(files, &ClassifyOptions::default())
        .await;

    assert!(batch.results.is_empty());
    assert_eq!(batch.failures.len(), 2);
    assert!(batch
        .failures
        .iter()
        .all(|f| f.kind == FailureKind::Aborted && f.attempts == 0));
    assert_eq!(harness.oracle.call_count().await, 0);

    scheduler.reset_abort();
    let results = scheduler
        .classify_all(harness.path(), &ClassifyOptions::default())
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn test_abort_mid_run_stops_admission() {
    let harness = TestHarness::new();
    for i in 0..6 {
        harness.write(&format!("f{i}.txt"), &format!("{i}")).await;
    }
    harness.oracle.set_latency(Duration::from_millis(50)).await;

    let scheduler = Arc::new(harness.scheduler(SchedulerConfig::default().with_concurrency(1)));
    let runner = Arc::clone(&scheduler);
    let dir = harness.path().to_path_buf();
    let run = tokio::spawn(async move {
        runner
            .classify_all(&dir, &ClassifyOptions::default())
            .await
            .unwrap()
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    scheduler.abort();
    let results = run.await.unwrap();

    assert!(results.len() < 6, "Abort should stop admission");
    assert!(harness.oracle.call_count().await < 6);
}
