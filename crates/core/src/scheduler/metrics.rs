//! Prometheus metrics for the classification scheduler.
//!
//! Metrics are plain values owned by whoever builds the scheduler and
//! registered into a caller-supplied registry.

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

use crate::oracle::FailureKind;

/// Counters and gauges updated by the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerMetrics {
    /// Successful classifications by source (`cache` or `oracle`).
    pub classifications: IntCounterVec,
    /// Failed items by failure kind.
    pub failures: IntCounterVec,
    /// Oracle calls that were retried.
    pub retries: IntCounter,
    /// Items currently admitted.
    pub in_flight: IntGauge,
}

impl SchedulerMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            classifications: IntCounterVec::new(
                Opts::new(
                    "sortvault_classifications_total",
                    "Total successful classifications",
                ),
                &["source"], // "cache", "oracle"
            )?,
            failures: IntCounterVec::new(
                Opts::new(
                    "sortvault_classification_failures_total",
                    "Total items that failed classification",
                ),
                &["kind"],
            )?,
            retries: IntCounter::new(
                "sortvault_oracle_retries_total",
                "Total oracle calls retried after a transient failure",
            )?,
            in_flight: IntGauge::new(
                "sortvault_items_in_flight",
                "Items currently being classified",
            )?,
        })
    }

    /// Creates the metrics and registers them.
    pub fn registered(registry: &Registry) -> Result<Self, prometheus::Error> {
        let metrics = Self::new()?;
        metrics.register(registry)?;
        Ok(metrics)
    }

    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.classifications.clone()))?;
        registry.register(Box::new(self.failures.clone()))?;
        registry.register(Box::new(self.retries.clone()))?;
        registry.register(Box::new(self.in_flight.clone()))?;
        Ok(())
    }

    pub(crate) fn record_cache_hit(&self) {
        self.classifications.with_label_values(&["cache"]).inc();
    }

    pub(crate) fn record_oracle_success(&self) {
        self.classifications.with_label_values(&["oracle"]).inc();
    }

    pub(crate) fn record_failure(&self, kind: FailureKind) {
        self.failures.with_label_values(&[kind.as_str()]).inc();
    }
}
