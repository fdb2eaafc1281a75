//! Classification scheduling and organize runs.
//!
//! `ClassificationScheduler` fingerprints each file, consults the result
//! cache and calls the oracle for misses, with bounded concurrency and
//! retry of transient failures. `Organizer` chains a scheduler run with
//! journaled moves so the whole run can be undone.

mod config;
mod error;
mod metrics;
mod organize;
mod retry;
mod runner;
mod types;

pub use config::{RetryConfig, SchedulerConfig};
pub use error::SchedulerError;
pub use metrics::SchedulerMetrics;
pub use organize::{OrganizeOptions, OrganizeReport, Organizer};
pub use retry::RetryPolicy;
pub use runner::ClassificationScheduler;
pub use types::{
    ClassificationBatch, ClassifyOptions, FailureCallback, ItemFailure, ItemState, WorkItem,
};
