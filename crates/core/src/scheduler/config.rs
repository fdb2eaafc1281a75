//! Configuration for the scheduler module.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the classification scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum items classified at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-call oracle timeout in seconds.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// Retry configuration for transient oracle failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total oracle calls per item, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds. Grows linearly.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Cap on the delay between attempts in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_concurrency() -> usize {
    5
}

fn default_call_timeout() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            call_timeout_secs: default_call_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Sets the concurrency limit.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the per-call timeout.
    pub fn with_call_timeout(mut self, secs: u64) -> Self {
        self.call_timeout_secs = secs;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_delays(mut self, base_ms: u64, max_ms: u64) -> Self {
        self.base_delay_ms = base_ms;
        self.max_delay_ms = max_ms;
        self
    }
}
