//! Configuration for the placer module.

use serde::{Deserialize, Serialize};

use super::types::ConflictStrategy;

/// Configuration for the file system placer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacerConfig {
    /// Buffer size for cross-device copies in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Strategy used when a request does not pick one.
    #[serde(default)]
    pub default_strategy: ConflictStrategy,
}

fn default_buffer_size() -> usize {
    8 * 1024 * 1024 // 8 MB
}

impl Default for PlacerConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            default_strategy: ConflictStrategy::default(),
        }
    }
}

impl PlacerConfig {
    /// Sets the buffer size for copies.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Sets the default conflict strategy.
    pub fn with_default_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }
}
