use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::oracle::OracleConfig;
use crate::placer::PlacerConfig;
use crate::scheduler::SchedulerConfig;

/// Root configuration
///
/// Every section has defaults, so an empty document is a valid config.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub placer: PlacerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub journal: JournalConfig,
    #[serde(default)]
    pub oracle: Option<OracleConfig>,
}

/// Result cache configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CacheConfig {
    /// SQLite database file. In-memory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Operation journal configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JournalConfig {
    /// JSON journal file. Sessions are kept in memory only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}
