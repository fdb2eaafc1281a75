//! Configuration for the HTTP oracle.

use serde::{Deserialize, Serialize};

/// Connection settings for [`super::HttpOracle`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Classification endpoint (e.g., "http://localhost:8765/classify").
    pub endpoint: String,

    /// Default model identifier, used when the caller passes none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Bearer token sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Transport-level request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    120
}

impl OracleConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: None,
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}
