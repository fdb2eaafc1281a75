//! Generic JSON-over-HTTP oracle.
//!
//! POSTs `{ path, file_name, model, context, language, folder_preset }` and
//! expects `{ "category": ..., "subcategory": ... }` back. Vendor-specific
//! prompt formats belong behind such an endpoint, not in the core.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::config::OracleConfig;
use super::error::OracleError;
use super::traits::Oracle;
use super::types::{OracleOptions, OracleVerdict};

/// Oracle that delegates to an HTTP classification endpoint.
pub struct HttpOracle {
    client: reqwest::Client,
    endpoint: String,
    model: Option<String>,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpOracle {
    /// Builds an oracle from configuration.
    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout,
        })
    }
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    path: String,
    file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    folder_preset: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    category: String,
    #[serde(default)]
    subcategory: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "message")]
    error: String,
}

/// Maps a non-success HTTP status to a typed oracle error.
fn error_for_status(
    status: u16,
    body: &str,
    retry_after_secs: Option<u64>,
    path: &Path,
) -> OracleError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.to_string());

    match status {
        429 => OracleError::RateLimited {
            retry_after_ms: retry_after_secs.map(|s| s.saturating_mul(1000)),
        },
        401 | 403 => OracleError::Auth(message),
        400 | 415 | 422 => OracleError::InvalidFile {
            path: path.to_path_buf(),
            reason: message,
        },
        _ => OracleError::Api { status, message },
    }
}

fn error_for_transport(error: reqwest::Error, timeout: Duration) -> OracleError {
    if error.is_timeout() {
        OracleError::Timeout(timeout)
    } else if error.is_connect() || error.is_request() {
        OracleError::Network(error.to_string())
    } else {
        OracleError::Other(error.to_string())
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    fn name(&self) -> &str {
        "http"
    }

    async fn classify(
        &self,
        path: &Path,
        options: &OracleOptions,
    ) -> Result<OracleVerdict, OracleError> {
        let request = ClassifyRequest {
            path: path.to_string_lossy().into_owned(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            model: options.model.as_deref().or(self.model.as_deref()),
            context: options.context.as_deref(),
            language: options.language.as_deref(),
            folder_preset: options.folder_preset.as_deref(),
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| error_for_transport(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status.as_u16(), &body, retry_after, path));
        }

        let parsed: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;

        if parsed.category.trim().is_empty() {
            return Err(OracleError::InvalidResponse(
                "response has an empty category".to_string(),
            ));
        }

        Ok(OracleVerdict {
            category: parsed.category,
            subcategory: parsed.subcategory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{DefaultClassifier, ErrorClassifier, FailureKind};

    #[test]
    fn test_status_mapping() {
        let path = Path::new("/inbox/a.txt");
        let classifier = DefaultClassifier;

        let kind = |status: u16| classifier.classify(&error_for_status(status, "", None, path));

        assert_eq!(kind(429), FailureKind::ApiLimit);
        assert_eq!(kind(401), FailureKind::Auth);
        assert_eq!(kind(403), FailureKind::Auth);
        assert_eq!(kind(422), FailureKind::InvalidFile);
        assert_eq!(kind(500), FailureKind::ApiError);
        assert_eq!(kind(503), FailureKind::ApiError);
    }

    #[test]
    fn test_error_body_message_extracted() {
        let err = error_for_status(
            500,
            r#"{"error": "model overloaded"}"#,
            None,
            Path::new("/a"),
        );
        match err {
            OracleError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "model overloaded");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_retry_after_converted_to_ms() {
        let err = error_for_status(429, "", Some(3), Path::new("/a"));
        assert!(matches!(
            err,
            OracleError::RateLimited {
                retry_after_ms: Some(3000)
            }
        ));
    }

    #[test]
    fn test_huge_retry_after_saturates() {
        let err = error_for_status(429, "", Some(u64::MAX / 10), Path::new("/a"));
        assert!(matches!(
            err,
            OracleError::RateLimited {
                retry_after_ms: Some(u64::MAX)
            }
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_failure() {
        let oracle = HttpOracle::from_config(&OracleConfig {
            endpoint: "http://127.0.0.1:9/classify".to_string(),
            model: None,
            api_key: None,
            timeout_secs: 5,
        })
        .unwrap();

        let err = oracle
            .classify(Path::new("/inbox/a.txt"), &OracleOptions::default())
            .await
            .unwrap_err();

        assert_eq!(DefaultClassifier.classify(&err), FailureKind::Network);
    }
}
