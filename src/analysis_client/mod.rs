//! AnalysisClient - Relay endpoint adapter
//!
//! ## Responsibilities
//!
//! - Send captured frames to the relay as base64
//! - Map relay failures onto the error taxonomy
//! - Normalize the raw reply into an `AnalysisResult`
//!
//! No retry is performed; the session controller decides whether the user
//! may trigger another attempt.

use crate::error::{Error, Result};
use crate::models::{AnalysisResult, AnalyzeRequest};
use crate::result_validator;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use std::time::Duration;

/// Relay path for analysis
pub const ANALYZE_PATH: &str = "/api/analyze";

/// Anything that turns image bytes into a result
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, image: &[u8]) -> Result<AnalysisResult>;
}

/// Relay error body
#[derive(Debug, Clone, Deserialize)]
pub struct RelayError {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_code: Option<String>,
}

impl RelayError {
    fn into_error(self) -> Error {
        match self.error_code.as_deref() {
            Some("SERVICE_MISCONFIGURED") => Error::ServiceMisconfigured(self.error),
            _ => Error::ServiceCallFailed(self.error),
        }
    }
}

/// Relay client
pub struct AnalysisClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl AnalysisClient {
    /// Create new client
    pub fn new(base_url: String) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create new client with custom timeout
    pub fn with_timeout(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Check relay health
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Analyzer for AnalysisClient {
    async fn analyze(&self, image: &[u8]) -> Result<AnalysisResult> {
        let url = format!("{}{}", self.base_url, ANALYZE_PATH);
        let body = AnalyzeRequest {
            image: Some(base64::engine::general_purpose::STANDARD.encode(image)),
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ServiceCallFailed(format!("relay request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let error = resp.json::<RelayError>().await.unwrap_or(RelayError {
                error: format!("relay returned {}", status),
                error_code: None,
            });
            tracing::warn!(
                status = %status,
                error_code = ?error.error_code,
                message = %error.error,
                "Relay rejected analysis"
            );
            return Err(error.into_error());
        }

        let raw = match resp.json::<serde_json::Value>().await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Relay reply is not JSON, using fallback");
                return Ok(AnalysisResult::fallback());
            }
        };

        let result = result_validator::normalize(&raw);
        tracing::info!(
            tile_count = result.tiles.len(),
            total_score = result.total_score,
            "Analysis complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_error_mapping() {
        let misconfigured = RelayError {
            error: "API key not configured".to_string(),
            error_code: Some("SERVICE_MISCONFIGURED".to_string()),
        };
        assert!(matches!(
            misconfigured.into_error(),
            Error::ServiceMisconfigured(_)
        ));

        let upstream: RelayError =
            serde_json::from_str(r#"{"error":"quota exceeded"}"#).unwrap();
        assert!(matches!(upstream.into_error(), Error::ServiceCallFailed(m) if m == "quota exceeded"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = AnalysisClient::new("http://localhost:8080/".to_string()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_service_call_failed() {
        let client = AnalysisClient::with_timeout(
            "http://127.0.0.1:1".to_string(),
            Duration::from_millis(500),
        )
        .unwrap();
        let err = client.analyze(&[0xFF, 0xD8]).await.unwrap_err();
        assert!(matches!(err, Error::ServiceCallFailed(_)));
        assert!(!client.health_check().await.unwrap());
    }
}
