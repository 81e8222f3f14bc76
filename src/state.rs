//! Application state
//!
//! Holds the relay configuration and its shared components

use crate::error::{Error, Result};
use crate::vision_client::{GeminiClient, VisionService, DEFAULT_BASE_URL, DEFAULT_MODEL};
use std::sync::Arc;
use std::time::Duration;

/// Default largest accepted JPEG (20 MiB)
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Room for the JSON envelope and a data-URI prefix
const BODY_OVERHEAD_BYTES: usize = 4096;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Gemini API key (relay answers SERVICE_MISCONFIGURED without it)
    pub gemini_api_key: Option<String>,
    /// Gemini model name
    pub gemini_model: String,
    /// Gemini REST base URL
    pub gemini_base_url: String,
    /// Upstream request timeout
    pub request_timeout: Duration,
    /// Largest JPEG the relay accepts, before base64
    pub max_image_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            gemini_base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT_SEC")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(30),
            ),
            max_image_bytes: std::env::var("MAX_IMAGE_BYTES")
                .ok()
                .and_then(|m| m.parse().ok())
                .unwrap_or(DEFAULT_MAX_IMAGE_BYTES),
        }
    }
}

impl AppConfig {
    /// Listen address
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Request body limit: the base64 form of the largest image plus envelope
    pub fn body_limit(&self) -> usize {
        self.max_image_bytes
            .div_ceil(3)
            .saturating_mul(4)
            .saturating_add(BODY_OVERHEAD_BYTES)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Vision service; `None` when the credential is missing
    pub vision: Option<Arc<dyn VisionService>>,
}

impl AppState {
    /// Build state from config, creating the Gemini client if a key is set
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let vision: Option<Arc<dyn VisionService>> = match &config.gemini_api_key {
            Some(key) => Some(Arc::new(GeminiClient::with_options(
                key.clone(),
                config.gemini_model.clone(),
                config.gemini_base_url.clone(),
                config.request_timeout,
            )?)),
            None => None,
        };

        Ok(Self { config, vision })
    }

    /// State with an explicit vision service
    pub fn with_vision(config: AppConfig, vision: Option<Arc<dyn VisionService>>) -> Self {
        Self { config, vision }
    }

    /// Vision service or a misconfiguration error
    pub fn vision(&self) -> Result<Arc<dyn VisionService>> {
        self.vision
            .clone()
            .ok_or_else(|| Error::ServiceMisconfigured("API key not configured".to_string()))
    }
}
