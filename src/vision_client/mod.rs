//! VisionClient - Image-understanding service adapter
//!
//! ## Responsibilities
//!
//! - Send the captured image plus the fixed tile-counting instruction
//! - Return the model's raw reply text, untouched
//! - Classify upstream failures as `ServiceCallFailed`
//!
//! The relay owns this client; the capture side never talks to the
//! service directly.

mod types;

pub use types::*;

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Default Gemini REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Instruction sent with every image
pub const ANALYSIS_PROMPT: &str = r#"This photo shows tiles from the game Okey 101. Detect and count ALL tiles in the photo. Determine the number and the color of each tile (red, black, blue, yellow).

Reply ONLY in the following JSON format and write nothing else:

{
  "tiles": [
    {"count": 5, "color": "red"},
    {"count": 7, "color": "black"}
  ],
  "totalScore": 12,
  "note": "2 tiles detected"
}

Use exactly these color names: red, black, blue, yellow
Each tile is worth its own number. Calculate the total score."#;

const TEMPERATURE: f32 = 0.1;
const MAX_OUTPUT_TOKENS: u32 = 1000;

/// Opaque image → text service
#[async_trait]
pub trait VisionService: Send + Sync {
    /// Describe a base64 JPEG; returns the raw reply text
    async fn describe(&self, image_base64: &str) -> Result<String>;
}

/// Gemini generateContent client
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    /// Create new client with the default endpoint and model
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_options(
            api_key,
            DEFAULT_MODEL.to_string(),
            DEFAULT_BASE_URL.to_string(),
            Duration::from_secs(30),
        )
    }

    /// Create new client with custom endpoint, model and timeout
    pub fn with_options(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            timeout,
        })
    }

    /// Get model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

/// Request body for one image
pub fn build_request(image_base64: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part::inline_jpeg(image_base64),
                Part::text(ANALYSIS_PROMPT),
            ],
        }],
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    }
}

#[async_trait]
impl VisionService for GeminiClient {
    async fn describe(&self, image_base64: &str) -> Result<String> {
        let body = build_request(image_base64);

        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ServiceCallFailed(format!("vision request failed: {}", e)))?;

        let status = resp.status();
        let raw = resp
            .text()
            .await
            .map_err(|e| Error::ServiceCallFailed(format!("vision response unreadable: {}", e)))?;

        let parsed: GenerateContentResponse = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => {
                return Err(Error::ServiceCallFailed(format!(
                    "vision response is not JSON: {}",
                    e
                )));
            }
            Err(_) => {
                return Err(Error::ServiceCallFailed(format!(
                    "vision service returned {}",
                    status
                )));
            }
        };

        if let Some(error) = &parsed.error {
            tracing::error!(
                status = %status,
                code = ?error.code,
                message = %error.message,
                "Vision service error"
            );
            return Err(Error::ServiceCallFailed(error.message.clone()));
        }

        if !status.is_success() {
            return Err(Error::ServiceCallFailed(format!(
                "vision service returned {}",
                status
            )));
        }

        let text = parsed.first_text().unwrap_or_default().to_string();
        tracing::debug!(
            model = %self.model,
            text_len = text.len(),
            "Vision reply received"
        );

        Ok(text)
    }
}
