//! API Routes

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

use crate::analysis_client::ANALYZE_PATH;
use crate::error::{Error, Result};
use crate::models::{AnalyzeRequest, RawFallback};
use crate::response_extractor;
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.body_limit();

    Router::new()
        .route("/healthz", get(super::health_check))
        .route(ANALYZE_PATH, post(analyze_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Forward one image to the vision service.
///
/// 200 carries the raw extracted payload (validated on the capture side)
/// or the canonical fallback when the reply had none.
async fn analyze_image(
    State(state): State<AppState>,
    body: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let image = match body {
        Ok(Json(req)) => req.image,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(Error::PayloadTooLarge {
                limit: state.config.body_limit(),
            });
        }
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Unreadable analyze request");
            None
        }
    };
    let image = image
        .as_deref()
        .map(strip_data_uri)
        .filter(|i| !i.is_empty())
        .ok_or(Error::MissingImage)?;

    tracing::debug!(image_len = image.len(), "Analyze request received");

    let vision = state.vision()?;
    let text = vision.describe(image).await?;

    match response_extractor::extract(&text).into_payload() {
        Ok(payload) => {
            tracing::info!(reply_len = text.len(), "Payload extracted from vision reply");
            Ok(Json(payload))
        }
        Err(e) => {
            tracing::warn!(error = %e, reply_len = text.len(), "Returning fallback");
            Ok(Json(serde_json::to_value(RawFallback::default())?))
        }
    }
}

/// Accept `data:image/jpeg;base64,...` as well as bare base64
fn strip_data_uri(image: &str) -> &str {
    let image = image.trim();
    if image.starts_with("data:") {
        image.split_once(',').map(|(_, data)| data).unwrap_or("")
    } else {
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_data_uri() {
        assert_eq!(strip_data_uri("data:image/jpeg;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri(" QUJD "), "QUJD");
        assert_eq!(strip_data_uri("data:image/jpeg;base64"), "");
    }
}
