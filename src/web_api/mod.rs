//! WebAPI - Relay endpoints
//!
//! ## Responsibilities
//!
//! - Accept captured frames from the capture side
//! - Forward them to the vision service with the fixed instruction
//! - Return the extracted payload, or the canonical fallback

mod routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service_configured: state.vision.is_some(),
    };

    Json(response)
}
