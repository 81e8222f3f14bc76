//! Error handling for the Okey counter

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Camera permission denied or no capture device
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    /// Relay has no credential for the image-understanding service
    #[error("Service misconfigured: {0}")]
    ServiceMisconfigured(String),

    /// Network or upstream failure during analysis
    #[error("Service call failed: {0}")]
    ServiceCallFailed(String),

    /// Reply carried no usable structured payload
    #[error("No extractable payload")]
    NoExtractablePayload,

    /// Relay request without image data
    #[error("Image not found in request")]
    MissingImage,

    /// Relay request body over the configured limit
    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Illegal session transition
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Wire code sent by the relay and mapped back by the analysis client
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::CameraUnavailable(_) => "CAMERA_UNAVAILABLE",
            Error::ServiceMisconfigured(_) => "SERVICE_MISCONFIGURED",
            Error::ServiceCallFailed(_) | Error::Http(_) => "SERVICE_CALL_FAILED",
            Error::NoExtractablePayload => "NO_EXTRACTABLE_PAYLOAD",
            Error::MissingImage => "MISSING_IMAGE",
            Error::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::InvalidState(_) => "INVALID_STATE",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Image(_) => "IMAGE_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::MissingImage | Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::InvalidState(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = self.error_code();
        let message = match &self {
            Error::ServiceMisconfigured(msg)
            | Error::ServiceCallFailed(msg)
            | Error::Validation(msg) => msg.clone(),
            other => other.to_string(),
        };

        tracing::error!(
            status = %status,
            error_code = %error_code,
            message = %message,
            "Request error"
        );

        let body = Json(json!({
            "error": message,
            "error_code": error_code
        }));

        (status, body).into_response()
    }
}
