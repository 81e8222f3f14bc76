//! Okey Counter Library
//!
//! Photograph a hand of Okey 101 tiles and get its score.
//!
//! ## Architecture
//!
//! 1. CaptureSession - Camera lifecycle and single still frame
//! 2. AnalysisClient - Relay endpoint adapter
//! 3. ResponseExtractor - Payload extraction from model replies
//! 4. ResultValidator - Shape checks, tile filtering, total recomputation
//! 5. ScoreEvaluator - Opening threshold classification
//! 6. SessionController - Capture-to-score state machine
//! 7. VisionClient - Image-understanding service adapter (relay side)
//! 8. WebAPI - Relay endpoints
//!
//! ## Data Flow
//!
//! frame → relay → vision reply → extracted payload → normalized result →
//! score status

pub mod analysis_client;
pub mod capture_session;
pub mod error;
pub mod models;
pub mod response_extractor;
pub mod result_validator;
pub mod score_evaluator;
pub mod session_controller;
pub mod state;
pub mod vision_client;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
