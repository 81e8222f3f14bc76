//! SessionController data types

use crate::models::{AnalysisResult, Tile};
use crate::score_evaluator::ScoreStatus;
use serde::Serialize;

/// Externally visible phase
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    CapturingOpen,
    FrameReady,
    Analyzing,
    ResultReady,
    Closed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::CapturingOpen => "capturing_open",
            SessionPhase::FrameReady => "frame_ready",
            SessionPhase::Analyzing => "analyzing",
            SessionPhase::ResultReady => "result_ready",
            SessionPhase::Closed => "closed",
        }
    }
}

/// Internal state. The result only exists in `ResultReady`, so a pending
/// analysis can never show a stale result.
#[derive(Debug, Clone)]
pub(super) enum SessionState {
    Idle,
    CapturingOpen,
    FrameReady,
    Analyzing { seq: u64 },
    ResultReady { result: AnalysisResult },
    Closed,
}

impl SessionState {
    pub(super) fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::CapturingOpen => SessionPhase::CapturingOpen,
            SessionState::FrameReady => SessionPhase::FrameReady,
            SessionState::Analyzing { .. } => SessionPhase::Analyzing,
            SessionState::ResultReady { .. } => SessionPhase::ResultReady,
            SessionState::Closed => SessionPhase::Closed,
        }
    }
}

/// What `restart` goes back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartMode {
    /// Drop frame and result, reopen the camera
    Retake,
    /// Drop the result, keep the frame for another analysis
    Reanalyze,
}

/// Sequence-stamped permission to deliver one analysis response
#[derive(Debug)]
pub struct AnalysisTicket {
    pub(super) seq: u64,
    pub(super) image: Vec<u8>,
}

impl AnalysisTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// JPEG bytes to analyze
    pub fn image(&self) -> &[u8] {
        &self.image
    }
}

/// Snapshot for the presentation layer
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub loading: bool,
    pub camera_open: bool,
    pub has_frame: bool,
    pub threshold: u32,
    pub tiles: Vec<Tile>,
    pub total_score: Option<u32>,
    pub note: Option<String>,
    pub status: Option<ScoreStatus>,
    pub remaining: Option<u32>,
    pub message: Option<String>,
}
