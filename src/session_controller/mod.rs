//! SessionController - Capture-to-score state machine
//!
//! ## Responsibilities
//!
//! - Drive Idle → CapturingOpen → FrameReady → Analyzing → ResultReady
//! - Keep at most one analysis in flight
//! - Ignore responses that arrive after the session moved on
//! - Absorb analysis failures into a displayable result
//!
//! ## Transitions
//!
//! - `open_camera`: Idle / FrameReady / ResultReady → CapturingOpen
//! - `cancel_camera`: CapturingOpen → Idle
//! - `capture`: CapturingOpen → FrameReady
//! - `begin_analysis`: FrameReady / ResultReady → Analyzing (no-op if already)
//! - `complete_analysis`: Analyzing → ResultReady (matching ticket only)
//! - `restart`: any → FrameReady (reanalyze) or CapturingOpen (retake)
//! - `teardown`: any → Closed

mod types;

pub use types::{AnalysisTicket, RestartMode, SessionPhase, SessionView};

use crate::analysis_client::Analyzer;
use crate::capture_session::{CameraDevice, CaptureSession};
use crate::error::{Error, Result};
use crate::models::AnalysisResult;
use crate::score_evaluator::{ScoreSummary, ThresholdConfig};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use types::SessionState;

/// SessionController instance
pub struct SessionController {
    capture: CaptureSession,
    analyzer: Arc<dyn Analyzer>,
    state: SessionState,
    threshold: ThresholdConfig,
    last_seq: u64,
}

impl SessionController {
    /// Create new SessionController
    pub fn new(camera: Arc<dyn CameraDevice>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self::with_capture(CaptureSession::new(camera), analyzer)
    }

    /// Create new SessionController around an existing capture session
    pub fn with_capture(capture: CaptureSession, analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            capture,
            analyzer,
            state: SessionState::Idle,
            threshold: ThresholdConfig::default(),
            last_seq: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    /// True while an analysis is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self.state, SessionState::Analyzing { .. })
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match &self.state {
            SessionState::ResultReady { result } => Some(result),
            _ => None,
        }
    }

    /// Score of the current result against the threshold
    pub fn summary(&self) -> Option<ScoreSummary> {
        self.result()
            .map(|r| ScoreSummary::evaluate(r.total_score, self.threshold))
    }

    pub fn threshold(&self) -> ThresholdConfig {
        self.threshold
    }

    /// Change the opening threshold (101..=200)
    pub fn set_threshold(&mut self, value: u32) -> Result<()> {
        self.threshold = ThresholdConfig::new(value)?;
        tracing::debug!(threshold = value, "Threshold updated");
        Ok(())
    }

    /// Analyzer used for this session
    pub fn analyzer(&self) -> Arc<dyn Analyzer> {
        self.analyzer.clone()
    }

    /// Open the rear camera.
    ///
    /// Any previous frame and result are discarded. On failure the session
    /// is back in `Idle` and the error is for the user to see.
    pub async fn open_camera(&mut self) -> Result<()> {
        match self.state {
            SessionState::Closed => {
                return Err(Error::InvalidState("session is closed".to_string()));
            }
            SessionState::Analyzing { .. } => {
                return Err(Error::InvalidState("analysis in progress".to_string()));
            }
            SessionState::CapturingOpen => return Ok(()),
            _ => {}
        }

        self.state = SessionState::Idle;
        self.capture.discard_frame();

        match self.capture.open().await {
            Ok(()) => {
                self.state = SessionState::CapturingOpen;
                tracing::info!("Camera opened");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Camera could not be opened");
                Err(e)
            }
        }
    }

    /// Close the camera without capturing
    pub fn cancel_camera(&mut self) {
        if let SessionState::CapturingOpen = self.state {
            self.capture.close();
            self.state = SessionState::Idle;
            tracing::info!("Camera cancelled");
        }
    }

    /// Take the still frame; the camera is released either way
    pub fn capture(&mut self) -> Result<()> {
        if !matches!(self.state, SessionState::CapturingOpen) {
            return Err(Error::CameraUnavailable("camera is not open".to_string()));
        }

        match self.capture.capture_frame() {
            Ok(frame) => {
                tracing::info!(size = frame.size_bytes(), "Frame ready");
                self.state = SessionState::FrameReady;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Frame capture failed");
                self.state = SessionState::Idle;
                Err(e)
            }
        }
    }

    /// Enter `Analyzing` and hand out a ticket for the response.
    ///
    /// Returns `None` when an analysis is already in flight.
    pub fn begin_analysis(&mut self) -> Result<Option<AnalysisTicket>> {
        match self.state {
            SessionState::Analyzing { seq } => {
                tracing::debug!(seq = seq, "Analysis already in flight, ignoring trigger");
                return Ok(None);
            }
            SessionState::FrameReady | SessionState::ResultReady { .. } => {}
            _ => {
                return Err(Error::InvalidState("no captured frame to analyze".to_string()));
            }
        }

        let image = self
            .capture
            .frame()
            .map(|f| f.data.clone())
            .ok_or_else(|| Error::InvalidState("no captured frame to analyze".to_string()))?;

        self.last_seq += 1;
        let seq = self.last_seq;
        self.state = SessionState::Analyzing { seq };
        tracing::info!(seq = seq, size = image.len(), "Analysis started");

        Ok(Some(AnalysisTicket { seq, image }))
    }

    /// Deliver the response for `ticket`.
    ///
    /// Returns false when the response is stale and was dropped.
    pub fn complete_analysis(
        &mut self,
        ticket: AnalysisTicket,
        outcome: Result<AnalysisResult>,
    ) -> bool {
        match self.state {
            SessionState::Analyzing { seq } if seq == ticket.seq => {}
            _ => {
                tracing::debug!(
                    seq = ticket.seq,
                    phase = self.phase().as_str(),
                    "Discarding stale analysis response"
                );
                return false;
            }
        }

        let result = absorb(outcome);
        tracing::info!(
            seq = ticket.seq,
            tile_count = result.tiles.len(),
            total_score = result.total_score,
            "Result ready"
        );
        self.state = SessionState::ResultReady { result };
        true
    }

    /// Run one analysis of the captured frame.
    ///
    /// Returns false when nothing was applied (already in flight or stale).
    pub async fn analyze(&mut self) -> Result<bool> {
        let Some(ticket) = self.begin_analysis()? else {
            return Ok(false);
        };
        let outcome = self.analyzer.analyze(ticket.image()).await;
        Ok(self.complete_analysis(ticket, outcome))
    }

    /// Go back for another attempt. Pending responses become stale.
    pub async fn restart(&mut self, mode: RestartMode) -> Result<()> {
        if let SessionState::Closed = self.state {
            return Err(Error::InvalidState("session is closed".to_string()));
        }

        match mode {
            RestartMode::Reanalyze => {
                self.capture.close();
                self.state = if self.capture.frame().is_some() {
                    SessionState::FrameReady
                } else {
                    SessionState::Idle
                };
                tracing::info!(phase = self.phase().as_str(), "Session restarted (reanalyze)");
                Ok(())
            }
            RestartMode::Retake => {
                self.capture.close();
                self.state = SessionState::Idle;
                tracing::info!("Session restarted (retake)");
                self.open_camera().await
            }
        }
    }

    /// Release the camera and close the session
    pub fn teardown(&mut self) {
        self.capture.teardown();
        self.state = SessionState::Closed;
        tracing::info!("Session closed");
    }

    /// Snapshot for rendering
    pub fn view(&self) -> SessionView {
        let result = self.result();
        let summary = self.summary();

        SessionView {
            phase: self.phase(),
            loading: self.is_loading(),
            camera_open: self.capture.is_open(),
            has_frame: self.capture.frame().is_some(),
            threshold: self.threshold.value(),
            tiles: result.map(|r| r.tiles.clone()).unwrap_or_default(),
            total_score: result.map(|r| r.total_score),
            note: result.map(|r| r.note.clone()),
            status: summary.as_ref().map(|s| s.status),
            remaining: summary.as_ref().map(|s| s.remaining),
            message: summary.as_ref().map(ScoreSummary::message),
        }
    }
}

/// Turn any analysis outcome into something displayable
fn absorb(outcome: Result<AnalysisResult>) -> AnalysisResult {
    match outcome {
        Ok(result) => result,
        Err(Error::ServiceMisconfigured(msg)) => {
            tracing::error!(message = %msg, "Analysis service misconfigured");
            AnalysisResult::misconfigured()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Analysis failed, using fallback");
            AnalysisResult::fallback()
        }
    }
}

/// Controller shared between UI tasks.
///
/// The lock is released while the analysis call is pending.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<SessionController>>,
}

impl SharedSession {
    pub fn new(controller: SessionController) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, SessionController> {
        self.inner.lock().await
    }

    /// Trigger analysis; a second trigger while pending is a no-op
    pub async fn run_analysis(&self) -> Result<bool> {
        let (ticket, analyzer) = {
            let mut controller = self.inner.lock().await;
            match controller.begin_analysis()? {
                Some(ticket) => (ticket, controller.analyzer()),
                None => return Ok(false),
            }
        };

        let outcome = analyzer.analyze(ticket.image()).await;

        let mut controller = self.inner.lock().await;
        Ok(controller.complete_analysis(ticket, outcome))
    }

    pub async fn view(&self) -> SessionView {
        self.inner.lock().await.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture_session::StillCamera;
    use crate::models::{Tile, TileColor};
    use crate::result_validator::normalize;
    use crate::score_evaluator::ScoreStatus;
    use async_trait::async_trait;
    use image::{DynamicImage, Rgb, RgbImage};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubAnalyzer {
        outcome: fn() -> Result<AnalysisResult>,
        calls: AtomicUsize,
    }

    impl StubAnalyzer {
        fn new(outcome: fn() -> Result<AnalysisResult>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Analyzer for StubAnalyzer {
        async fn analyze(&self, image: &[u8]) -> Result<AnalysisResult> {
            assert_eq!(&image[..2], &[0xFF, 0xD8]);
            self.calls.fetch_add(1, Ordering::SeqCst);
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            (self.outcome)()
        }
    }

    fn blue_thirteen_red_seven() -> Result<AnalysisResult> {
        Ok(normalize(&json!({
            "tiles": [{"count": 13, "color": "blue"}, {"count": 7, "color": "kirmizi"}],
            "totalScore": 21,
            "note": "2 tiles detected"
        })))
    }

    fn one_hundred() -> Result<AnalysisResult> {
        let tiles = vec![
            Tile::new(13, TileColor::Red).unwrap(),
            Tile::new(13, TileColor::Black).unwrap(),
            Tile::new(13, TileColor::Blue).unwrap(),
            Tile::new(13, TileColor::Yellow).unwrap(),
            Tile::new(12, TileColor::Red).unwrap(),
            Tile::new(12, TileColor::Black).unwrap(),
            Tile::new(12, TileColor::Blue).unwrap(),
            Tile::new(12, TileColor::Yellow).unwrap(),
        ];
        Ok(AnalysisResult::from_tiles(tiles, "8 tiles detected"))
    }

    fn upstream_failure() -> Result<AnalysisResult> {
        Err(Error::ServiceCallFailed("upstream 503".to_string()))
    }

    fn missing_key() -> Result<AnalysisResult> {
        Err(Error::ServiceMisconfigured("API key not configured".to_string()))
    }

    fn camera() -> Arc<StillCamera> {
        Arc::new(StillCamera::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            32,
            24,
            Rgb([10, 120, 40]),
        ))))
    }

    async fn frame_ready(
        camera: Arc<StillCamera>,
        analyzer: Arc<StubAnalyzer>,
    ) -> SessionController {
        let mut controller = SessionController::new(camera, analyzer);
        controller.open_camera().await.unwrap();
        controller.capture().unwrap();
        controller
    }

    #[tokio::test]
    async fn test_end_to_end_below_threshold() {
        let camera = camera();
        let analyzer = StubAnalyzer::new(blue_thirteen_red_seven);
        let mut controller = SessionController::new(camera.clone(), analyzer.clone());

        controller.open_camera().await.unwrap();
        assert_eq!(controller.phase(), SessionPhase::CapturingOpen);
        assert!(controller.view().camera_open);

        controller.capture().unwrap();
        assert_eq!(controller.phase(), SessionPhase::FrameReady);
        assert_eq!(camera.active_streams(), 0);

        assert!(controller.analyze().await.unwrap());
        let view = controller.view();
        assert_eq!(view.phase, SessionPhase::ResultReady);
        assert!(!view.loading);
        assert_eq!(view.tiles.len(), 2);
        assert_eq!(view.total_score, Some(20));
        assert_eq!(view.status, Some(ScoreStatus::Below));
        assert_eq!(view.remaining, Some(81));
        assert_eq!(analyzer.calls(), 1);
    }

    #[tokio::test]
    async fn test_second_trigger_is_noop() {
        let analyzer = StubAnalyzer::new(blue_thirteen_red_seven);
        let controller = frame_ready(camera(), analyzer.clone()).await;
        let shared = SharedSession::new(controller);

        let (first, second) = tokio::join!(shared.run_analysis(), shared.run_analysis());
        assert!(first.unwrap());
        assert!(!second.unwrap());
        assert_eq!(analyzer.calls(), 1);
        assert_eq!(shared.view().await.total_score, Some(20));
    }

    #[tokio::test]
    async fn test_begin_twice_issues_one_ticket() {
        let mut controller = frame_ready(camera(), StubAnalyzer::new(one_hundred)).await;
        let ticket = controller.begin_analysis().unwrap();
        assert!(ticket.is_some());
        assert!(controller.is_loading());
        assert!(controller.begin_analysis().unwrap().is_none());
        assert!(controller.is_loading());
    }

    #[tokio::test]
    async fn test_analysis_clears_previous_result() {
        let mut controller = frame_ready(camera(), StubAnalyzer::new(one_hundred)).await;
        controller.analyze().await.unwrap();
        assert!(controller.result().is_some());

        let ticket = controller.begin_analysis().unwrap().unwrap();
        assert!(controller.result().is_none());
        assert_eq!(controller.view().total_score, None);
        assert!(controller.complete_analysis(ticket, one_hundred()));
    }

    #[tokio::test]
    async fn test_stale_response_is_ignored() {
        let mut controller = frame_ready(camera(), StubAnalyzer::new(one_hundred)).await;

        let old = controller.begin_analysis().unwrap().unwrap();
        controller.restart(RestartMode::Reanalyze).await.unwrap();
        assert_eq!(controller.phase(), SessionPhase::FrameReady);

        let current = controller.begin_analysis().unwrap().unwrap();
        assert!(current.seq() > old.seq());

        assert!(!controller.complete_analysis(old, blue_thirteen_red_seven()));
        assert!(controller.is_loading());

        assert!(controller.complete_analysis(current, one_hundred()));
        assert_eq!(controller.result().unwrap().total_score, 100);
    }

    #[tokio::test]
    async fn test_response_after_retake_is_ignored() {
        let camera = camera();
        let mut controller = frame_ready(camera.clone(), StubAnalyzer::new(one_hundred)).await;

        let ticket = controller.begin_analysis().unwrap().unwrap();
        controller.restart(RestartMode::Retake).await.unwrap();
        assert_eq!(controller.phase(), SessionPhase::CapturingOpen);

        assert!(!controller.complete_analysis(ticket, one_hundred()));
        assert_eq!(controller.phase(), SessionPhase::CapturingOpen);
        assert!(!controller.view().has_frame);
        assert_eq!(camera.opened_total(), 2);
    }

    #[tokio::test]
    async fn test_errors_are_absorbed() {
        let mut controller = frame_ready(camera(), StubAnalyzer::new(upstream_failure)).await;
        assert!(controller.analyze().await.unwrap());
        assert_eq!(controller.result(), Some(&AnalysisResult::fallback()));

        let mut controller = frame_ready(camera(), StubAnalyzer::new(missing_key)).await;
        assert!(controller.analyze().await.unwrap());
        assert_eq!(controller.result(), Some(&AnalysisResult::misconfigured()));
    }

    #[tokio::test]
    async fn test_denied_camera_returns_to_idle() {
        let mut controller = SessionController::new(
            Arc::new(StillCamera::denied()),
            StubAnalyzer::new(one_hundred),
        );
        let err = controller.open_camera().await.unwrap_err();
        assert!(matches!(err, Error::CameraUnavailable(_)));
        assert_eq!(controller.phase(), SessionPhase::Idle);
    }

    #[tokio::test]
    async fn test_cancel_releases_camera() {
        let camera = camera();
        let mut controller = SessionController::new(camera.clone(), StubAnalyzer::new(one_hundred));
        controller.open_camera().await.unwrap();
        controller.cancel_camera();
        assert_eq!(controller.phase(), SessionPhase::Idle);
        assert_eq!(camera.active_streams(), 0);
        assert!(matches!(controller.capture(), Err(Error::CameraUnavailable(_))));
    }

    #[tokio::test]
    async fn test_analyze_without_frame_is_invalid() {
        let mut controller = SessionController::new(camera(), StubAnalyzer::new(one_hundred));
        assert!(matches!(
            controller.analyze().await,
            Err(Error::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_threshold_changes_rederive_status() {
        let mut controller = frame_ready(camera(), StubAnalyzer::new(one_hundred)).await;
        controller.analyze().await.unwrap();
        assert_eq!(controller.summary().unwrap().status, ScoreStatus::Near);

        controller.set_threshold(150).unwrap();
        let summary = controller.summary().unwrap();
        assert_eq!(summary.status, ScoreStatus::Below);
        assert_eq!(summary.remaining, 50);

        assert!(controller.set_threshold(99).is_err());
        assert_eq!(controller.threshold().value(), 150);
    }

    #[tokio::test]
    async fn test_teardown_from_open_camera() {
        let camera = camera();
        let mut controller = SessionController::new(camera.clone(), StubAnalyzer::new(one_hundred));
        controller.open_camera().await.unwrap();
        controller.teardown();
        assert_eq!(controller.phase(), SessionPhase::Closed);
        assert_eq!(camera.active_streams(), 0);
        assert!(matches!(
            controller.open_camera().await,
            Err(Error::InvalidState(_))
        ));
    }
}
