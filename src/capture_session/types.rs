//! CaptureSession data types and camera collaborator traits

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use image::DynamicImage;

/// Device camera API
///
/// `start_capture` opens the rear-facing camera and may suspend while the
/// user answers a permission prompt.
/// Implementations report denial or a missing device as
/// `Error::CameraUnavailable`.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn start_capture(&self) -> Result<Box<dyn MediaStream>>;
}

/// Live camera stream handle
pub trait MediaStream: Send {
    /// Native (width, height) of the stream
    fn resolution(&self) -> (u32, u32);

    /// Grab the current frame
    fn grab_frame(&mut self) -> Result<DynamicImage>;

    /// Stop every track and release the device. Called exactly once.
    fn stop(&mut self);
}

/// Capture lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    CameraOpen,
    FrameCaptured,
    Closed,
}

/// Encoded still frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    /// JPEG image data
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

impl CapturedFrame {
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}
