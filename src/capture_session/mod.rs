//! CaptureSession - Camera lifecycle and single still frame
//!
//! ## Responsibilities
//!
//! - Open the rear camera through the device API
//! - Grab one frame, render it at native resolution and encode it as JPEG
//! - Release the stream on capture, cancel and teardown
//!
//! Single-shot model: capturing a frame always stops the stream.

mod still_camera;
mod types;

pub use still_camera::StillCamera;
pub use types::*;

use crate::error::{Error, Result};
use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbImage};
use std::sync::Arc;

/// JPEG quality for captured frames (0.8 on a 0-1 scale)
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// CaptureSession instance
pub struct CaptureSession {
    camera: Arc<dyn CameraDevice>,
    stream: Option<Box<dyn MediaStream>>,
    frame: Option<CapturedFrame>,
    jpeg_quality: u8,
    closed: bool,
}

impl CaptureSession {
    /// Create new CaptureSession
    pub fn new(camera: Arc<dyn CameraDevice>) -> Self {
        Self::with_quality(camera, DEFAULT_JPEG_QUALITY)
    }

    /// Create new CaptureSession with custom JPEG quality (1-100)
    pub fn with_quality(camera: Arc<dyn CameraDevice>, jpeg_quality: u8) -> Self {
        Self {
            camera,
            stream: None,
            frame: None,
            jpeg_quality: jpeg_quality.clamp(1, 100),
            closed: false,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> CaptureState {
        if self.closed {
            CaptureState::Closed
        } else if self.stream.is_some() {
            CaptureState::CameraOpen
        } else if self.frame.is_some() {
            CaptureState::FrameCaptured
        } else {
            CaptureState::Idle
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Captured frame, if any
    pub fn frame(&self) -> Option<&CapturedFrame> {
        self.frame.as_ref()
    }

    /// Drop the captured frame
    pub fn discard_frame(&mut self) {
        self.frame = None;
    }

    /// Request the rear camera.
    ///
    /// No-op when a stream is already open. Any previous frame is discarded.
    pub async fn open(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::InvalidState("capture session is closed".to_string()));
        }
        if self.stream.is_some() {
            return Ok(());
        }

        self.frame = None;

        let stream = self
            .camera
            .start_capture()
            .await
            .map_err(|e| match e {
                Error::CameraUnavailable(msg) => Error::CameraUnavailable(msg),
                other => Error::CameraUnavailable(other.to_string()),
            })?;

        let (width, height) = stream.resolution();
        tracing::debug!(width = width, height = height, "Camera stream opened");

        self.stream = Some(stream);
        Ok(())
    }

    /// Grab, encode and keep one frame, then release the camera
    pub fn capture_frame(&mut self) -> Result<&CapturedFrame> {
        let Some(mut stream) = self.stream.take() else {
            return Err(Error::CameraUnavailable(
                "no open camera stream".to_string(),
            ));
        };

        let resolution = stream.resolution();
        let grabbed = stream.grab_frame();
        stream.stop();
        tracing::debug!("Camera stream released after capture");

        let image = grabbed?;
        let data = encode_jpeg(&image, resolution, self.jpeg_quality)?;
        let (width, height) = effective_resolution(&image, resolution);

        tracing::debug!(
            width = width,
            height = height,
            size = data.len(),
            quality = self.jpeg_quality,
            "Frame captured"
        );

        Ok(self.frame.insert(CapturedFrame {
            data,
            width,
            height,
            captured_at: Utc::now(),
        }))
    }

    /// Stop the camera stream if open. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            tracing::debug!("Camera stream closed");
        }
    }

    /// Release everything and enter `Closed`
    pub fn teardown(&mut self) {
        self.close();
        self.frame = None;
        self.closed = true;
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn effective_resolution(image: &DynamicImage, (width, height): (u32, u32)) -> (u32, u32) {
    if width == 0 || height == 0 {
        image.dimensions()
    } else {
        (width, height)
    }
}

/// Render `image` onto an RGB bitmap of the stream resolution and encode it
pub fn encode_jpeg(image: &DynamicImage, resolution: (u32, u32), quality: u8) -> Result<Vec<u8>> {
    let (width, height) = effective_resolution(image, resolution);

    let rgb = image.to_rgb8();
    let canvas: RgbImage = if rgb.dimensions() == (width, height) {
        rgb
    } else {
        imageops::resize(&rgb, width, height, FilterType::Triangle)
    };

    let mut data = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut data, quality);
    encoder.encode_image(&canvas)?;
    Ok(data)
}
