//! StillCamera - CameraDevice backed by a fixed image
//!
//! Serves the same picture on every grab. Used as a deterministic camera
//! in tests. Tracks open streams so callers
//! can verify nothing is left running.

use super::types::{CameraDevice, MediaStream};
use crate::error::{Error, Result};
use async_trait::async_trait;
use image::{DynamicImage, GenericImageView};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Camera that always shows the same image
pub struct StillCamera {
    image: Option<DynamicImage>,
    active_streams: Arc<AtomicUsize>,
    opened_total: AtomicUsize,
}

impl StillCamera {
    /// Camera showing `image`
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image: Some(image),
            active_streams: Arc::new(AtomicUsize::new(0)),
            opened_total: AtomicUsize::new(0),
        }
    }

    /// Camera whose permission is always denied
    pub fn denied() -> Self {
        Self {
            image: None,
            active_streams: Arc::new(AtomicUsize::new(0)),
            opened_total: AtomicUsize::new(0),
        }
    }

    /// Streams started and not yet stopped
    pub fn active_streams(&self) -> usize {
        self.active_streams.load(Ordering::SeqCst)
    }

    /// Streams started since creation
    pub fn opened_total(&self) -> usize {
        self.opened_total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraDevice for StillCamera {
    async fn start_capture(&self) -> Result<Box<dyn MediaStream>> {
        let Some(image) = self.image.clone() else {
            return Err(Error::CameraUnavailable(
                "camera permission denied".to_string(),
            ));
        };

        self.active_streams.fetch_add(1, Ordering::SeqCst);
        self.opened_total.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            active = self.active_streams(),
            "Still camera stream started"
        );

        Ok(Box::new(StillStream {
            image,
            active_streams: self.active_streams.clone(),
        }))
    }
}

struct StillStream {
    image: DynamicImage,
    active_streams: Arc<AtomicUsize>,
}

impl MediaStream for StillStream {
    fn resolution(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn grab_frame(&mut self) -> Result<DynamicImage> {
        Ok(self.image.clone())
    }

    fn stop(&mut self) {
        self.active_streams.fetch_sub(1, Ordering::SeqCst);
    }
}
