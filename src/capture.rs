use opencv::{core::Mat, prelude::*, videoio};

use crate::error::CaptureError;

/// Seam between the session loop and the physical camera, so the loop can
/// be driven headlessly in tests.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Mat, CaptureError>;

    /// Discard frames buffered by the backend so the next read is current.
    fn flush(&mut self) -> Result<(), CaptureError>;
}

/// Webcam wrapper. Opens the device once at startup and holds the handle
/// for the lifetime of the run; `Drop` releases it on every exit path.
pub struct CaptureSource {
    device: videoio::VideoCapture,
    index: i32,
}

impl CaptureSource {
    // Drivers commonly keep a few stale frames queued.
    const FLUSH_FRAMES: usize = 4;

    pub fn open(index: i32) -> Result<Self, CaptureError> {
        let device = videoio::VideoCapture::new(index, videoio::CAP_ANY)
            .map_err(|source| CaptureError::Open { index, source })?;

        if !device.is_opened()? {
            return Err(CaptureError::Unavailable { index });
        }

        log::info!("opened camera device {}", index);
        Ok(CaptureSource { device, index })
    }
}

impl FrameSource for CaptureSource {
    fn read_frame(&mut self) -> Result<Mat, CaptureError> {
        let mut frame = Mat::default();
        if !self.device.read(&mut frame)? || frame.empty() {
            return Err(CaptureError::EmptyFrame);
        }
        Ok(frame)
    }

    fn flush(&mut self) -> Result<(), CaptureError> {
        for _ in 0..Self::FLUSH_FRAMES {
            self.device.grab()?;
        }
        Ok(())
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        if self.device.release().is_err() {
            log::warn!("failed to release camera device {}", self.index);
        }
    }
}
