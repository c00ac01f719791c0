mod webcam;

pub use webcam::WebcamCapture;

use anyhow::Result;
use image::RgbaImage;

/// Trait for camera capture sources
pub trait CaptureSource {
    /// Capture a single RGBA frame. The returned frame is an immutable
    /// snapshot owned by the current cycle.
    fn capture_frame(&mut self) -> Result<RgbaImage>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);
}
