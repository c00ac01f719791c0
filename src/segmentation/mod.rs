mod bodypix;
mod mask;
mod preprocess;

pub use bodypix::BodyPix;
pub use mask::{SegmentationMask, BACKGROUND_LABEL};
pub use preprocess::Preprocessor;

use anyhow::Result;
use image::RgbaImage;

/// Internal inference resolution: the longest-side target the frame is
/// scaled to before the model runs. Quality/speed tradeoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InternalResolution {
    Low,
    Medium,
    High,
    Full,
}

impl InternalResolution {
    /// Longest-side length in pixels, or `None` to run at the frame's own
    /// resolution.
    pub fn target_side(&self) -> Option<u32> {
        match self {
            InternalResolution::Low => Some(257),
            InternalResolution::Medium => Some(353),
            InternalResolution::High => Some(513),
            InternalResolution::Full => None,
        }
    }
}

/// Configuration surface passed to the segmentation model.
#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    /// Mirror the input before inference.
    pub flip_horizontal: bool,
    pub internal_resolution: InternalResolution,
    /// Confidence floor in [0,1] above which a pixel is labeled body.
    pub segmentation_threshold: f32,
    /// Per-instance confidence floor.
    pub score_threshold: f32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            flip_horizontal: false,
            internal_resolution: InternalResolution::High,
            // Raised to 0.9 to cut false positives around the body edge
            segmentation_threshold: 0.9,
            score_threshold: 0.2,
        }
    }
}

/// Trait for person/part segmentation models.
///
/// Allows swapping between backends (BodyPix-style part models, binary
/// matting models, a passthrough stub for model-less runs).
pub trait PersonSegmenter {
    /// Label every pixel of `frame`: 0 = background, nonzero = part id.
    /// The returned mask always matches the frame's dimensions.
    fn segment(&mut self, frame: &RgbaImage) -> Result<SegmentationMask>;

    /// Reset internal state. Call when switching cameras or on a scene cut.
    fn reset_state(&mut self) {
        // stateless by default
    }
}

/// Segmenter that labels everything background. Used when no model path is
/// given so the pipeline still runs end to end.
pub struct PassthroughSegmenter;

impl PersonSegmenter for PassthroughSegmenter {
    fn segment(&mut self, frame: &RgbaImage) -> Result<SegmentationMask> {
        Ok(SegmentationMask::empty(frame.width(), frame.height()))
    }
}

/// Create the default segmenter for a model path.
pub fn create_segmenter(
    model_path: &str,
    config: SegmenterConfig,
) -> Result<Box<dyn PersonSegmenter>> {
    let model = BodyPix::new(model_path, config)?;
    Ok(Box::new(model))
}
