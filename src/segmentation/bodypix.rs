use super::preprocess::Preprocessor;
use super::{PersonSegmenter, SegmentationMask, SegmenterConfig};
use anyhow::{Context, Result};
use image::RgbaImage;
use ort::{GraphOptimizationLevel, Session};
use std::path::Path;

/// Number of body-part channels the part head emits. Part ids on the mask
/// are 1-based so that 0 stays reserved for background.
const PART_CHANNELS: usize = 24;

/// BodyPix-style person/part segmentation model.
///
/// The network takes a normalized NCHW frame and emits two heads: person
/// logits `[1, 1, H, W]` and part logits `[1, 24, H, W]`. A pixel is
/// labeled body when its sigmoid person score clears the segmentation
/// threshold; its part id is the argmax over the part channels.
pub struct BodyPix {
    session: Session,
    preprocessor: Preprocessor,
    config: SegmenterConfig,
}

impl BodyPix {
    /// Load a BodyPix ONNX model from disk.
    pub fn new<P: AsRef<Path>>(model_path: P, config: SegmenterConfig) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading segmentation model from {}", path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        tracing::info!("Segmentation model loaded successfully");
        tracing::debug!(
            "internal_resolution={:?}, segmentation_threshold={}, score_threshold={}",
            config.internal_resolution,
            config.segmentation_threshold,
            config.score_threshold
        );

        let preprocessor = Preprocessor::new(config.internal_resolution, config.flip_horizontal);

        Ok(Self {
            session,
            preprocessor,
            config,
        })
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl PersonSegmenter for BodyPix {
    fn segment(&mut self, frame: &RgbaImage) -> Result<SegmentationMask> {
        let _span = tracing::debug_span!("bodypix_segment").entered();

        let input_tensor = self.preprocessor.preprocess(frame);

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![input_tensor.view()]?)
            .context("Failed to run inference")?;
        drop(_infer_span);

        // Person head: [1, 1, H, W]; part head: [1, 24, H, W]
        let person = outputs[0]
            .try_extract_tensor::<f32>()?
            .view()
            .to_owned();
        let parts = outputs[1]
            .try_extract_tensor::<f32>()?
            .view()
            .to_owned();

        let person_shape = person.shape().to_vec();
        let map_height = person_shape[2];
        let map_width = person_shape[3];

        // Per-instance gate: if no pixel anywhere clears the score
        // threshold, treat the frame as empty rather than emitting a
        // low-confidence speckle mask.
        let best_score = person
            .iter()
            .copied()
            .map(sigmoid)
            .fold(0.0f32, f32::max);

        let mut labels = vec![0u8; map_width * map_height];

        if best_score >= self.config.score_threshold {
            for y in 0..map_height {
                for x in 0..map_width {
                    let score = sigmoid(person[[0, 0, y, x]]);
                    if score < self.config.segmentation_threshold {
                        continue;
                    }

                    let mut best_part = 0usize;
                    let mut best_logit = f32::NEG_INFINITY;
                    for c in 0..PART_CHANNELS {
                        let logit = parts[[0, c, y, x]];
                        if logit > best_logit {
                            best_logit = logit;
                            best_part = c;
                        }
                    }

                    labels[y * map_width + x] = (best_part + 1) as u8;
                }
            }
        } else {
            tracing::debug!("best person score {:.3} below score threshold", best_score);
        }

        Ok(self.preprocessor.postprocess_labels(
            &labels,
            map_width as u32,
            map_height as u32,
            frame.width(),
            frame.height(),
        ))
    }
}
