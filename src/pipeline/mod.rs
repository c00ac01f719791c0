mod background;
mod bbox;
mod classify;

pub use background::BackgroundAccumulator;
pub use bbox::{BoundingBox, Detection, PaddedBox};
pub use classify::Classified;

use crate::segmentation::{PersonSegmenter, SegmentationMask};
use image::{imageops, RgbaImage};
use thiserror::Error;

/// Default expansion applied to the detected box, to tolerate false
/// negatives around the body's edges.
pub const DEFAULT_BOX_SCALE: f32 = 1.3;

#[derive(Debug, Error)]
pub enum CycleError {
    /// The mask does not align 1:1 with the frame it was computed from.
    /// The cycle is aborted before any pixel indexing.
    #[error("segmentation mask is {mask_width}x{mask_height} but frame is {frame_width}x{frame_height}")]
    DimensionMismatch {
        frame_width: u32,
        frame_height: u32,
        mask_width: u32,
        mask_height: u32,
    },

    /// The segmentation source failed for this frame. Fatal to the cycle
    /// only; the pipeline returns to idle so the next tick can retry.
    #[error("segmentation failed")]
    Segmentation(#[source] anyhow::Error),
}

/// At most one classify-and-render cycle runs at a time. A tick arriving
/// while a cycle is in flight is skipped, never queued, so a slow
/// segmenter cannot build a backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleState {
    Idle,
    InFlight,
}

/// Everything one completed cycle produced.
pub struct CycleResult {
    pub body_image: RgbaImage,
    pub color_image: RgbaImage,
    pub overlay_image: RgbaImage,
    pub detection: Detection,
    /// Present exactly when `detection` is `Detected`.
    pub padded_box: Option<PaddedBox>,
    /// The mask that drove this cycle, kept for the hover label readout.
    pub mask: SegmentationMask,
}

pub enum CycleOutcome {
    Completed(CycleResult),
    /// A previous cycle was still in flight; this tick was dropped.
    Skipped,
}

/// The per-frame processing pipeline and all state carried across frames:
/// the persistent background estimate and the in-flight guard.
pub struct Pipeline {
    background: BackgroundAccumulator,
    state: CycleState,
    box_scale: f32,
    backdrop_source: Option<RgbaImage>,
    backdrop_scaled: Option<RgbaImage>,
}

impl Pipeline {
    pub fn new(box_scale: f32) -> Self {
        Self {
            background: BackgroundAccumulator::new(),
            state: CycleState::Idle,
            box_scale,
            backdrop_source: None,
            backdrop_scaled: None,
        }
    }

    /// Set the alternate backdrop the body cutout is composited over. The
    /// image is rescaled lazily to each frame size it meets.
    pub fn set_backdrop(&mut self, backdrop: RgbaImage) {
        self.backdrop_source = Some(backdrop);
        self.backdrop_scaled = None;
    }

    /// The persistent background estimate.
    pub fn background(&self) -> &RgbaImage {
        self.background.image()
    }

    /// Re-seed the background estimate, e.g. when the frame source's
    /// resolution changes or the scene is known to have cut.
    pub fn reset_background(&mut self, width: u32, height: u32) {
        self.background.reset(width, height);
    }

    /// Run one full cycle: segment the frame, classify every pixel, fold
    /// background pixels into the estimate, and pad the detected box.
    ///
    /// Returns `Skipped` when a cycle is already in flight. The in-flight
    /// guard is released on every exit path, including errors — a failing
    /// segmenter must never freeze the pipeline.
    pub fn process_cycle(
        &mut self,
        frame: &RgbaImage,
        segmenter: &mut dyn PersonSegmenter,
    ) -> Result<CycleOutcome, CycleError> {
        if self.state == CycleState::InFlight {
            tracing::debug!("previous cycle still in flight, skipping tick");
            return Ok(CycleOutcome::Skipped);
        }

        self.state = CycleState::InFlight;
        let result = self.run_cycle(frame, segmenter);
        self.state = CycleState::Idle;

        result.map(CycleOutcome::Completed)
    }

    fn run_cycle(
        &mut self,
        frame: &RgbaImage,
        segmenter: &mut dyn PersonSegmenter,
    ) -> Result<CycleResult, CycleError> {
        let _span = tracing::debug_span!("cycle").entered();

        let mask = segmenter
            .segment(frame)
            .map_err(CycleError::Segmentation)?;

        let (frame_width, frame_height) = frame.dimensions();
        let (mask_width, mask_height) = mask.dimensions();
        if (frame_width, frame_height) != (mask_width, mask_height) {
            return Err(CycleError::DimensionMismatch {
                frame_width,
                frame_height,
                mask_width,
                mask_height,
            });
        }

        let backdrop = self.backdrop_for(frame_width, frame_height);
        let classified = classify::classify(frame, &mask, &mut self.background, backdrop.as_ref());

        let padded_box = match classified.detection {
            Detection::Detected(bbox) => {
                let padded = bbox.pad(self.box_scale);
                tracing::trace!(
                    "body box [{},{}]x[{},{}] padded to {:?}",
                    bbox.min_x,
                    bbox.max_x,
                    bbox.min_y,
                    bbox.max_y,
                    padded
                );
                Some(padded)
            }
            Detection::NotDetected => None,
        };

        Ok(CycleResult {
            body_image: classified.body_image,
            color_image: classified.color_image,
            overlay_image: classified.overlay_image,
            detection: classified.detection,
            padded_box,
            mask,
        })
    }

    /// Backdrop at frame resolution, rescaled once per size change.
    fn backdrop_for(&mut self, width: u32, height: u32) -> Option<RgbaImage> {
        let source = self.backdrop_source.as_ref()?;

        let needs_rescale = self
            .backdrop_scaled
            .as_ref()
            .map_or(true, |img| img.dimensions() != (width, height));
        if needs_rescale {
            self.backdrop_scaled = Some(if source.dimensions() == (width, height) {
                source.clone()
            } else {
                imageops::resize(source, width, height, imageops::FilterType::Lanczos3)
            });
        }

        self.backdrop_scaled.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::{PassthroughSegmenter, SegmentationMask};
    use anyhow::anyhow;
    use image::Rgba;

    /// Segmenter stub returning a canned mask, or failing on demand.
    struct ScriptedSegmenter {
        mask: Option<SegmentationMask>,
        fail: bool,
    }

    impl PersonSegmenter for ScriptedSegmenter {
        fn segment(&mut self, _frame: &RgbaImage) -> anyhow::Result<SegmentationMask> {
            if self.fail {
                return Err(anyhow!("model backend unavailable"));
            }
            Ok(self.mask.clone().unwrap())
        }
    }

    fn gradient_frame(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([x as u8, y as u8, (x * y) as u8, 255])
        })
    }

    #[test]
    fn all_background_cycle_copies_frame_into_estimate() {
        let frame = gradient_frame(8, 6);
        let mut pipeline = Pipeline::new(DEFAULT_BOX_SCALE);
        let mut segmenter = PassthroughSegmenter;

        let outcome = pipeline.process_cycle(&frame, &mut segmenter).unwrap();
        let result = match outcome {
            CycleOutcome::Completed(r) => r,
            CycleOutcome::Skipped => panic!("idle pipeline must run the cycle"),
        };

        assert_eq!(result.detection, Detection::NotDetected);
        assert!(result.padded_box.is_none());
        assert_eq!(pipeline.background(), &frame);
    }

    #[test]
    fn detection_carries_padded_box() {
        let frame = gradient_frame(40, 40);
        let mut labels = vec![0u8; 1600];
        for y in 10..=30 {
            for x in 10..=20 {
                labels[y * 40 + x] = 1;
            }
        }
        let mut segmenter = ScriptedSegmenter {
            mask: Some(SegmentationMask::new(40, 40, labels)),
            fail: false,
        };

        let mut pipeline = Pipeline::new(1.3);
        let result = match pipeline.process_cycle(&frame, &mut segmenter).unwrap() {
            CycleOutcome::Completed(r) => r,
            CycleOutcome::Skipped => panic!("idle pipeline must run the cycle"),
        };

        assert_eq!(
            result.detection,
            Detection::Detected(BoundingBox {
                min_x: 10,
                min_y: 10,
                max_x: 20,
                max_y: 30,
            })
        );
        let padded = result.padded_box.unwrap();
        assert!((padded.min_x - 8.5).abs() < 1e-5);
        assert!((padded.min_y - 7.0).abs() < 1e-5);
        assert!((padded.width - 13.0).abs() < 1e-5);
        assert!((padded.height - 26.0).abs() < 1e-5);
    }

    #[test]
    fn dimension_mismatch_aborts_cycle_and_leaves_estimate_untouched() {
        let frame = gradient_frame(8, 6);
        let mut pipeline = Pipeline::new(DEFAULT_BOX_SCALE);
        pipeline.reset_background(8, 6);
        let before = pipeline.background().clone();

        let mut segmenter = ScriptedSegmenter {
            mask: Some(SegmentationMask::empty(4, 4)),
            fail: false,
        };

        let err = pipeline.process_cycle(&frame, &mut segmenter).unwrap_err();
        assert!(matches!(err, CycleError::DimensionMismatch { .. }));
        assert_eq!(pipeline.background(), &before);
    }

    #[test]
    fn segmenter_failure_releases_guard() {
        let frame = gradient_frame(8, 6);
        let mut pipeline = Pipeline::new(DEFAULT_BOX_SCALE);

        let mut failing = ScriptedSegmenter {
            mask: None,
            fail: true,
        };
        let err = pipeline.process_cycle(&frame, &mut failing).unwrap_err();
        assert!(matches!(err, CycleError::Segmentation(_)));

        // Next tick must run normally.
        let mut segmenter = PassthroughSegmenter;
        assert!(matches!(
            pipeline.process_cycle(&frame, &mut segmenter),
            Ok(CycleOutcome::Completed(_))
        ));
    }

    #[test]
    fn in_flight_guard_skips_reentrant_tick() {
        let frame = gradient_frame(4, 4);
        let mut pipeline = Pipeline::new(DEFAULT_BOX_SCALE);
        pipeline.state = CycleState::InFlight;

        let mut segmenter = PassthroughSegmenter;
        assert!(matches!(
            pipeline.process_cycle(&frame, &mut segmenter),
            Ok(CycleOutcome::Skipped)
        ));

        // And runs once the guard drops.
        pipeline.state = CycleState::Idle;
        assert!(matches!(
            pipeline.process_cycle(&frame, &mut segmenter),
            Ok(CycleOutcome::Completed(_))
        ));
    }

    #[test]
    fn backdrop_is_rescaled_to_frame_size() {
        let frame = gradient_frame(8, 8);
        let mut pipeline = Pipeline::new(DEFAULT_BOX_SCALE);
        pipeline.set_backdrop(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255])));

        let mut labels = vec![0u8; 64];
        labels[0] = 1;
        let mut segmenter = ScriptedSegmenter {
            mask: Some(SegmentationMask::new(8, 8, labels)),
            fail: false,
        };

        let result = match pipeline.process_cycle(&frame, &mut segmenter).unwrap() {
            CycleOutcome::Completed(r) => r,
            CycleOutcome::Skipped => panic!("idle pipeline must run the cycle"),
        };

        assert_eq!(result.overlay_image.dimensions(), (8, 8));
        assert_eq!(result.overlay_image.get_pixel(0, 0), frame.get_pixel(0, 0));
        assert_eq!(result.overlay_image.get_pixel(5, 5), &Rgba([1, 2, 3, 255]));
    }
}
