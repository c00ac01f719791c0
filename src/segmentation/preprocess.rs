use super::{InternalResolution, SegmentationMask};
use image::{imageops, RgbaImage};
use ndarray::Array4;

/// Converts RGBA frames to model input tensors and model label maps back to
/// frame-aligned masks.
pub struct Preprocessor {
    internal_resolution: InternalResolution,
    flip_horizontal: bool,
}

impl Preprocessor {
    pub fn new(internal_resolution: InternalResolution, flip_horizontal: bool) -> Self {
        Self {
            internal_resolution,
            flip_horizontal,
        }
    }

    /// Inference dimensions for a frame of the given size: the frame scaled
    /// so its longest side hits the internal-resolution target, aspect
    /// ratio preserved. `Full` keeps the frame's own size.
    pub fn inference_size(&self, frame_width: u32, frame_height: u32) -> (u32, u32) {
        match self.internal_resolution.target_side() {
            None => (frame_width, frame_height),
            Some(side) => {
                let longest = frame_width.max(frame_height);
                if longest <= side {
                    return (frame_width, frame_height);
                }
                let scale = side as f32 / longest as f32;
                (
                    ((frame_width as f32 * scale).round() as u32).max(1),
                    ((frame_height as f32 * scale).round() as u32).max(1),
                )
            }
        }
    }

    /// Preprocess an RGBA frame into a normalized NCHW tensor.
    ///
    /// Steps:
    /// 1. Optionally mirror horizontally
    /// 2. Resize to the inference resolution
    /// 3. Normalize RGB channels to [0, 1], dropping alpha
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn preprocess(&self, frame: &RgbaImage) -> Array4<f32> {
        let _span = tracing::debug_span!("preprocess").entered();

        let (target_width, target_height) = self.inference_size(frame.width(), frame.height());

        let mirrored;
        let source = if self.flip_horizontal {
            mirrored = imageops::flip_horizontal(frame);
            &mirrored
        } else {
            frame
        };

        let resized = if source.dimensions() != (target_width, target_height) {
            imageops::resize(
                source,
                target_width,
                target_height,
                imageops::FilterType::Lanczos3,
            )
        } else {
            source.clone()
        };

        let mut tensor =
            Array4::<f32>::zeros((1, 3, target_height as usize, target_width as usize));

        for (x, y, pixel) in resized.enumerate_pixels() {
            tensor[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            tensor[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            tensor[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        tensor
    }

    /// Bring a model-resolution label map back to frame resolution.
    ///
    /// Labels are categorical, so resizing uses nearest-neighbor — any
    /// interpolating filter would invent part ids that were never emitted.
    /// When the input was mirrored for inference, the label map is mirrored
    /// back so the mask stays pixel-aligned with the unmirrored frame.
    pub fn postprocess_labels(
        &self,
        labels: &[u8],
        label_width: u32,
        label_height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> SegmentationMask {
        let _span = tracing::debug_span!("postprocess").entered();

        let label_image = image::GrayImage::from_fn(label_width, label_height, |x, y| {
            image::Luma([labels[(y * label_width + x) as usize]])
        });

        let label_image = if self.flip_horizontal {
            imageops::flip_horizontal(&label_image)
        } else {
            label_image
        };

        let resized = if (label_width, label_height) != (frame_width, frame_height) {
            imageops::resize(
                &label_image,
                frame_width,
                frame_height,
                imageops::FilterType::Nearest,
            )
        } else {
            label_image
        };

        SegmentationMask::new(frame_width, frame_height, resized.into_raw())
    }
}
