use crate::segmentation::SegmentationMask;
use image::RgbaImage;

/// Persistent best-estimate background image.
///
/// Every cycle copies in the pixels the mask labels as background; pixels
/// currently occluded by a body keep the last value observed for them. Over
/// time, as the person moves, the estimate converges on the full empty
/// scene — temporal accumulation standing in for true inpainting.
pub struct BackgroundAccumulator {
    image: RgbaImage,
}

impl BackgroundAccumulator {
    pub fn new() -> Self {
        Self {
            image: RgbaImage::new(0, 0),
        }
    }

    /// Re-seed the estimate to all-zero (black) at a new size. Called on
    /// first use and whenever the frame source's dimensions change.
    pub fn reset(&mut self, width: u32, height: u32) {
        tracing::debug!("resetting background estimate to {}x{}", width, height);
        self.image = RgbaImage::new(width, height);
    }

    /// Fold one frame into the estimate: every pixel the mask labels as
    /// background is copied in, body pixels are left untouched.
    ///
    /// The caller has already verified that `frame` and `mask` agree on
    /// dimensions.
    pub fn update(&mut self, frame: &RgbaImage, mask: &SegmentationMask) -> &RgbaImage {
        if self.image.dimensions() != frame.dimensions() {
            self.reset(frame.width(), frame.height());
        }

        for (x, y, pixel) in frame.enumerate_pixels() {
            if !mask.is_body(x, y) {
                self.image.put_pixel(x, y, *pixel);
            }
        }

        &self.image
    }

    /// Record a single background pixel. Used by the classifier's single
    /// pass so background folding and body classification share one walk
    /// over the frame.
    #[inline]
    pub(crate) fn absorb_pixel(&mut self, x: u32, y: u32, pixel: image::Rgba<u8>) {
        self.image.put_pixel(x, y, pixel);
    }

    /// Make sure the estimate matches the live frame size, re-seeding if it
    /// does not. Returns true when a reset happened.
    pub(crate) fn ensure_size(&mut self, width: u32, height: u32) -> bool {
        if self.image.dimensions() != (width, height) {
            self.reset(width, height);
            true
        } else {
            false
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl Default for BackgroundAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient_frame(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([x as u8, y as u8, (x + y) as u8, 255])
        })
    }

    #[test]
    fn all_background_frame_is_copied_exactly() {
        let frame = gradient_frame(8, 6);
        let mask = SegmentationMask::empty(8, 6);

        let mut accum = BackgroundAccumulator::new();
        let estimate = accum.update(&frame, &mask);

        assert_eq!(estimate, &frame);
    }

    #[test]
    fn all_background_update_is_idempotent() {
        let frame = gradient_frame(8, 6);
        let mask = SegmentationMask::empty(8, 6);

        let mut accum = BackgroundAccumulator::new();
        accum.update(&frame, &mask);
        let once = accum.image().clone();
        accum.update(&frame, &mask);

        assert_eq!(accum.image(), &once);
    }

    #[test]
    fn body_pixels_never_overwrite_prior_background() {
        let width = 4;
        let height = 4;
        let first = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let second = RgbaImage::from_pixel(width, height, Rgba([200, 200, 200, 255]));

        let mut accum = BackgroundAccumulator::new();
        accum.update(&first, &SegmentationMask::empty(width, height));

        // Second frame is entirely body: estimate must not move.
        let all_body = SegmentationMask::new(width, height, vec![1; 16]);
        accum.update(&second, &all_body);

        assert_eq!(accum.image(), &first);
    }

    #[test]
    fn first_use_seeds_black_under_body_pixels() {
        let frame = RgbaImage::from_pixel(2, 2, Rgba([50, 60, 70, 255]));
        let mask = SegmentationMask::new(2, 2, vec![1, 0, 0, 0]);

        let mut accum = BackgroundAccumulator::new();
        accum.update(&frame, &mask);

        assert_eq!(accum.image().get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(accum.image().get_pixel(1, 0), &Rgba([50, 60, 70, 255]));
    }

    #[test]
    fn dimension_change_reseeds_estimate() {
        let mut accum = BackgroundAccumulator::new();
        accum.update(
            &RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])),
            &SegmentationMask::empty(4, 4),
        );

        // Camera switched resolution: estimate re-seeds, all-body mask
        // means nothing is copied in, so the image stays black.
        let all_body = SegmentationMask::new(6, 6, vec![1; 36]);
        accum.update(&RgbaImage::new(6, 6), &all_body);

        assert_eq!(accum.image().dimensions(), (6, 6));
        assert!(accum
            .image()
            .pixels()
            .all(|p| *p == Rgba([0, 0, 0, 0])));
    }

    #[test]
    fn explicit_reset_clears_estimate() {
        let mut accum = BackgroundAccumulator::new();
        accum.update(
            &RgbaImage::from_pixel(4, 4, Rgba([9, 9, 9, 255])),
            &SegmentationMask::empty(4, 4),
        );
        accum.reset(4, 4);
        assert!(accum.image().pixels().all(|p| *p == Rgba([0, 0, 0, 0])));
    }
}
