use super::background::BackgroundAccumulator;
use super::bbox::{BoundsTracker, Detection};
use crate::segmentation::SegmentationMask;
use image::RgbaImage;

/// Per-cycle classification output. All images match the frame dimensions;
/// pixels a buffer was not written to stay at the zero default
/// (transparent black).
pub struct Classified {
    /// Body-labeled pixels only, everything else transparent.
    pub body_image: RgbaImage,
    /// Body pixels for the colorized view (hover shows the part id).
    pub color_image: RgbaImage,
    /// Body pixels composited over the alternate backdrop.
    pub overlay_image: RgbaImage,
    pub detection: Detection,
}

/// Walk the frame once, splitting pixels by mask label.
///
/// Body pixels are copied into the body, color, and overlay buffers and
/// grow the running bounding box; background pixels are absorbed into the
/// persistent background estimate instead. Every pixel lands in exactly one
/// of the two branches.
///
/// `backdrop`, when given, seeds the overlay buffer and must already be
/// sized to the frame. Visit order is x outer, y inner, matching the
/// reference walk; the aggregate results do not depend on it.
pub fn classify(
    frame: &RgbaImage,
    mask: &SegmentationMask,
    background: &mut BackgroundAccumulator,
    backdrop: Option<&RgbaImage>,
) -> Classified {
    let (width, height) = frame.dimensions();
    debug_assert_eq!(mask.dimensions(), (width, height));

    background.ensure_size(width, height);

    let mut body_image = RgbaImage::new(width, height);
    let mut color_image = RgbaImage::new(width, height);
    let mut overlay_image = match backdrop {
        Some(img) => img.clone(),
        None => RgbaImage::new(width, height),
    };

    let mut bounds = BoundsTracker::new(width, height);

    for x in 0..width {
        for y in 0..height {
            let pixel = *frame.get_pixel(x, y);
            if mask.is_body(x, y) {
                bounds.include(x, y);
                body_image.put_pixel(x, y, pixel);
                color_image.put_pixel(x, y, pixel);
                overlay_image.put_pixel(x, y, pixel);
            } else {
                background.absorb_pixel(x, y, pixel);
            }
        }
    }

    Classified {
        body_image,
        color_image,
        overlay_image,
        detection: bounds.finish(),
    }
}
