/// Axis-aligned bounding box over body-labeled pixels, inclusive pixel
/// coordinates. Only ever constructed with `min <= max` — "no detection" is
/// represented by [`Detection::NotDetected`], never by a degenerate box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

/// Outcome of the bounding-box pass for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Detected(BoundingBox),
    NotDetected,
}

/// A bounding box scaled about its own center. Coordinates are fractional
/// and may lie outside the frame; callers draw an outline, never index
/// pixel memory with these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaddedBox {
    pub min_x: f32,
    pub min_y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y
    }

    /// Expand the box by `scale` about its center, to tolerate false
    /// negatives at the body's edges. The result is not clamped to the
    /// frame bounds.
    pub fn pad(&self, scale: f32) -> PaddedBox {
        let width = self.width() as f32;
        let height = self.height() as f32;

        let new_width = width * scale;
        let new_height = height * scale;

        let offset_x = (new_width - width) / 2.0;
        let offset_y = (new_height - height) / 2.0;

        PaddedBox {
            min_x: self.min_x as f32 - offset_x,
            min_y: self.min_y as f32 - offset_y,
            width: new_width,
            height: new_height,
        }
    }
}

impl Detection {
    pub fn is_detected(&self) -> bool {
        matches!(self, Detection::Detected(_))
    }
}

/// Accumulates the running min/max while the classifier walks the frame.
/// Seeded to an inverted range so the first body pixel snaps all four
/// bounds to itself.
#[derive(Debug)]
pub(crate) struct BoundsTracker {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    found: bool,
}

impl BoundsTracker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            min_x: width.saturating_sub(1),
            min_y: height.saturating_sub(1),
            max_x: 0,
            max_y: 0,
            found: false,
        }
    }

    pub fn include(&mut self, x: u32, y: u32) {
        self.found = true;
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    pub fn finish(self) -> Detection {
        if self.found {
            Detection::Detected(BoundingBox {
                min_x: self.min_x,
                min_y: self.min_y,
                max_x: self.max_x,
                max_y: self.max_y,
            })
        } else {
            Detection::NotDetected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_scales_about_center() {
        let bbox = BoundingBox {
            min_x: 10,
            max_x: 20,
            min_y: 10,
            max_y: 30,
        };
        let padded = bbox.pad(1.3);

        // width=10, height=20 -> 13 x 26, offsets 1.5 and 3
        assert!((padded.width - 13.0).abs() < 1e-5);
        assert!((padded.height - 26.0).abs() < 1e-5);
        assert!((padded.min_x - 8.5).abs() < 1e-5);
        assert!((padded.min_y - 7.0).abs() < 1e-5);
    }

    #[test]
    fn pad_may_extend_outside_frame() {
        let bbox = BoundingBox {
            min_x: 0,
            max_x: 100,
            min_y: 0,
            max_y: 100,
        };
        let padded = bbox.pad(1.3);
        assert!(padded.min_x < 0.0);
        assert!(padded.min_y < 0.0);
    }

    #[test]
    fn pad_identity_at_scale_one() {
        let bbox = BoundingBox {
            min_x: 5,
            max_x: 15,
            min_y: 7,
            max_y: 9,
        };
        let padded = bbox.pad(1.0);
        assert_eq!(padded.min_x, 5.0);
        assert_eq!(padded.min_y, 7.0);
        assert_eq!(padded.width, 10.0);
        assert_eq!(padded.height, 2.0);
    }

    #[test]
    fn tracker_without_hits_reports_not_detected() {
        let tracker = BoundsTracker::new(64, 48);
        assert_eq!(tracker.finish(), Detection::NotDetected);
    }

    #[test]
    fn tracker_single_pixel_box() {
        let mut tracker = BoundsTracker::new(64, 48);
        tracker.include(12, 34);
        assert_eq!(
            tracker.finish(),
            Detection::Detected(BoundingBox {
                min_x: 12,
                min_y: 34,
                max_x: 12,
                max_y: 34,
            })
        );
    }

    #[test]
    fn tracker_covers_all_included_pixels() {
        let mut tracker = BoundsTracker::new(64, 48);
        tracker.include(30, 5);
        tracker.include(10, 20);
        tracker.include(25, 2);
        assert_eq!(
            tracker.finish(),
            Detection::Detected(BoundingBox {
                min_x: 10,
                min_y: 2,
                max_x: 30,
                max_y: 20,
            })
        );
    }
}
