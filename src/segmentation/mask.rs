/// Per-pixel label grid produced by a segmentation model.
///
/// Label 0 means background; any nonzero value is a body-part id. The grid
/// must be pixel-aligned 1:1 with the frame it was computed from — the
/// pipeline rejects a cycle whose mask dimensions disagree with the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    width: u32,
    height: u32,
    labels: Vec<u8>,
}

pub const BACKGROUND_LABEL: u8 = 0;

impl SegmentationMask {
    /// Build a mask from a flat row-major label array.
    ///
    /// Panics if `labels.len() != width * height`; masks are only built by
    /// segmenter adapters, which size the buffer themselves.
    pub fn new(width: u32, height: u32, labels: Vec<u8>) -> Self {
        assert_eq!(
            labels.len(),
            (width * height) as usize,
            "label array does not cover {}x{} pixels",
            width,
            height
        );
        Self {
            width,
            height,
            labels,
        }
    }

    /// All-background mask, used by the passthrough segmenter.
    pub fn empty(width: u32, height: u32) -> Self {
        Self::new(width, height, vec![BACKGROUND_LABEL; (width * height) as usize])
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Label at pixel coordinates. Callers stay in bounds; classification
    /// only runs after the dimension check.
    #[inline]
    pub fn label_at(&self, x: u32, y: u32) -> u8 {
        self.labels[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn is_body(&self, x: u32, y: u32) -> bool {
        self.label_at(x, y) != BACKGROUND_LABEL
    }

    /// Label under a cursor coordinate relative to a surface showing this
    /// mask's frame. Returns `None` when the flat index falls outside the
    /// label array; callers must not draw a readout in that case.
    pub fn label_at_cursor(&self, x: i32, y: i32) -> Option<u8> {
        let index = x as i64 + y as i64 * self.width as i64;
        if index >= 0 && (index as usize) < self.labels.len() {
            Some(self.labels[index as usize])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_lookup_in_range() {
        // 4x4 grid from the readout contract
        let labels = vec![0, 1, 0, 2, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let mask = SegmentationMask::new(4, 4, labels);

        // (2,1) -> index 2 + 1*4 = 6
        assert_eq!(mask.label_at_cursor(2, 1), Some(3));
        assert_eq!(mask.label_at_cursor(1, 0), Some(1));
    }

    #[test]
    fn label_lookup_out_of_range() {
        let mask = SegmentationMask::empty(4, 4);
        assert_eq!(mask.label_at_cursor(10, 10), None);
        assert_eq!(mask.label_at_cursor(0, -1), None);
    }

    #[test]
    fn negative_x_wraps_to_previous_row() {
        // Flat-index lookup: (-1, 2) is index 7, still a valid readout.
        // This mirrors how a surface-relative cursor behaves at the left
        // edge of the reference implementation.
        let mut labels = vec![0u8; 16];
        labels[7] = 9;
        let mask = SegmentationMask::new(4, 4, labels);
        assert_eq!(mask.label_at_cursor(-1, 2), Some(9));
    }

    #[test]
    fn empty_mask_is_all_background() {
        let mask = SegmentationMask::empty(3, 2);
        assert!(mask.labels().iter().all(|&l| l == BACKGROUND_LABEL));
        assert!(!mask.is_body(0, 0));
    }

    #[test]
    #[should_panic]
    fn short_label_array_is_rejected() {
        SegmentationMask::new(4, 4, vec![0; 8]);
    }
}
