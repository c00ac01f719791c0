mod draw;

use crate::pipeline::{CycleResult, PaddedBox};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

const BOX_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const GHOST_LABEL_COLOR: Rgba<u8> = Rgba([0, 0, 255, 255]);
const COLOR_LABEL_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const LABEL_SCALE: i32 = 3;

/// The three composed output views for one cycle.
pub struct Views {
    /// Accumulated background with the person removed, plus the optional
    /// padded-box outline and cursor readout.
    pub ghost: RgbaImage,
    /// Body-only pixels, plus the cursor readout.
    pub color: RgbaImage,
    /// Body cutout over the alternate backdrop.
    pub backdrop: RgbaImage,
}

/// Composes the pipeline's outputs into displayable views. Presentation
/// only; consumes the core's results and draws vector overlays on top.
pub struct Compositor {
    show_box: bool,
}

impl Compositor {
    pub fn new(show_box: bool) -> Self {
        Self { show_box }
    }

    /// Build all three views for a completed cycle. `cursor` is the live
    /// pointer coordinate relative to the output surfaces; when it falls
    /// outside the mask no readout is drawn.
    pub fn compose(
        &self,
        background: &RgbaImage,
        result: &CycleResult,
        cursor: Option<(i32, i32)>,
    ) -> Views {
        let _span = tracing::debug_span!("compose").entered();

        let mut ghost = background.clone();
        if self.show_box {
            if let Some(padded) = result.padded_box {
                draw_padded_box(&mut ghost, &padded);
            }
            draw_cursor_label(&mut ghost, result, cursor, GHOST_LABEL_COLOR);
        }

        let mut color = result.color_image.clone();
        draw_cursor_label(&mut color, result, cursor, COLOR_LABEL_COLOR);

        Views {
            ghost,
            color,
            backdrop: result.overlay_image.clone(),
        }
    }
}

/// Outline the padded box. The geometry is intentionally unclamped; pixel
/// writes outside the buffer are simply clipped by the drawing routine, so
/// a box hanging over the frame edge renders as a partial outline.
fn draw_padded_box(image: &mut RgbaImage, padded: &PaddedBox) {
    let rect = Rect::at(padded.min_x.round() as i32, padded.min_y.round() as i32).of_size(
        (padded.width.round() as u32).max(1),
        (padded.height.round() as u32).max(1),
    );
    draw_hollow_rect_mut(image, rect, BOX_COLOR);
}

fn draw_cursor_label(
    image: &mut RgbaImage,
    result: &CycleResult,
    cursor: Option<(i32, i32)>,
    color: Rgba<u8>,
) {
    let Some((x, y)) = cursor else {
        return;
    };
    // No value under the cursor means no label at all.
    if let Some(label) = result.mask.label_at_cursor(x, y) {
        draw::draw_number(image, x, y, label, LABEL_SCALE, color);
    }
}
