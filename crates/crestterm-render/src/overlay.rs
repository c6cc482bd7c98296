// Overlay drawing: cursor, selection and search-match highlights composited
// on top of a line's base content image. None of this enters `text_hash` —
// overlays change far more often than content but are cheap to draw.

use crestterm_core::grid::CursorShape;
use crestterm_core::Color;

use crate::line_cache::LineImage;

fn blend_px(image: &mut LineImage, x: u32, y: u32, color: Color) {
    if x >= image.width || y >= image.height {
        return;
    }
    let idx = ((y * image.width + x) * 4) as usize;
    let a = color.a;
    let inv = 1.0 - a;
    let src = [color.r * a, color.g * a, color.b * a, a];
    for c in 0..4 {
        let dst = image.pixels[idx + c] as f32 / 255.0;
        let out = src[c] + dst * inv;
        image.pixels[idx + c] = (out * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}

fn fill_rect(image: &mut LineImage, x0: f32, y0: f32, x1: f32, y1: f32, color: Color) {
    let x0 = x0.max(0.0) as u32;
    let x1 = (x1.min(image.width as f32)) as u32;
    let y0 = y0.max(0.0) as u32;
    let y1 = (y1.min(image.height as f32)) as u32;
    for y in y0..y1 {
        for x in x0..x1 {
            blend_px(image, x, y, color);
        }
    }
}

/// Translucent rectangle over a selected column span on this row.
pub fn draw_selection(image: &mut LineImage, cell_width: f32, col_from: usize, col_to: usize, color: Color) {
    let x0 = col_from as f32 * cell_width;
    let x1 = (col_to as f32 + 1.0) * cell_width;
    fill_rect(image, x0, 0.0, x1, image.height as f32, color);
}

/// Translucent highlight for a search match span; the focused match uses a
/// distinct (typically more opaque) colour chosen by the caller.
pub fn draw_search_match(image: &mut LineImage, cell_width: f32, col_from: usize, col_to: usize, color: Color) {
    let x0 = col_from as f32 * cell_width;
    let x1 = (col_to as f32 + 1.0) * cell_width;
    fill_rect(image, x0, 0.0, x1, image.height as f32, color);
}

/// Block/underline/beam cursor at one cell. Block swaps fg/bg at the
/// covered cell(s) by drawing solid; underline/beam draw a thin bar.
pub fn draw_cursor(image: &mut LineImage, cell_width: f32, cell_height: f32, col: usize, wide: bool, shape: CursorShape, color: Color) {
    let x0 = col as f32 * cell_width;
    let span = if wide { 2.0 } else { 1.0 };
    match shape {
        CursorShape::Hidden => {}
        CursorShape::Block => {
            fill_rect(image, x0, 0.0, x0 + cell_width * span, cell_height, color);
        }
        CursorShape::Underline => {
            let thickness = (cell_height * 0.12).max(1.0);
            fill_rect(image, x0, cell_height - thickness, x0 + cell_width * span, cell_height, color);
        }
        CursorShape::Beam => {
            let thickness = (cell_width * 0.12).max(1.0);
            fill_rect(image, x0, 0.0, x0 + thickness, cell_height, color);
        }
    }
}

/// Underline emphasis on a hovered OSC 8 hyperlink span (optional, §4.4.2).
pub fn draw_hyperlink_hover(image: &mut LineImage, cell_width: f32, col_from: usize, col_to: usize, cell_height: f32, color: Color) {
    let x0 = col_from as f32 * cell_width;
    let x1 = (col_to as f32 + 1.0) * cell_width;
    let thickness = (cell_height * 0.08).max(1.0);
    fill_rect(image, x0, cell_height - thickness, x1, cell_height, color);
}
