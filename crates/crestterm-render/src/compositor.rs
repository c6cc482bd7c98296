// Compositor (§4.5): combines per-terminal Frames into one surface image.
// Back-to-front, premultiplied alpha, nearest-neighbour scaling when a
// Frame's scale differs from the surface's. No interpretation of terminal
// contents occurs here.

use crestterm_core::snapshot::Frame;
use crestterm_core::Rect;

/// The compositor's output: a flat RGBA8 image sized to the host surface.
pub struct FinalImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl FinalImage {
    pub fn blank(width: u32, height: u32) -> Self {
        Self { width, height, pixels: vec![0u8; (width as usize) * (height as usize) * 4] }
    }
}

/// An optional emphasis drawn at one frame's border (e.g. the focused
/// terminal's "glow"), independent of frame content.
pub struct Glow {
    pub rect: Rect,
    pub color: [f32; 4],
    pub thickness: f32,
}

pub struct Compositor;

impl Compositor {
    /// `layers` are drawn back-to-front: the first entry is drawn first
    /// (bottom), the last entry is drawn last (top).
    pub fn compose(
        layers: &[(Rect, &Frame)],
        surface_width: u32,
        surface_height: u32,
        surface_scale: f32,
        glow: Option<&Glow>,
    ) -> FinalImage {
        let mut out = FinalImage::blank(surface_width, surface_height);

        for (rect, frame) in layers {
            blit_frame(&mut out, rect, frame, surface_scale);
        }

        if let Some(g) = glow {
            draw_glow_border(&mut out, g);
        }

        out
    }
}

fn blit_frame(out: &mut FinalImage, rect: &Rect, frame: &Frame, surface_scale: f32) {
    let dst_x0 = (rect.x * surface_scale).round() as i64;
    let dst_y0 = (rect.y * surface_scale).round() as i64;
    let dst_w = ((rect.width * surface_scale).round() as i64).max(1);
    let dst_h = ((rect.height * surface_scale).round() as i64).max(1);

    let needs_scale = (frame.scale - surface_scale).abs() > f32::EPSILON
        || frame.width as i64 != dst_w
        || frame.height as i64 != dst_h;

    for dy in 0..dst_h {
        let py = dst_y0 + dy;
        if py < 0 || py >= out.height as i64 {
            continue;
        }
        for dx in 0..dst_w {
            let px = dst_x0 + dx;
            if px < 0 || px >= out.width as i64 {
                continue;
            }

            let (sx, sy) = if needs_scale {
                // Nearest-neighbour source sample, chosen for sharpness on
                // pixel-aligned grids rather than smoothing the terminal's
                // monospace cell edges.
                let sx = (dx as f32 / dst_w as f32 * frame.width as f32) as u32;
                let sy = (dy as f32 / dst_h as f32 * frame.height as f32) as u32;
                (sx.min(frame.width.saturating_sub(1)), sy.min(frame.height.saturating_sub(1)))
            } else {
                (dx as u32, dy as u32)
            };

            let src_idx = ((sy * frame.width + sx) * 4) as usize;
            if src_idx + 3 >= frame.pixels.len() {
                continue;
            }
            let src = &frame.pixels[src_idx..src_idx + 4];
            let dst_idx = ((py as u32 * out.width + px as u32) * 4) as usize;

            // Both source and destination are premultiplied; standard
            // "over" compositing needs no extra division.
            let src_a = src[3] as u32;
            let inv_a = 255 - src_a;
            for c in 0..4 {
                let s = src[c] as u32;
                let d = out.pixels[dst_idx + c] as u32;
                out.pixels[dst_idx + c] = (s + (d * inv_a) / 255).min(255) as u8;
            }
        }
    }
}

fn draw_glow_border(out: &mut FinalImage, glow: &Glow) {
    let x0 = glow.rect.x.max(0.0) as u32;
    let y0 = glow.rect.y.max(0.0) as u32;
    let x1 = ((glow.rect.x + glow.rect.width) as u32).min(out.width);
    let y1 = ((glow.rect.y + glow.rect.height) as u32).min(out.height);
    let t = glow.thickness.max(1.0) as u32;

    let color = [
        (glow.color[0] * 255.0) as u8,
        (glow.color[1] * 255.0) as u8,
        (glow.color[2] * 255.0) as u8,
        (glow.color[3] * 255.0) as u8,
    ];

    let mut stroke = |x: u32, y: u32| {
        if x < out.width && y < out.height {
            let idx = ((y * out.width + x) * 4) as usize;
            out.pixels[idx..idx + 4].copy_from_slice(&color);
        }
    };

    for x in x0..x1 {
        for dy in 0..t {
            stroke(x, y0 + dy);
            if y1 > dy {
                stroke(x, y1 - 1 - dy);
            }
        }
    }
    for y in y0..y1 {
        for dx in 0..t {
            stroke(x0 + dx, y);
            if x1 > dx {
                stroke(x1 - 1 - dx, y);
            }
        }
    }
}
