//! CPU glyph rasterization, the two-level line cache, and frame composition.
//!
//! The renderer's contract: given a terminal snapshot, produce a `Frame`
//! whose pixels match what the grid describes under the current theme,
//! cursor, selection and search, using a cache whose hit path avoids any
//! glyph shaping and whose partial-hit path avoids re-running font
//! selection. Output is a CPU-resident RGBA image; nothing here touches a
//! GPU surface — the host's own renderer uploads `Frame`/`FinalImage`
//! pixels however it sees fit.

mod atlas;
pub mod compositor;
mod font;
pub mod line_cache;
pub mod overlay;

use cosmic_text::{FontSystem, SwashCache};

use crestterm_core::grid::CursorShape;
use crestterm_core::snapshot::{Frame, FrameDamage, TerminalState};
use crestterm_core::theme::Theme;
use crestterm_core::{Color, Size};

use atlas::GlyphAtlas;
use line_cache::{text_hash, state_hash, CacheLookup, GlyphPlacement, LineCache, LineImage, ShapedLine};

pub struct Renderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    atlas: GlyphAtlas,
    line_cache: LineCache,
    base_font_size: f32,
    scale_factor: f32,
    cached_cell_size: Size,
    atlas_reset_count: u64,
}

impl Renderer {
    pub fn new(base_font_size: f32, scale_factor: f32) -> Self {
        let mut renderer = Self {
            font_system: FontSystem::new(),
            swash_cache: SwashCache::new(),
            atlas: GlyphAtlas::new(),
            line_cache: LineCache::new(),
            base_font_size,
            scale_factor,
            cached_cell_size: Size::new(0.0, 0.0),
            atlas_reset_count: 0,
        };
        renderer.cached_cell_size = renderer.compute_cell_size();
        renderer.warmup_ascii();
        renderer
    }

    pub fn cell_size(&self) -> Size {
        self.cached_cell_size
    }

    pub fn atlas_reset_count(&self) -> u64 {
        self.atlas_reset_count
    }

    /// DPI/scale change invalidates the whole line cache (§4.4.1) — glyph
    /// geometry in device pixels depends on it.
    pub fn set_scale_factor(&mut self, scale_factor: f32) {
        if (scale_factor - self.scale_factor).abs() < f32::EPSILON {
            return;
        }
        self.scale_factor = scale_factor;
        self.cached_cell_size = self.compute_cell_size();
        self.atlas.reset();
        self.line_cache.invalidate_all();
        self.warmup_ascii();
    }

    /// Theme/palette change invalidates the whole cache: cell colours are
    /// baked into the composed line images.
    pub fn invalidate_theme(&mut self) {
        self.line_cache.invalidate_all();
    }

    /// Column-count change invalidates the cache: resize changes the
    /// geometry every line is shaped against.
    pub fn invalidate_resize(&mut self) {
        self.line_cache.invalidate_all();
    }

    /// Render one terminal's visible viewport into a `Frame` sized to
    /// `target`, at `scale`. The renderer needs no knowledge of other
    /// terminals (§4.4.5).
    pub fn render(&mut self, state: &TerminalState, theme: &Theme, scale: f32) -> Frame {
        if (scale - self.scale_factor).abs() > f32::EPSILON {
            self.set_scale_factor(scale);
        }

        let grid = &state.grid;
        let cell_w = self.cached_cell_size.width * scale;
        let cell_h = self.cached_cell_size.height * scale;
        let cols = grid.cols;
        let rows = grid.rows;

        let width = (cell_w * cols as f32).round().max(1.0) as u32;
        let height = (cell_h * rows as f32).round().max(1.0) as u32;

        let mut pixels = vec![0u8; (width as usize) * (height as usize) * 4];
        let mut damaged_rows = Vec::new();

        let cursor_abs_row = state.cursor.row as i64 - state.display_offset as i64;
        let cursor_shape = if state.cursor.visible { state.cursor.shape } else { CursorShape::Hidden };

        for i in 0..rows {
            let absolute = i as i64 - state.display_offset as i64;
            let Some(row) = grid.row(absolute) else { continue };

            let t_hash = text_hash(row, self.line_cache.font_config_id);
            let s_hash = state_hash(
                absolute,
                cursor_abs_row,
                state.cursor.col as usize,
                cursor_shape as u8,
                state.cursor.visible,
                state.selection.as_ref(),
                cols,
                state.search.as_deref(),
            );

            let lookup = self.line_cache.lookup(t_hash, s_hash);
            let image = match lookup {
                CacheLookup::Image(img) => img,
                CacheLookup::Layout(layout) => {
                    let img = self.compose_line(&layout, absolute, cell_w, cell_h, theme, state, cursor_abs_row, cursor_shape);
                    self.line_cache.insert_image(t_hash, s_hash, img.clone());
                    img
                }
                CacheLookup::Miss => {
                    let layout = shape_line_impl(row);
                    let img = self.compose_line(&layout, absolute, cell_w, cell_h, theme, state, cursor_abs_row, cursor_shape);
                    self.line_cache.insert_layout(t_hash, layout);
                    self.line_cache.insert_image(t_hash, s_hash, img.clone());
                    img
                }
            };

            blit_row(&mut pixels, width, i as u32, cell_h, &image);
            damaged_rows.push(absolute);
        }

        Frame {
            width,
            height,
            scale,
            pixels: std::sync::Arc::new(pixels),
            damage: if damaged_rows.len() as usize == rows { FrameDamage::Full } else { FrameDamage::Partial(damaged_rows) },
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn compose_line(
        &mut self,
        layout: &ShapedLine,
        absolute_row: i64,
        cell_w: f32,
        cell_h: f32,
        theme: &Theme,
        state: &TerminalState,
        cursor_abs_row: i64,
        cursor_shape: CursorShape,
    ) -> LineImage {
        let width = (cell_w * layout.cols as f32).round().max(1.0) as u32;
        let height = cell_h.round().max(1.0) as u32;
        let mut image = LineImage::blank(width, height);

        for glyph in &layout.glyphs {
            let cell = &glyph.cell;
            let (fg, bg) = if cell.flags.contains(crestterm_core::cell::CellFlags::REVERSE) {
                (cell.bg, cell.fg)
            } else {
                (cell.fg, cell.bg)
            };

            let x0 = glyph.col as f32 * cell_w;
            paint_rect(&mut image, x0, 0.0, cell_w, cell_h as f32, bg);

            if cell.flags.contains(crestterm_core::cell::CellFlags::HIDDEN) {
                continue;
            }
            if cell.text.base != ' ' {
                let bold = cell.flags.contains(crestterm_core::cell::CellFlags::BOLD);
                let italic = cell.flags.contains(crestterm_core::cell::CellFlags::ITALIC);
                let region = self.ensure_glyph_cached(cell.text.base, bold, italic);
                if !region.is_empty() {
                    blit_glyph(&mut image, &self.atlas, &region, x0, cell_h, fg);
                }
            }
            if cell.flags.contains(crestterm_core::cell::CellFlags::UNDERLINE) {
                let thickness = (cell_h * 0.08).max(1.0);
                paint_rect(&mut image, x0, cell_h - thickness, cell_w, thickness, fg);
            }
            if cell.flags.contains(crestterm_core::cell::CellFlags::STRIKETHROUGH) {
                let thickness = (cell_h * 0.08).max(1.0);
                paint_rect(&mut image, x0, cell_h * 0.5, cell_w, thickness, fg);
            }
        }

        if let Some(selection) = &state.selection {
            if selection.intersects_row(absolute_row) {
                let (start, end) = selection.ordered();
                let from = if start.row == absolute_row { start.col } else { 0 };
                let to = if end.row == absolute_row { end.col } else { layout.cols.saturating_sub(1) };
                overlay::draw_selection(&mut image, cell_w, from, to, theme.selection);
            }
        }

        if let Some(search) = &state.search {
            for (idx, m) in search.matches.iter().enumerate() {
                if m.start.row <= absolute_row && absolute_row <= m.end.row {
                    let from = if m.start.row == absolute_row { m.start.col } else { 0 };
                    // `m.end.col` is exclusive (one past the match's last
                    // character); `draw_search_match`'s `col_to` is inclusive.
                    let to = if m.end.row == absolute_row {
                        m.end.col.saturating_sub(1)
                    } else {
                        layout.cols.saturating_sub(1)
                    };
                    let color = if search.focused == Some(idx) { theme.search_focused } else { theme.search_match };
                    overlay::draw_search_match(&mut image, cell_w, from, to, color);
                }
            }
        }

        if absolute_row == cursor_abs_row && !matches!(cursor_shape, CursorShape::Hidden) {
            let col = state.cursor.col as usize;
            let wide = layout.glyphs.iter().find(|g| g.col == col).map(|g| g.cell.is_wide_leading()).unwrap_or(false);
            overlay::draw_cursor(&mut image, cell_w, cell_h, col, wide, cursor_shape, theme.cursor);
        }

        image
    }
}

// A free function (not a method) so the line-cache module can be unit
// tested against it without a `Renderer`. For a monospace grid, "shaping"
// reduces to a direct per-cell placement pass; the expensive half of
// shaping (font selection, glyph rasterization) happens lazily per glyph
// via `ensure_glyph_cached`, shared across every line through the atlas.
fn shape_line_impl(row: &crestterm_core::grid::GridRow) -> ShapedLine {
    let cells = row.cells();
    let mut glyphs = Vec::with_capacity(cells.len());
    for (col, cell) in cells.iter().enumerate() {
        if cell.is_wide_trailing() {
            continue;
        }
        glyphs.push(GlyphPlacement { col, cell: *cell });
    }
    ShapedLine { cols: cells.len(), glyphs }
}

fn paint_rect(image: &mut LineImage, x: f32, y: f32, w: f32, h: f32, color: Color) {
    let x0 = x.max(0.0) as u32;
    let x1 = ((x + w).min(image.width as f32)) as u32;
    let y0 = y.max(0.0) as u32;
    let y1 = ((y + h).min(image.height as f32)) as u32;
    let a = color.a;
    let [r, g, b] = [color.r * a, color.g * a, color.b * a];
    for py in y0..y1 {
        for px in x0..x1 {
            let idx = ((py * image.width + px) * 4) as usize;
            image.pixels[idx] = (r * 255.0) as u8;
            image.pixels[idx + 1] = (g * 255.0) as u8;
            image.pixels[idx + 2] = (b * 255.0) as u8;
            image.pixels[idx + 3] = (a * 255.0) as u8;
        }
    }
}

fn blit_glyph(image: &mut LineImage, atlas: &GlyphAtlas, region: &atlas::AtlasRegion, cell_x: f32, cell_h: f32, color: Color) {
    let baseline = cell_h * 0.8;
    let gx = (cell_x + region.left).round() as i64;
    let gy = (baseline - region.top).round() as i64;

    for row in 0..region.height {
        let py = gy + row as i64;
        if py < 0 || py >= image.height as i64 {
            continue;
        }
        for col in 0..region.width {
            let px = gx + col as i64;
            if px < 0 || px >= image.width as i64 {
                continue;
            }
            let a = (atlas.alpha_at(region.x + col, region.y + row) as f32 / 255.0) * color.a;
            if a <= 0.0 {
                continue;
            }
            let idx = ((py as u32 * image.width + px as u32) * 4) as usize;
            let src = [color.r * a, color.g * a, color.b * a, a];
            let inv = 1.0 - a;
            for c in 0..4 {
                let dst = image.pixels[idx + c] as f32 / 255.0;
                image.pixels[idx + c] = ((src[c] + dst * inv) * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

fn blit_row(pixels: &mut [u8], frame_width: u32, row: u32, cell_h: f32, image: &LineImage) {
    let row_h = cell_h.round().max(1.0) as u32;
    let dst_y0 = row * row_h;
    for y in 0..image.height.min(row_h) {
        let dst_row_start = ((dst_y0 + y) * frame_width * 4) as usize;
        let src_row_start = (y * image.width * 4) as usize;
        let len = (image.width as usize * 4).min(pixels.len().saturating_sub(dst_row_start));
        if src_row_start + len <= image.pixels.len() {
            pixels[dst_row_start..dst_row_start + len].copy_from_slice(&image.pixels[src_row_start..src_row_start + len]);
        }
    }
}
