// CPU-resident glyph atlas: shelf packing and cache for rasterized glyphs.
//
// Unlike a GPU texture, this atlas is a plain RGBA buffer the renderer owns
// and blits out of directly when composing a line image.

use std::collections::HashMap;

/// Where a glyph lives in the atlas, in pixel coordinates.
#[derive(Debug, Clone, Copy)]
pub struct AtlasRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Offset from the pen position to the glyph's top-left corner.
    pub left: f32,
    pub top: f32,
}

impl AtlasRegion {
    fn empty(left: f32, top: f32) -> Self {
        Self { x: 0, y: 0, width: 0, height: 0, left, top }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphCacheKey {
    pub character: char,
    pub bold: bool,
    pub italic: bool,
}

pub const ATLAS_SIZE: u32 = 2048;

pub struct GlyphAtlas {
    /// RGBA8 pixels, row-major, `ATLAS_SIZE * ATLAS_SIZE * 4` bytes.
    pixels: Vec<u8>,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
    pub cache: HashMap<GlyphCacheKey, AtlasRegion>,
}

impl GlyphAtlas {
    pub fn new() -> Self {
        Self {
            pixels: vec![0u8; (ATLAS_SIZE as usize) * (ATLAS_SIZE as usize) * 4],
            cursor_x: 0,
            cursor_y: 0,
            row_height: 0,
            cache: HashMap::new(),
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Clear the atlas cache, allowing it to be repacked from scratch.
    pub fn reset(&mut self) {
        let count = self.cache.len();
        self.cursor_x = 0;
        self.cursor_y = 0;
        self.row_height = 0;
        self.cache.clear();
        self.pixels.iter_mut().for_each(|b| *b = 0);
        log::warn!("glyph atlas full: cleared {count} cached glyphs");
    }

    /// Upload a single-channel (alpha mask) glyph bitmap, tinted opaque white;
    /// callers composite it against the desired foreground colour when
    /// blitting out of the atlas.
    pub fn upload_glyph(&mut self, width: u32, height: u32, left: f32, top: f32, alpha: &[u8]) -> AtlasRegion {
        if width == 0 || height == 0 {
            return AtlasRegion::empty(left, top);
        }

        if self.cursor_x + width > ATLAS_SIZE {
            self.cursor_x = 0;
            self.cursor_y += self.row_height + 1;
            self.row_height = 0;
        }

        if self.cursor_y + height > ATLAS_SIZE {
            self.reset();
            if self.cursor_x + width > ATLAS_SIZE {
                self.cursor_x = 0;
                self.cursor_y += self.row_height + 1;
                self.row_height = 0;
            }
            if self.cursor_y + height > ATLAS_SIZE {
                log::error!("single glyph exceeds atlas size");
                return AtlasRegion::empty(left, top);
            }
        }

        let x = self.cursor_x;
        let y = self.cursor_y;

        for row in 0..height {
            let src_row = &alpha[(row * width) as usize..((row + 1) * width) as usize];
            let dst_row_start = (((y + row) * ATLAS_SIZE + x) * 4) as usize;
            for col in 0..width as usize {
                let a = src_row[col];
                let dst = dst_row_start + col * 4;
                self.pixels[dst] = 255;
                self.pixels[dst + 1] = 255;
                self.pixels[dst + 2] = 255;
                self.pixels[dst + 3] = a;
            }
        }

        self.cursor_x += width + 1;
        if height > self.row_height {
            self.row_height = height;
        }

        AtlasRegion { x, y, width, height, left, top }
    }

    /// Sample the alpha channel at an atlas-local pixel coordinate.
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        let idx = ((y * ATLAS_SIZE + x) * 4 + 3) as usize;
        self.pixels[idx]
    }
}

impl Default for GlyphAtlas {
    fn default() -> Self {
        Self::new()
    }
}
