use cosmic_text::{Attrs, Buffer as CosmicBuffer, Family, Metrics, Shaping};

use crate::atlas::{AtlasRegion, GlyphCacheKey};
use crate::Renderer;
use crestterm_core::Size;

impl Renderer {
    pub(crate) fn compute_cell_size(&mut self) -> Size {
        let font_size = self.base_font_size * self.scale_factor;
        let line_height = (font_size * 1.2).ceil();
        let metrics = Metrics::new(font_size, line_height);

        let mut buffer = CosmicBuffer::new(&mut self.font_system, metrics);
        buffer.set_text(
            &mut self.font_system,
            "M",
            Attrs::new().family(Family::Monospace),
            Shaping::Advanced,
        );
        buffer.shape_until_scroll(&mut self.font_system, false);

        let cell_width = buffer
            .layout_runs()
            .next()
            .and_then(|run| run.glyphs.first())
            .map(|g| g.w)
            .unwrap_or(font_size * 0.6);

        Size::new(cell_width / self.scale_factor, line_height / self.scale_factor)
    }

    /// Pre-warm the glyph atlas with printable ASCII to avoid first-frame
    /// rasterization stalls.
    pub fn warmup_ascii(&mut self) {
        for ch in '!'..='~' {
            self.ensure_glyph_cached(ch, false, false);
            self.ensure_glyph_cached(ch, true, false);
        }
    }

    /// Pre-warm Korean Jamo (consonants + vowels) for the same reason.
    pub fn warmup_common_unicode(&mut self) {
        for ch in '\u{3131}'..='\u{3163}' {
            self.ensure_glyph_cached(ch, false, false);
            self.ensure_glyph_cached(ch, true, false);
        }
    }

    pub(crate) fn ensure_glyph_cached(&mut self, character: char, bold: bool, italic: bool) -> AtlasRegion {
        let key = GlyphCacheKey { character, bold, italic };

        if let Some(region) = self.atlas.cache.get(&key) {
            return *region;
        }

        let region = self.try_rasterize_glyph(character, bold, italic);
        self.atlas.cache.insert(key, region);
        region
    }

    fn try_rasterize_glyph(&mut self, character: char, bold: bool, italic: bool) -> AtlasRegion {
        let font_size = self.base_font_size * self.scale_factor;
        let line_height = (font_size * 1.2).ceil();
        let metrics = Metrics::new(font_size, line_height);

        let mut attrs = Attrs::new().family(Family::Monospace);
        if bold {
            attrs = attrs.weight(cosmic_text::Weight::BOLD);
        }
        if italic {
            attrs = attrs.style(cosmic_text::Style::Italic);
        }

        let mut buffer = CosmicBuffer::new(&mut self.font_system, metrics);
        let text = character.to_string();
        buffer.set_text(&mut self.font_system, &text, attrs, Shaping::Advanced);
        buffer.shape_until_scroll(&mut self.font_system, false);

        let empty = AtlasRegion::from_empty();

        let run = match buffer.layout_runs().next() {
            Some(r) => r,
            None => return empty,
        };
        let glyph = match run.glyphs.first() {
            Some(g) => g,
            None => return empty,
        };

        let physical = glyph.physical((0.0, 0.0), 1.0);
        let image = match self.swash_cache.get_image(&mut self.font_system, physical.cache_key) {
            Some(img) => img,
            None => return empty,
        };

        let width = image.placement.width;
        let height = image.placement.height;
        if width == 0 || height == 0 {
            return empty;
        }

        let left = image.placement.left as f32;
        let top = image.placement.top as f32;

        let alpha_data: Vec<u8> = match image.content {
            cosmic_text::SwashContent::Mask => image.data.clone(),
            cosmic_text::SwashContent::Color => {
                image.data.chunks(4).map(|c| c.get(3).copied().unwrap_or(255)).collect()
            }
            cosmic_text::SwashContent::SubpixelMask => image
                .data
                .chunks(3)
                .map(|c| {
                    let r = c.first().copied().unwrap_or(0) as u16;
                    let g = c.get(1).copied().unwrap_or(0) as u16;
                    let b = c.get(2).copied().unwrap_or(0) as u16;
                    ((r + g + b) / 3) as u8
                })
                .collect(),
        };

        let cache_len_before = self.atlas.cache.len();
        let region = self.atlas.upload_glyph(width, height, left, top, &alpha_data);
        if self.atlas.cache.is_empty() && cache_len_before > 0 {
            self.atlas_reset_count += 1;
            self.line_cache.invalidate_all();
        }
        region
    }

    /// Current base font size, in logical points.
    pub fn font_size(&self) -> f32 {
        self.base_font_size
    }

    /// Change the base font size at runtime, clamped to 8.0..=32.0 pt.
    /// Recomputes cell size, resets the glyph atlas, and invalidates the
    /// entire line cache (font change is a cache-wide invalidation trigger).
    pub fn set_font_size(&mut self, size: f32) {
        let size = size.clamp(8.0, 32.0);
        if (size - self.base_font_size).abs() < 0.01 {
            return;
        }
        self.base_font_size = size;
        self.cached_cell_size = self.compute_cell_size();
        self.atlas.reset();
        self.swash_cache = cosmic_text::SwashCache::new();
        self.line_cache.invalidate_all();
        self.warmup_ascii();
        self.warmup_common_unicode();
        self.atlas_reset_count += 1;
    }
}

impl AtlasRegion {
    fn from_empty() -> Self {
        AtlasRegion { x: 0, y: 0, width: 0, height: 0, left: 0.0, top: 0.0 }
    }
}
