use crate::Color;

/// Host-supplied colour configuration (§3a, §6): 16 named ANSI colours plus
/// the fixed roles the renderer needs. Unlike the codebase this engine is
/// adapted from, there is no hardcoded dark/light palette pair baked into
/// the engine — the host is the source of truth for every colour.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Indices 0-7 normal, 8-15 bright, matching ANSI numbering.
    pub ansi: [Color; 16],
    pub default_fg: Color,
    pub default_bg: Color,
    pub selection: Color,
    pub search_match: Color,
    pub search_focused: Color,
    pub cursor: Color,
}

impl Theme {
    /// Resolves a named ANSI colour index (0-15) against the theme, a
    /// 256-colour index (16-255) against the cube/grayscale formula, per
    /// §4.4.4.
    pub fn resolve_indexed(&self, idx: u8) -> Color {
        match idx {
            0..=15 => self.ansi[idx as usize],
            16..=231 => indexed_color_cube(idx),
            232..=255 => indexed_color_grayscale(idx),
        }
    }
}

impl Default for Theme {
    /// A plain, legible default (not meant to be shipped to end-users —
    /// hosts are expected to supply their own theme at `app_create`).
    fn default() -> Self {
        let ansi = [
            Color::rgb(0.00, 0.00, 0.00), // black
            Color::rgb(0.80, 0.00, 0.00), // red
            Color::rgb(0.00, 0.80, 0.00), // green
            Color::rgb(0.80, 0.80, 0.00), // yellow
            Color::rgb(0.00, 0.00, 0.80), // blue
            Color::rgb(0.80, 0.00, 0.80), // magenta
            Color::rgb(0.00, 0.80, 0.80), // cyan
            Color::rgb(0.80, 0.80, 0.80), // white
            Color::rgb(0.40, 0.40, 0.40), // bright black
            Color::rgb(1.00, 0.40, 0.40), // bright red
            Color::rgb(0.40, 1.00, 0.40), // bright green
            Color::rgb(1.00, 1.00, 0.40), // bright yellow
            Color::rgb(0.40, 0.40, 1.00), // bright blue
            Color::rgb(1.00, 0.40, 1.00), // bright magenta
            Color::rgb(0.40, 1.00, 1.00), // bright cyan
            Color::rgb(1.00, 1.00, 1.00), // bright white
        ];
        Self {
            ansi,
            default_fg: Color::rgb(0.90, 0.90, 0.90),
            default_bg: Color::rgb(0.05, 0.05, 0.05),
            selection: Color::new(0.30, 0.50, 0.90, 0.35),
            search_match: Color::new(0.90, 0.80, 0.10, 0.35),
            search_focused: Color::new(0.95, 0.55, 0.10, 0.55),
            cursor: Color::rgb(0.90, 0.90, 0.90),
        }
    }
}

/// The xterm 256-colour cube (indices 16-231): each of r/g/b is one of six
/// steps; step `n` resolves to `0` at `n == 0` and `55 + 40*n` otherwise.
pub fn indexed_color_cube(idx: u8) -> Color {
    debug_assert!((16..=231).contains(&idx));
    let i = idx - 16;
    let r = i / 36;
    let g = (i % 36) / 6;
    let b = i % 6;
    fn step(n: u8) -> f32 {
        if n == 0 { 0.0 } else { (55 + 40 * n) as f32 / 255.0 }
    }
    Color::rgb(step(r), step(g), step(b))
}

/// The xterm grayscale ramp (indices 232-255): 24 steps, `8 + 10*n`.
pub fn indexed_color_grayscale(idx: u8) -> Color {
    debug_assert!((232..=255).contains(&idx));
    let n = idx - 232;
    let v = (8 + 10 * n as u32) as f32 / 255.0;
    Color::rgb(v, v, v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_endpoints_match_xterm() {
        // Index 16 is pure black (0,0,0 step).
        let black = indexed_color_cube(16);
        assert_eq!(black, Color::rgb(0.0, 0.0, 0.0));
        // Index 231 is the brightest step (5,5,5).
        let white = indexed_color_cube(231);
        let expected = (55 + 40 * 5) as f32 / 255.0;
        assert_eq!(white, Color::rgb(expected, expected, expected));
    }

    #[test]
    fn grayscale_ramp_is_monotonic() {
        let first = indexed_color_grayscale(232).r;
        let last = indexed_color_grayscale(255).r;
        assert!(last > first);
    }

    #[test]
    fn named_indices_never_use_the_cube() {
        let theme = Theme::default();
        for idx in 0u8..16 {
            assert_eq!(theme.resolve_indexed(idx), theme.ansi[idx as usize]);
        }
    }
}
