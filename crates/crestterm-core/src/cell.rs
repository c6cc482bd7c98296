use crate::Color;

/// Cells carry at most this many zero-width combining marks stacked on the
/// base codepoint (e.g. combining accents). Longer combining sequences are
/// truncated; this keeps `Cell` small and `Copy`.
pub const MAX_COMBINERS: usize = 2;

/// A base codepoint plus any combining marks stacked on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellText {
    pub base: char,
    combiners: [Option<char>; MAX_COMBINERS],
    combiner_count: u8,
}

impl CellText {
    pub fn new(base: char) -> Self {
        Self { base, combiners: [None; MAX_COMBINERS], combiner_count: 0 }
    }

    /// Appends a combining mark, silently dropping it once `MAX_COMBINERS`
    /// is reached rather than growing the cell.
    pub fn push_combiner(&mut self, mark: char) {
        let idx = self.combiner_count as usize;
        if idx < MAX_COMBINERS {
            self.combiners[idx] = Some(mark);
            self.combiner_count += 1;
        }
    }

    pub fn combiners(&self) -> impl Iterator<Item = char> + '_ {
        self.combiners[..self.combiner_count as usize].iter().filter_map(|c| *c)
    }

    /// Renders the full grapheme (base + combiners) into `out`.
    pub fn write_to(&self, out: &mut String) {
        out.push(self.base);
        for c in self.combiners() {
            out.push(c);
        }
    }
}

impl Default for CellText {
    fn default() -> Self {
        Self::new(' ')
    }
}

bitflags::bitflags! {
    /// Style bits carried per-cell. `WIDE_LEADING`/`WIDE_TRAILING` encode the
    /// east-asian-wide invariant from §3: a wide-leading cell is always
    /// immediately followed by a wide-trailing cell on the same row.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CellFlags: u16 {
        const BOLD          = 1 << 0;
        const ITALIC        = 1 << 1;
        const UNDERLINE      = 1 << 2;
        const STRIKETHROUGH  = 1 << 3;
        const BLINK          = 1 << 4;
        const REVERSE        = 1 << 5;
        const HIDDEN         = 1 << 6;
        const WIDE_LEADING   = 1 << 7;
        const WIDE_TRAILING  = 1 << 8;
    }
}

/// The atomic grid entry (§3). Copyable and small; equality is decidable
/// purely from its attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub text: CellText,
    pub fg: Color,
    pub bg: Color,
    pub flags: CellFlags,
    /// Index into the terminal's hyperlink table (OSC 8), if any.
    pub hyperlink: Option<u32>,
}

impl Cell {
    pub fn blank(fg: Color, bg: Color) -> Self {
        Self { text: CellText::default(), fg, bg, flags: CellFlags::empty(), hyperlink: None }
    }

    pub fn is_wide_leading(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_LEADING)
    }

    pub fn is_wide_trailing(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_TRAILING)
    }

    /// True for a cell that carries no visible glyph and no background tint
    /// worth drawing — used by the renderer to skip empty cells cheaply.
    pub fn is_empty_visually(&self, default_bg: Color) -> bool {
        self.text.base == ' ' && self.text.combiner_count == 0 && self.bg == default_bg
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank(Color::WHITE, Color::BLACK)
    }
}
