use std::sync::Arc;

use crate::grid::{CursorState, Grid};
use crate::selection::Selection;

/// A single compiled search's matches and focus (§3). Wrapped in `Arc` by
/// `TerminalState` so snapshotting stays cheap even with many matches.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub pattern: String,
    pub matches: Vec<SearchMatch>,
    pub focused: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub start: crate::grid::GridPoint,
    pub end: crate::grid::GridPoint,
}

bitflags::bitflags! {
    /// DEC private modes the engine honours (§3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModeFlags: u16 {
        const BRACKETED_PASTE    = 1 << 0;
        const FOCUS_REPORTING    = 1 << 1;
        const KITTY_KEYBOARD     = 1 << 2;
        const MOUSE_REPORT_CLICK = 1 << 3; // 1000
        const MOUSE_REPORT_DRAG  = 1 << 4; // 1002
        const MOUSE_REPORT_ANY   = 1 << 5; // 1003
        const MOUSE_REPORT_SGR   = 1 << 6; // 1006
        const ALT_SCREEN         = 1 << 7;
        const APP_CURSOR_KEYS    = 1 << 8;
        const APP_KEYPAD         = 1 << 9;
    }
}

/// An immutable, cheap-to-clone view of one terminal's state, handed to the
/// Renderer once per frame (§3). The grid is shared by reference; only
/// small fixed-size fields are copied on `Clone`.
#[derive(Clone)]
pub struct TerminalState {
    pub grid: Arc<Grid>,
    pub cursor: CursorState,
    pub selection: Option<Selection>,
    pub search: Option<Arc<SearchState>>,
    pub mode: ModeFlags,
    pub display_offset: usize,
    /// Bumped on every mutation; used by the line cache to detect that a
    /// snapshot is stale without re-hashing every row.
    pub generation: u64,
}

/// Describes which rows of a `Frame` differ from the previously produced
/// frame for the same terminal, for validation/debugging (§3).
#[derive(Debug, Clone)]
pub enum FrameDamage {
    Full,
    Partial(Vec<i64>),
    None,
}

/// Renderer output for one terminal (§3): an RGBA8 image plus metadata.
/// Immutable after construction; consumed once by the Compositor.
#[derive(Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
    /// Premultiplied RGBA8, row-major, `width * height * 4` bytes.
    pub pixels: Arc<Vec<u8>>,
    pub damage: FrameDamage,
}

impl Frame {
    pub fn blank(width: u32, height: u32, scale: f32) -> Self {
        Self {
            width,
            height,
            scale,
            pixels: Arc::new(vec![0u8; (width * height * 4) as usize]),
            damage: FrameDamage::Full,
        }
    }
}
