// Two-level line cache: `text_hash` keys a shaped layout, `state_hash` keys
// a fully-composed RGBA line image for one particular UI-state combination
// (cursor/selection/search) on top of that layout.

use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

use crestterm_core::cell::Cell;
use crestterm_core::grid::GridRow;
use crestterm_core::selection::Selection;
use crestterm_core::snapshot::SearchState;

/// One positioned glyph in a shaped line, ready to be blitted without
/// re-running font selection.
#[derive(Clone)]
pub struct GlyphPlacement {
    pub col: usize,
    pub cell: Cell,
}

/// The shaping result for a line: independent of cursor/selection/search.
#[derive(Clone)]
pub struct ShapedLine {
    pub glyphs: Vec<GlyphPlacement>,
    pub cols: usize,
}

/// A fully composed RGBA image for one line at one UI-state combination.
#[derive(Clone)]
pub struct LineImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl LineImage {
    pub fn blank(width: u32, height: u32) -> Self {
        Self { width, height, pixels: vec![0u8; (width as usize) * (height as usize) * 4] }
    }
}

const INNER_CAP: usize = 8;
const OUTER_CAP: usize = 4096;

struct OuterEntry {
    layout: ShapedLine,
    renders: HashMap<u64, LineImage>,
    render_order: VecDeque<u64>,
}

pub struct LineCache {
    outer: HashMap<u64, OuterEntry>,
    outer_order: VecDeque<u64>,
    pub font_config_id: u64,
}

pub enum CacheLookup {
    /// Level-1 hit: fully composed image, zero work.
    Image(LineImage),
    /// Level-2 hit: shaped layout is cached, image must be composed.
    Layout(ShapedLine),
    /// Cold: nothing cached, must shape from scratch.
    Miss,
}

impl LineCache {
    pub fn new() -> Self {
        Self { outer: HashMap::new(), outer_order: VecDeque::new(), font_config_id: 0 }
    }

    pub fn lookup(&mut self, text_hash: u64, state_hash: u64) -> CacheLookup {
        let result = if let Some(entry) = self.outer.get(&text_hash) {
            if let Some(image) = entry.renders.get(&state_hash) {
                Some(CacheLookup::Image(image.clone()))
            } else {
                Some(CacheLookup::Layout(entry.layout.clone()))
            }
        } else {
            None
        };
        match result {
            Some(hit) => {
                touch(&mut self.outer_order, text_hash);
                hit
            }
            None => CacheLookup::Miss,
        }
    }

    pub fn insert_layout(&mut self, text_hash: u64, layout: ShapedLine) {
        self.evict_outer_if_needed(text_hash);
        self.outer.insert(
            text_hash,
            OuterEntry { layout, renders: HashMap::new(), render_order: VecDeque::new() },
        );
        touch(&mut self.outer_order, text_hash);
    }

    pub fn insert_image(&mut self, text_hash: u64, state_hash: u64, image: LineImage) {
        if let Some(entry) = self.outer.get_mut(&text_hash) {
            if entry.renders.len() >= INNER_CAP && !entry.renders.contains_key(&state_hash) {
                if let Some(oldest) = entry.render_order.pop_front() {
                    entry.renders.remove(&oldest);
                }
            }
            entry.renders.insert(state_hash, image);
            touch(&mut entry.render_order, state_hash);
        }
    }

    fn evict_outer_if_needed(&mut self, incoming: u64) {
        if self.outer.contains_key(&incoming) {
            return;
        }
        while self.outer.len() >= OUTER_CAP {
            if let Some(oldest) = self.outer_order.pop_front() {
                self.outer.remove(&oldest);
            } else {
                break;
            }
        }
    }

    /// Invalidate everything: font change, DPI/scale change, theme change, resize.
    pub fn invalidate_all(&mut self) {
        self.outer.clear();
        self.outer_order.clear();
    }
}

impl Default for LineCache {
    fn default() -> Self {
        Self::new()
    }
}

fn touch(order: &mut VecDeque<u64>, key: u64) {
    if let Some(pos) = order.iter().position(|k| *k == key) {
        order.remove(pos);
    }
    order.push_back(key);
}

/// Digest of everything that affects glyph geometry or raster appearance,
/// independent of cursor/selection/search membership.
pub fn text_hash(row: &GridRow, font_config_id: u64) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    font_config_id.hash(&mut hasher);
    row.content_hash().hash(&mut hasher);
    hasher.finish()
}

/// Digest of the UI-state attributes that intersect this row: cursor
/// position/shape, selection span, search matches. Constant when none of
/// those intersect the row.
#[allow(clippy::too_many_arguments)]
pub fn state_hash(
    absolute_row: i64,
    cursor_row: i64,
    cursor_col: usize,
    cursor_shape: u8,
    cursor_visible: bool,
    selection: Option<&Selection>,
    cols: usize,
    search: Option<&SearchState>,
) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();

    if absolute_row == cursor_row {
        1u8.hash(&mut hasher);
        cursor_col.hash(&mut hasher);
        cursor_shape.hash(&mut hasher);
        cursor_visible.hash(&mut hasher);
    } else {
        0u8.hash(&mut hasher);
    }

    if let Some(sel) = selection {
        if sel.intersects_row(absolute_row) {
            let (start, end) = sel.ordered();
            let from = if start.row == absolute_row { start.col } else { 0 };
            let to = if end.row == absolute_row { end.col } else { cols };
            1u8.hash(&mut hasher);
            from.hash(&mut hasher);
            to.hash(&mut hasher);
        } else {
            0u8.hash(&mut hasher);
        }
    }

    if let Some(search) = search {
        let mut any = false;
        for (idx, m) in search.matches.iter().enumerate() {
            if m.start.row <= absolute_row && absolute_row <= m.end.row {
                any = true;
                let focused = search.focused == Some(idx);
                (m.start.row, m.start.col, m.end.row, m.end.col, focused).hash(&mut hasher);
            }
        }
        any.hash(&mut hasher);
    }

    hasher.finish()
}
