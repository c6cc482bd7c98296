use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;

use crate::cell::Cell;

/// An absolute, signed grid coordinate: row 0 is the top of the visible
/// screen, negative rows reach into scrollback, col is always non-negative
/// (§3 "addressable as signed integers with 0 at the top of screen").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridPoint {
    pub row: i64,
    pub col: usize,
}

impl GridPoint {
    pub fn new(row: i64, col: usize) -> Self {
        Self { row, col }
    }
}

/// An ordered sequence of `Cell`, plus a fast content hash used as the line
/// cache's `text_hash` key (§4.4.1). The hash is recomputed whenever the row
/// is mutated and otherwise stable across `Clone`.
#[derive(Debug, Clone)]
pub struct GridRow {
    cells: Vec<Cell>,
    /// True when this row's last cell wrapped into the next row (DECAWM),
    /// so logical-line reconstruction (search, linewise selection) can
    /// concatenate wrap-continued rows into one line.
    pub wrapped: bool,
    content_hash: u64,
}

impl GridRow {
    pub fn new(cols: usize) -> Self {
        let mut row = Self { cells: vec![Cell::default(); cols], wrapped: false, content_hash: 0 };
        row.recompute_hash();
        row
    }

    pub fn from_cells(cells: Vec<Cell>, wrapped: bool) -> Self {
        let mut row = Self { cells, wrapped, content_hash: 0 };
        row.recompute_hash();
        row
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn get(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }

    /// Sets a cell and bumps the row's content hash. Out-of-bounds writes
    /// are ignored — grid operations never fail, per §4.2.
    pub fn set(&mut self, col: usize, cell: Cell) {
        if let Some(slot) = self.cells.get_mut(col) {
            *slot = cell;
            self.recompute_hash();
        }
    }

    pub fn resize(&mut self, cols: usize, fill: Cell) {
        self.cells.resize(cols, fill);
        self.recompute_hash();
    }

    /// Content hash: stable across `Clone`, independent of row identity.
    /// This is the `text_hash` ingredient contributed by one row; the
    /// Renderer additionally folds in the active font configuration id
    /// (§4.4.1) which this type has no knowledge of.
    pub fn content_hash(&self) -> u64 {
        self.content_hash
    }

    fn recompute_hash(&mut self) {
        let mut hasher = DefaultHasher::new();
        self.wrapped.hash(&mut hasher);
        for cell in &self.cells {
            cell.text.hash(&mut hasher);
            // Colours are f32-based (no Eq/Hash); hash their bit patterns.
            cell.fg.r.to_bits().hash(&mut hasher);
            cell.fg.g.to_bits().hash(&mut hasher);
            cell.fg.b.to_bits().hash(&mut hasher);
            cell.fg.a.to_bits().hash(&mut hasher);
            cell.bg.r.to_bits().hash(&mut hasher);
            cell.bg.g.to_bits().hash(&mut hasher);
            cell.bg.b.to_bits().hash(&mut hasher);
            cell.bg.a.to_bits().hash(&mut hasher);
            cell.flags.bits().hash(&mut hasher);
            cell.hyperlink.hash(&mut hasher);
        }
        self.content_hash = hasher.finish();
    }

    /// Reconstructs the logical text of the row (codepoints only, combiners
    /// included, wide-trailing spacer cells skipped) for search/selection.
    pub fn logical_text(&self) -> String {
        let mut out = String::with_capacity(self.cells.len());
        for cell in &self.cells {
            if cell.is_wide_trailing() {
                continue;
            }
            cell.text.write_to(&mut out);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShape {
    Block,
    Underline,
    Beam,
    Hidden,
}

/// `(column, row)` within screen plus rendering-relevant cursor attributes
/// (§3). Blink phase is intentionally not stored — it is derived from wall
/// clock time by whoever renders the overlay (§4.4.2).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorState {
    pub col: u16,
    pub row: u16,
    pub shape: CursorShape,
    pub visible: bool,
    pub blink_enabled: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self { col: 0, row: 0, shape: CursorShape::Block, visible: true, blink_enabled: true }
    }
}

/// Two-part ordered collection of `GridRow`: bounded scrollback history plus
/// exactly `rows` screen rows (§3). Absolute indices span both: `0` is the
/// top of screen, negative values walk backwards into scrollback.
#[derive(Debug, Clone)]
pub struct Grid {
    pub cols: usize,
    pub rows: usize,
    screen: Vec<GridRow>,
    scrollback: VecDeque<GridRow>,
    scrollback_limit: usize,
}

impl Grid {
    pub fn new(cols: usize, rows: usize, scrollback_limit: usize) -> Self {
        Self {
            cols,
            rows,
            screen: (0..rows).map(|_| GridRow::new(cols)).collect(),
            scrollback: VecDeque::new(),
            scrollback_limit,
        }
    }

    pub fn history_size(&self) -> usize {
        self.scrollback.len()
    }

    /// Screen rows, top to bottom.
    pub fn screen_rows(&self) -> &[GridRow] {
        &self.screen
    }

    pub fn screen_row_mut(&mut self, row: usize) -> Option<&mut GridRow> {
        self.screen.get_mut(row)
    }

    /// Looks up a row by absolute index: `0..rows` addresses the screen,
    /// negative values address scrollback (`-1` is the row immediately
    /// above the screen).
    pub fn row(&self, absolute: i64) -> Option<&GridRow> {
        if absolute >= 0 {
            self.screen.get(absolute as usize)
        } else {
            let back = (-absolute) as usize; // 1, 2, 3, ...
            if back > self.scrollback.len() {
                return None;
            }
            self.scrollback.get(self.scrollback.len() - back)
        }
    }

    /// Lowest valid absolute row index (the oldest retained scrollback row).
    pub fn min_absolute_row(&self) -> i64 {
        -(self.scrollback.len() as i64)
    }

    pub fn max_absolute_row(&self) -> i64 {
        self.rows as i64 - 1
    }

    /// Pushes a row that has scrolled off the top of the screen into
    /// scrollback, evicting the oldest row if over the configured limit.
    /// A no-op when the alternate screen is active — callers gate that.
    pub fn push_scrollback(&mut self, row: GridRow) {
        if self.scrollback_limit == 0 {
            return;
        }
        self.scrollback.push_back(row);
        while self.scrollback.len() > self.scrollback_limit {
            self.scrollback.pop_front();
        }
    }

    /// Resizes the screen in place. Per §4.2 rewrap is not required: rows
    /// are truncated or extended with blank cells, and new blank screen
    /// rows are appended/removed as needed. Returns a clamped cursor
    /// position the caller should apply.
    pub fn resize(&mut self, cols: usize, rows: usize, fill: Cell) {
        for row in &mut self.screen {
            row.resize(cols, fill);
        }
        if rows > self.screen.len() {
            self.screen.resize_with(rows, || GridRow::new(cols));
        } else {
            self.screen.truncate(rows);
        }
        self.cols = cols;
        self.rows = rows;
    }

    pub fn clamp_cursor(&self, cursor: CursorState) -> CursorState {
        let mut c = cursor;
        c.col = c.col.min(self.cols.saturating_sub(1) as u16);
        c.row = c.row.min(self.rows.saturating_sub(1) as u16);
        c
    }

    /// Concatenates a logical line starting at `start_row`, following
    /// `wrapped` continuations forward, for search and linewise selection.
    /// Returns the joined text and the absolute row range it spans.
    pub fn logical_line(&self, start_row: i64) -> (String, i64, i64) {
        let mut text = String::new();
        let mut row_idx = start_row;
        let mut last_row = start_row;
        loop {
            let Some(row) = self.row(row_idx) else { break };
            text.push_str(row.logical_text().trim_end_matches(' '));
            last_row = row_idx;
            if !row.wrapped {
                break;
            }
            text.push('\n');
            row_idx += 1;
        }
        (text, start_row, last_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn screen_shape_invariant_holds_after_construction() {
        let grid = Grid::new(80, 24, 1000);
        assert_eq!(grid.screen_rows().len(), 24);
        assert!(grid.screen_rows().iter().all(|r| r.len() == 80));
    }

    #[test]
    fn absolute_indexing_reaches_into_scrollback() {
        let mut grid = Grid::new(10, 5, 100);
        let mut row = GridRow::new(10);
        row.set(0, Cell::blank(Color::WHITE, Color::BLACK));
        grid.push_scrollback(row);
        assert!(grid.row(0).is_some());
        assert!(grid.row(-1).is_some());
        assert!(grid.row(-2).is_none());
        assert_eq!(grid.min_absolute_row(), -1);
    }

    #[test]
    fn resize_preserves_row_count_and_column_count() {
        let mut grid = Grid::new(80, 24, 1000);
        grid.resize(120, 40, Cell::default());
        assert_eq!(grid.screen_rows().len(), 40);
        assert!(grid.screen_rows().iter().all(|r| r.len() == 120));
        grid.resize(80, 24, Cell::default());
        assert_eq!(grid.screen_rows().len(), 24);
        assert!(grid.screen_rows().iter().all(|r| r.len() == 80));
    }

    #[test]
    fn content_hash_changes_on_mutation_and_is_stable_across_clone() {
        let mut grid = Grid::new(10, 5, 10);
        let before = grid.screen_rows()[0].content_hash();
        let cloned_hash = grid.clone().screen_rows()[0].content_hash();
        assert_eq!(before, cloned_hash);

        grid.screen_row_mut(0).unwrap().set(0, Cell::blank(Color::rgb(1.0, 0.0, 0.0), Color::BLACK));
        let after = grid.screen_rows()[0].content_hash();
        assert_ne!(before, after);
    }
}
