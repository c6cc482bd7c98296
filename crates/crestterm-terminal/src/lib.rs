//! Terminal Aggregate: PTY + VT parser/grid + selection/search, composed
//! behind one `Terminal` handle per pseudo-terminal.
//!
//! Threading model:
//!   PTY Thread (alacritty EventLoop) — reads PTY, parses VT, updates Term state
//!   Grid-sync Thread — copies grid state from Term, converts colors, publishes a snapshot
//!   Main Thread — swaps in the latest snapshot, serves commands/queries
//!
//! The sync thread decouples expensive grid synchronization from the main
//! thread, so input and queries are never blocked by terminal output
//! processing.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use alacritty_terminal::event::{Event, EventListener, WindowSize};
use alacritty_terminal::event_loop::{EventLoop, Msg, Notifier};
use alacritty_terminal::grid::{Dimensions, Scroll};
use alacritty_terminal::index::{Column, Line, Point};
use alacritty_terminal::sync::FairMutex;
use alacritty_terminal::term::cell::Flags as AlacrittyFlags;
use alacritty_terminal::term::{Config as TermConfig, Term, TermMode};
use alacritty_terminal::tty;
use alacritty_terminal::vte::ansi::{
    Color as AnsiColor, CursorShape as AnsiCursorShape, NamedColor, Rgb as AnsiRgb,
};

mod color;

use crestterm_core::{
    Cell, CellFlags, CellText, CursorShape, CursorState, Grid, GridPoint, GridRow, ModeFlags,
    SearchMatch, SearchState, Selection, SelectionKind, TerminalState, Theme,
};

/// Scrollback history lines kept when the host does not specify a smaller
/// `AppConfig::history_size`.
const DEFAULT_SCROLLBACK: usize = 10_000;

/// A command addressed to a closed terminal fails with this error rather
/// than panicking or silently no-op'ing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Closed;

impl fmt::Display for Closed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "terminal is closed")
    }
}

impl std::error::Error for Closed {}

/// Simple dimensions struct implementing alacritty_terminal's `Dimensions`.
struct TermDimensions {
    cols: usize,
    rows: usize,
    scrollback: usize,
}

impl Dimensions for TermDimensions {
    fn columns(&self) -> usize {
        self.cols
    }

    fn screen_lines(&self) -> usize {
        self.rows
    }

    fn total_lines(&self) -> usize {
        self.rows + self.scrollback
    }
}

// ──────────────────────────────────────────────
// Shared snapshot: exchange point between sync thread and main thread
// ──────────────────────────────────────────────

struct SharedSnapshot {
    state: TerminalState,
    exited: bool,
}

// ──────────────────────────────────────────────
// Event listener (PTY thread → sync thread signaling)
// ──────────────────────────────────────────────

/// Forwards `PtyWrite` replies (e.g. cursor-position-report) back to the
/// PTY, marks the dirty flag, and wakes the sync thread.
#[derive(Clone)]
struct TermEventListener {
    dirty: Arc<AtomicBool>,
    pty_writer: Arc<Mutex<Option<Notifier>>>,
    sync_thread: Arc<Mutex<Option<std::thread::Thread>>>,
    exited: Arc<AtomicBool>,
    bell: Arc<AtomicBool>,
    title: Arc<Mutex<Option<String>>>,
}

impl EventListener for TermEventListener {
    fn send_event(&self, event: Event) {
        match &event {
            Event::PtyWrite(text) => {
                if let Ok(guard) = self.pty_writer.lock() {
                    if let Some(notifier) = guard.as_ref() {
                        let _ = notifier.0.send(Msg::Input(Cow::Owned(text.clone().into_bytes())));
                    }
                }
            }
            Event::Exit => {
                self.exited.store(true, Ordering::Relaxed);
            }
            Event::Bell => {
                self.bell.store(true, Ordering::Relaxed);
            }
            Event::Title(text) => {
                if let Ok(mut guard) = self.title.lock() {
                    *guard = Some(text.clone());
                }
            }
            Event::ResetTitle => {
                if let Ok(mut guard) = self.title.lock() {
                    *guard = None;
                }
            }
            _ => {}
        }
        self.dirty.store(true, Ordering::Relaxed);
        if let Ok(guard) = self.sync_thread.lock() {
            if let Some(ref thread) = *guard {
                thread.unpark();
            }
        }
    }
}

// ──────────────────────────────────────────────
// GridSyncer: owns all state for grid synchronization (runs on sync thread)
// ──────────────────────────────────────────────

type RawCell = (char, AnsiColor, AnsiColor, AlacrittyFlags, Option<String>);

struct GridSyncer {
    term: Arc<FairMutex<Term<TermEventListener>>>,
    raw_buf: Vec<RawCell>,
    prev_raw_buf: Vec<RawCell>,
    palette_buf: [Option<AnsiRgb>; 256],
    grid: Grid,
    prev_history_len: usize,
    cached_cursor: CursorState,
    mode: ModeFlags,
    generation: u64,
    theme: Theme,
    hyperlink_ids: HashMap<String, u32>,
    next_hyperlink_id: u32,
    stay_at_bottom: Arc<AtomicBool>,
}

impl GridSyncer {
    /// Run one grid synchronization cycle.
    /// Phase 1: lock `Term` briefly to copy raw cell data, palette, and any
    /// newly scrolled-off history rows.
    /// Phase 2: convert colors and diff against the previous frame with the
    /// lock released.
    fn sync(&mut self) {
        let stay_at_bottom = self.stay_at_bottom.load(Ordering::Relaxed);

        let (cols, total_lines, new_history_rows) = {
            let mut term = self.term.lock();

            if stay_at_bottom {
                term.scroll_display(Scroll::Bottom);
            }

            let tm = term.mode();
            let mut mode = ModeFlags::empty();
            if tm.contains(TermMode::BRACKETED_PASTE) {
                mode |= ModeFlags::BRACKETED_PASTE;
            }
            if tm.contains(TermMode::FOCUS_IN_OUT) {
                mode |= ModeFlags::FOCUS_REPORTING;
            }
            if tm.contains(TermMode::MOUSE_REPORT_CLICK) {
                mode |= ModeFlags::MOUSE_REPORT_CLICK;
            }
            if tm.contains(TermMode::MOUSE_DRAG) {
                mode |= ModeFlags::MOUSE_REPORT_DRAG;
            }
            if tm.contains(TermMode::MOUSE_MOTION) {
                mode |= ModeFlags::MOUSE_REPORT_ANY;
            }
            if tm.contains(TermMode::SGR_MOUSE) {
                mode |= ModeFlags::MOUSE_REPORT_SGR;
            }
            if tm.contains(TermMode::ALT_SCREEN) {
                mode |= ModeFlags::ALT_SCREEN;
            }
            if tm.contains(TermMode::APP_CURSOR) {
                mode |= ModeFlags::APP_CURSOR_KEYS;
            }
            if tm.contains(TermMode::APP_KEYPAD) {
                mode |= ModeFlags::APP_KEYPAD;
            }
            if tm.contains(TermMode::KITTY_KEYBOARD_PROTOCOL) {
                mode |= ModeFlags::KITTY_KEYBOARD;
            }
            self.mode = mode;

            let grid = term.grid();
            let cols = grid.columns();
            let total_lines = grid.screen_lines();
            let display_offset = grid.display_offset();
            let history_len = grid.history_size();
            let total_cells = cols * total_lines;

            let colors = term.colors();
            for i in 0..256 {
                self.palette_buf[i] = colors[i];
            }

            self.raw_buf.resize(
                total_cells,
                (
                    ' ',
                    AnsiColor::Named(NamedColor::Foreground),
                    AnsiColor::Named(NamedColor::Background),
                    AlacrittyFlags::empty(),
                    None,
                ),
            );
            for line_idx in 0..total_lines {
                let line = Line(line_idx as i32 - display_offset as i32);
                let base = line_idx * cols;
                for col_idx in 0..cols {
                    let point = Point::new(line, Column(col_idx));
                    let cell = &grid[point];
                    self.raw_buf[base + col_idx] =
                        (cell.c, cell.fg, cell.bg, cell.flags, cell.hyperlink().map(|h| h.uri().to_string()));
                }
            }

            // Mirror rows that scrolled off the top of the screen into our
            // own persistent scrollback since the last cycle.
            let mut new_history_rows = Vec::new();
            if history_len > self.prev_history_len {
                for depth in (self.prev_history_len + 1..=history_len).rev() {
                    let line = Line(-(depth as i32));
                    let mut row = Vec::with_capacity(cols);
                    for col_idx in 0..cols {
                        let point = Point::new(line, Column(col_idx));
                        let cell = &grid[point];
                        row.push((cell.c, cell.fg, cell.bg, cell.flags, cell.hyperlink().map(|h| h.uri().to_string())));
                    }
                    new_history_rows.push(row);
                }
            }
            self.prev_history_len = history_len;

            let cursor_point = grid.cursor.point;
            let cursor_shape = match term.cursor_style().shape {
                AnsiCursorShape::Block => CursorShape::Block,
                AnsiCursorShape::Beam => CursorShape::Beam,
                AnsiCursorShape::Underline => CursorShape::Underline,
                _ => CursorShape::Block,
            };
            let cursor_visible = term.mode().contains(TermMode::SHOW_CURSOR);

            self.cached_cursor = CursorState {
                row: cursor_point.line.0.max(0) as u16,
                col: cursor_point.column.0 as u16,
                shape: cursor_shape,
                visible: cursor_visible,
                blink_enabled: true,
            };

            (cols, total_lines, new_history_rows)
        }; // Lock released here.

        for row in new_history_rows {
            let built = self.build_row(cols, &row);
            self.grid.push_scrollback(built);
        }

        let total_cells = cols * total_lines;
        let same_size = self.prev_raw_buf.len() == total_cells && self.grid.cols == cols;

        if self.grid.cols != cols || self.grid.rows != total_lines {
            self.grid.resize(cols, total_lines, Cell::default());
        }

        let mut any_changed = !same_size;

        for line_idx in 0..total_lines {
            let base = line_idx * cols;
            let row_changed = !same_size
                || self.prev_raw_buf[base..base + cols] != self.raw_buf[base..base + cols];
            if !row_changed {
                continue;
            }
            any_changed = true;
            let row_cells: Vec<RawCell> = self.raw_buf[base..base + cols].to_vec();
            let built = self.build_row(cols, &row_cells);
            if let Some(slot) = self.grid.screen_row_mut(line_idx) {
                *slot = built;
            }
        }

        std::mem::swap(&mut self.prev_raw_buf, &mut self.raw_buf);

        if any_changed {
            self.generation += 1;
        }
    }

    /// Converts one row of raw alacritty cell data into a `GridRow`,
    /// resolving colors through the active theme and baking in
    /// inverse/dim adjustments.
    fn build_row(&mut self, cols: usize, raw: &[RawCell]) -> GridRow {
        let mut cells = Vec::with_capacity(cols);
        let mut wrapped = false;

        for (col_idx, (c, fg, bg, flags, hyperlink)) in raw.iter().enumerate() {
            if col_idx + 1 == cols && flags.contains(AlacrittyFlags::WRAPLINE) {
                wrapped = true;
            }

            if flags.contains(AlacrittyFlags::WIDE_CHAR_SPACER) {
                let mut bg_color = color::convert_color(&self.theme, bg, &self.palette_buf);
                let mut bg_is_default = matches!(bg, AnsiColor::Named(NamedColor::Background));
                if flags.contains(AlacrittyFlags::INVERSE) {
                    bg_color = color::convert_color(&self.theme, fg, &self.palette_buf);
                    bg_is_default = false;
                }
                cells.push(Cell {
                    text: CellText::default(),
                    fg: self.theme.default_fg,
                    bg: if bg_is_default { self.theme.default_bg } else { bg_color },
                    flags: CellFlags::WIDE_TRAILING,
                    hyperlink: None,
                });
                continue;
            }

            let mut fg_color = color::convert_color(&self.theme, fg, &self.palette_buf);
            let mut bg_color = color::convert_color(&self.theme, bg, &self.palette_buf);
            let bg_is_default = matches!(bg, AnsiColor::Named(NamedColor::Background));

            if flags.contains(AlacrittyFlags::INVERSE) {
                std::mem::swap(&mut fg_color, &mut bg_color);
            }
            if flags.contains(AlacrittyFlags::DIM) {
                fg_color = crestterm_core::Color::new(fg_color.r * 0.65, fg_color.g * 0.65, fg_color.b * 0.65, fg_color.a);
            }

            let mut cell_flags = CellFlags::empty();
            if flags.intersects(AlacrittyFlags::BOLD | AlacrittyFlags::BOLD_ITALIC) {
                cell_flags |= CellFlags::BOLD;
            }
            if flags.intersects(AlacrittyFlags::ITALIC | AlacrittyFlags::BOLD_ITALIC) {
                cell_flags |= CellFlags::ITALIC;
            }
            if flags.intersects(
                AlacrittyFlags::UNDERLINE
                    | AlacrittyFlags::DOUBLE_UNDERLINE
                    | AlacrittyFlags::UNDERCURL
                    | AlacrittyFlags::DOTTED_UNDERLINE
                    | AlacrittyFlags::DASHED_UNDERLINE,
            ) {
                cell_flags |= CellFlags::UNDERLINE;
            }
            if flags.contains(AlacrittyFlags::STRIKEOUT) {
                cell_flags |= CellFlags::STRIKETHROUGH;
            }
            if flags.contains(AlacrittyFlags::HIDDEN) {
                cell_flags |= CellFlags::HIDDEN;
            }
            if flags.contains(AlacrittyFlags::WIDE_CHAR) {
                cell_flags |= CellFlags::WIDE_LEADING;
            }

            let hyperlink_id = hyperlink.as_ref().map(|uri| {
                if let Some(id) = self.hyperlink_ids.get(uri) {
                    *id
                } else {
                    let id = self.next_hyperlink_id;
                    self.next_hyperlink_id += 1;
                    self.hyperlink_ids.insert(uri.clone(), id);
                    id
                }
            });

            cells.push(Cell {
                text: CellText::new(*c),
                fg: fg_color,
                bg: if bg_is_default { self.theme.default_bg } else { bg_color },
                flags: cell_flags,
                hyperlink: hyperlink_id,
            });
        }

        GridRow::from_cells(cells, wrapped)
    }
}

// ──────────────────────────────────────────────
// Sync thread entry point
// ──────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn grid_sync_thread_main(
    thread_handle: Arc<Mutex<Option<std::thread::Thread>>>,
    mut syncer: GridSyncer,
    dirty: Arc<AtomicBool>,
    snapshot: Arc<Mutex<SharedSnapshot>>,
    snapshot_ready: Arc<AtomicBool>,
    waker: Arc<Mutex<Option<Box<dyn Fn() + Send>>>>,
    shutdown: Arc<AtomicBool>,
    exited: Arc<AtomicBool>,
) {
    {
        let mut guard = thread_handle.lock().unwrap();
        *guard = Some(std::thread::current());
    }

    loop {
        while dirty.swap(false, Ordering::Relaxed) {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }

            syncer.sync();

            {
                let mut snap = snapshot.lock().unwrap();
                snap.state = TerminalState {
                    grid: Arc::new(syncer.grid.clone()),
                    cursor: syncer.cached_cursor,
                    selection: snap.state.selection.clone(),
                    search: snap.state.search.clone(),
                    mode: syncer.mode,
                    display_offset: 0,
                    generation: syncer.generation,
                };
                snap.exited = exited.load(Ordering::Relaxed);
            }
            snapshot_ready.store(true, Ordering::Relaxed);

            if let Ok(guard) = waker.lock() {
                if let Some(f) = guard.as_ref() {
                    f();
                }
            }
        }

        std::thread::park();

        if shutdown.load(Ordering::Relaxed) {
            return;
        }
    }
}

// ──────────────────────────────────────────────
// Terminal Aggregate
// ──────────────────────────────────────────────

/// Word separators used by semantic (word) selection and `word_at`. A cell
/// is a word character when it is alphanumeric, `_`, or not in this set;
/// everything in this set is always a boundary.
const WORD_SEPARATORS: &str = " \t\n()[]{}<>\"'`,;:!?|/\\";

/// Composes PTY + VT parser/grid + selection/search behind one handle.
pub struct Terminal {
    term: Arc<FairMutex<Term<TermEventListener>>>,
    notifier: Notifier,
    cached_state: TerminalState,
    current_dir: Option<PathBuf>,
    cols: u16,
    rows: u16,
    scrollback: usize,
    child_pid: Option<u32>,
    snapshot_ready: Arc<AtomicBool>,
    snapshot: Arc<Mutex<SharedSnapshot>>,
    stay_at_bottom: Arc<AtomicBool>,
    dirty: Arc<AtomicBool>,
    waker: Arc<Mutex<Option<Box<dyn Fn() + Send>>>>,
    pending_pty_resize: Option<(WindowSize, Instant)>,
    sync_thread_handle: Arc<Mutex<Option<std::thread::Thread>>>,
    sync_shutdown: Arc<AtomicBool>,
    _sync_join: Option<std::thread::JoinHandle<()>>,
    exited: Arc<AtomicBool>,
    closed: bool,
    mode: crestterm_core::TerminalMode,
    selection: Option<Selection>,
    search_pattern: Option<String>,
    bell: Arc<AtomicBool>,
    title: Arc<Mutex<Option<String>>>,
    last_reported_title: Option<String>,
}

impl Terminal {
    /// Spawns a new terminal backend with the given dimensions, using the
    /// host's `$SHELL`/`/bin/zsh`/`/bin/bash` fallback chain.
    pub fn new(cols: u16, rows: u16, theme: Theme, history_size: usize) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_cwd(cols, rows, None, None, theme, history_size)
    }

    /// Spawns a terminal, optionally pinning the shell path and starting cwd.
    pub fn with_cwd(
        cols: u16,
        rows: u16,
        shell_path: Option<String>,
        cwd: Option<PathBuf>,
        theme: Theme,
        history_size: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let cell_width = 8;
        let cell_height = 16;
        let scrollback = if history_size == 0 { DEFAULT_SCROLLBACK } else { history_size };

        let window_size = WindowSize { num_cols: cols, num_lines: rows, cell_width, cell_height };
        let term_size = TermDimensions { cols: cols as usize, rows: rows as usize, scrollback };

        let dirty = Arc::new(AtomicBool::new(true));
        let pty_writer = Arc::new(Mutex::new(None));
        let sync_thread_handle: Arc<Mutex<Option<std::thread::Thread>>> = Arc::new(Mutex::new(None));
        let exited = Arc::new(AtomicBool::new(false));
        let bell = Arc::new(AtomicBool::new(false));
        let title = Arc::new(Mutex::new(None));
        let listener = TermEventListener {
            dirty: dirty.clone(),
            pty_writer: pty_writer.clone(),
            sync_thread: sync_thread_handle.clone(),
            exited: exited.clone(),
            bell: bell.clone(),
            title: title.clone(),
        };

        let config = TermConfig { scrolling_history: scrollback, ..TermConfig::default() };
        let term = Term::new(config, &term_size, listener.clone());
        let term = Arc::new(FairMutex::new(term));

        let shell = shell_path.unwrap_or_else(Self::detect_shell);
        let working_directory = cwd.or_else(|| std::env::var("HOME").ok().map(PathBuf::from));
        let mut env = std::collections::HashMap::new();
        env.insert(String::from("TERM"), String::from("xterm-256color"));
        env.insert(String::from("COLORTERM"), String::from("truecolor"));
        env.insert(String::from("PROMPT_EOL_MARK"), String::new());

        let pty_config = tty::Options {
            shell: Some(tty::Shell::new(shell, vec![String::from("--login")])),
            working_directory,
            env,
            ..tty::Options::default()
        };

        let pty = tty::new(&pty_config, window_size, 0)?;
        let child_pid = pty.child().id();

        let event_loop = EventLoop::new(term.clone(), listener, pty, false, false)?;
        let notifier = Notifier(event_loop.channel());
        if let Ok(mut guard) = pty_writer.lock() {
            *guard = Some(Notifier(event_loop.channel()));
        }
        event_loop.spawn();

        let stay_at_bottom = Arc::new(AtomicBool::new(false));
        let snapshot_ready = Arc::new(AtomicBool::new(false));
        let sync_shutdown = Arc::new(AtomicBool::new(false));
        let waker: Arc<Mutex<Option<Box<dyn Fn() + Send>>>> = Arc::new(Mutex::new(None));

        let empty_state = TerminalState {
            grid: Arc::new(Grid::new(cols as usize, rows as usize, scrollback)),
            cursor: CursorState::default(),
            selection: None,
            search: None,
            mode: ModeFlags::empty(),
            display_offset: 0,
            generation: 0,
        };

        let snapshot = Arc::new(Mutex::new(SharedSnapshot { state: empty_state.clone(), exited: false }));

        let syncer = GridSyncer {
            term: term.clone(),
            raw_buf: Vec::new(),
            prev_raw_buf: Vec::new(),
            palette_buf: [None; 256],
            grid: Grid::new(cols as usize, rows as usize, scrollback),
            prev_history_len: 0,
            cached_cursor: CursorState::default(),
            mode: ModeFlags::empty(),
            generation: 0,
            theme,
            hyperlink_ids: HashMap::new(),
            next_hyperlink_id: 0,
            stay_at_bottom: stay_at_bottom.clone(),
        };

        let sync_join = {
            let handle = sync_thread_handle.clone();
            let dirty = dirty.clone();
            let snapshot = snapshot.clone();
            let snapshot_ready = snapshot_ready.clone();
            let waker = waker.clone();
            let shutdown = sync_shutdown.clone();
            let exited = exited.clone();
            std::thread::Builder::new()
                .name("grid-sync".to_string())
                .spawn(move || {
                    grid_sync_thread_main(handle, syncer, dirty, snapshot, snapshot_ready, waker, shutdown, exited);
                })
                .expect("failed to spawn grid sync thread")
        };

        Ok(Terminal {
            term,
            notifier,
            cached_state: empty_state,
            current_dir: None,
            cols,
            rows,
            scrollback,
            child_pid: Some(child_pid),
            snapshot_ready,
            snapshot,
            stay_at_bottom,
            dirty,
            waker,
            pending_pty_resize: None,
            sync_thread_handle,
            sync_shutdown,
            _sync_join: Some(sync_join),
            exited,
            closed: false,
            mode: crestterm_core::TerminalMode::Active,
            selection: None,
            search_pattern: None,
            bell,
            title,
            last_reported_title: None,
        })
    }

    fn detect_shell() -> String {
        std::env::var("SHELL").unwrap_or_else(|_| {
            if std::path::Path::new("/bin/zsh").exists() {
                "/bin/zsh".to_string()
            } else {
                "/bin/bash".to_string()
            }
        })
    }

    #[cfg(target_os = "macos")]
    fn detect_cwd_fallback(&self) -> Option<PathBuf> {
        let pid = self.child_pid? as i32;
        const PROC_PIDVNODEPATHINFO: i32 = 9;
        const BUF_SIZE: usize = 2352;
        const PATH_OFFSET: usize = 152;
        const MAXPATHLEN: usize = 1024;

        let mut buf = [0u8; BUF_SIZE];
        let ret = unsafe {
            libc::proc_pidinfo(pid, PROC_PIDVNODEPATHINFO, 0, buf.as_mut_ptr() as *mut libc::c_void, BUF_SIZE as i32)
        };
        if ret <= 0 {
            return None;
        }
        let path_bytes = &buf[PATH_OFFSET..PATH_OFFSET + MAXPATHLEN];
        let len = path_bytes.iter().position(|&b| b == 0).unwrap_or(0);
        if len == 0 {
            return None;
        }
        let path = std::str::from_utf8(&path_bytes[..len]).ok()?;
        let p = PathBuf::from(path);
        if p.is_dir() {
            Some(p)
        } else {
            None
        }
    }

    #[cfg(not(target_os = "macos"))]
    fn detect_cwd_fallback(&self) -> Option<PathBuf> {
        let pid = self.child_pid?;
        std::fs::read_link(format!("/proc/{}/cwd", pid)).ok()
    }

    fn notify_sync_thread(&self) {
        if let Ok(guard) = self.sync_thread_handle.lock() {
            if let Some(ref thread) = *guard {
                thread.unpark();
            }
        }
    }

    fn consume_snapshot(&mut self) {
        if !self.snapshot_ready.load(Ordering::Relaxed) {
            return;
        }
        if let Ok(mut snap) = self.snapshot.lock() {
            snap.state.selection = self.selection.clone();
            std::mem::swap(&mut self.cached_state, &mut snap.state);
            if snap.exited {
                self.closed = true;
            }
        }
        self.snapshot_ready.store(false, Ordering::Relaxed);
    }

    /// Sets a waker called from the sync thread when a new snapshot is
    /// ready, so the host's event loop can sleep between wakeups.
    pub fn set_waker(&self, f: Box<dyn Fn() + Send>) {
        if let Ok(mut guard) = self.waker.lock() {
            *guard = Some(f);
        }
    }

    pub fn child_pid(&self) -> Option<u32> {
        self.child_pid
    }

    #[cfg(target_os = "macos")]
    pub fn is_running_child_process(&self) -> bool {
        let pid = match self.child_pid {
            Some(p) => p,
            None => return false,
        };
        let mut pids = [0i32; 16];
        let ret = unsafe {
            libc::proc_listchildpids(pid as i32, pids.as_mut_ptr() as *mut libc::c_void, (pids.len() * std::mem::size_of::<i32>()) as i32)
        };
        ret > 0
    }

    #[cfg(not(target_os = "macos"))]
    pub fn is_running_child_process(&self) -> bool {
        let pid = match self.child_pid {
            Some(p) => p,
            None => return false,
        };
        if let Ok(contents) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            let fields: Vec<&str> = contents.split_whitespace().collect();
            if fields.len() > 7 {
                let pgrp = fields[4].parse::<i32>().unwrap_or(0);
                let tpgid = fields[7].parse::<i32>().unwrap_or(-1);
                return pgrp != tpgid;
            }
        }
        false
    }

    /// Best-effort name of the foreground process (optional platform probe).
    #[cfg(not(target_os = "macos"))]
    pub fn foreground_process_name(&self) -> Option<String> {
        let pid = self.child_pid?;
        let contents = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
        let fields: Vec<&str> = contents.split_whitespace().collect();
        let tpgid: i32 = fields.get(7)?.parse().ok()?;
        if tpgid <= 0 {
            return None;
        }
        std::fs::read_to_string(format!("/proc/{}/comm", tpgid))
            .ok()
            .map(|s| s.trim().to_string())
    }

    #[cfg(target_os = "macos")]
    pub fn foreground_process_name(&self) -> Option<String> {
        None
    }

    pub fn has_new_output(&self) -> bool {
        self.snapshot_ready.load(Ordering::Relaxed)
    }

    pub fn grid_generation(&self) -> u64 {
        self.cached_state.generation
    }

    /// Forces a sync cycle for benchmarking purposes.
    #[doc(hidden)]
    pub fn bench_sync_grid(&mut self) {
        self.dirty.store(true, Ordering::Relaxed);
        self.notify_sync_thread();
        while !self.snapshot_ready.load(Ordering::Relaxed) {
            std::thread::yield_now();
        }
        self.consume_snapshot();
    }

    /// Injects bytes directly into the terminal emulator for benchmarking,
    /// bypassing the PTY.
    #[doc(hidden)]
    pub fn bench_write_to_term(&self, data: &[u8]) {
        use alacritty_terminal::vte::ansi::{Processor, StdSyncHandler};
        let mut processor: Processor<StdSyncHandler> = Processor::new();
        let mut term = self.term.lock();
        processor.advance(&mut *term, data);
    }

    pub fn current_cols(&self) -> u16 {
        self.cols
    }

    pub fn current_rows(&self) -> u16 {
        self.rows
    }

    pub fn mode(&self) -> crestterm_core::TerminalMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: crestterm_core::TerminalMode) {
        self.mode = mode;
    }

    // ── Commands ──

    pub fn write(&mut self, data: &[u8]) -> Result<(), Closed> {
        if self.closed {
            return Err(Closed);
        }
        self.stay_at_bottom.store(true, Ordering::Relaxed);
        let _ = self.notifier.0.send(Msg::Input(Cow::Owned(data.to_vec())));
        Ok(())
    }

    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), Closed> {
        if self.closed {
            return Err(Closed);
        }
        let cols = cols.min(1000);
        let rows = rows.min(500);
        if self.cols == cols && self.rows == rows {
            return Ok(());
        }
        self.cols = cols;
        self.rows = rows;

        let cell_width = 8;
        let cell_height = 16;
        let window_size = WindowSize { num_cols: cols, num_lines: rows, cell_width, cell_height };
        let term_size = TermDimensions { cols: cols as usize, rows: rows as usize, scrollback: self.scrollback };

        {
            let mut term = self.term.lock();
            term.resize(term_size);
        }

        self.pending_pty_resize = Some((window_size, Instant::now()));
        self.dirty.store(true, Ordering::Relaxed);
        self.notify_sync_thread();
        Ok(())
    }

    /// Scrolls the viewport; `delta > 0` moves toward history, clamped to
    /// scrollback size. Cancels stay-at-bottom since this is an explicit
    /// user scroll.
    pub fn scroll(&mut self, delta: i32) {
        self.stay_at_bottom.store(false, Ordering::Relaxed);
        let mut term = self.term.lock();
        let old_offset = term.grid().display_offset();
        term.scroll_display(Scroll::Delta(delta));
        let new_offset = term.grid().display_offset();
        drop(term);
        if old_offset != new_offset {
            self.dirty.store(true, Ordering::Relaxed);
            self.notify_sync_thread();
        }
    }

    pub fn start_selection(&mut self, point: GridPoint, kind: SelectionKind) {
        let mut sel = Selection::new(point, kind);
        if kind == SelectionKind::Semantic {
            // `word_at` returns an exclusive end; `Selection::head` is the
            // last *included* column, so it needs the -1 back.
            if let Some((start, end)) = self.word_at(point) {
                sel.anchor = start;
                sel.head = GridPoint::new(end.row, end.col.saturating_sub(1));
            }
        }
        self.selection = Some(sel);
    }

    pub fn update_selection(&mut self, point: GridPoint) {
        if let Some(sel) = &self.selection {
            if sel.kind == SelectionKind::Semantic {
                let head = self
                    .word_at(point)
                    .map(|(_, end)| GridPoint::new(end.row, end.col.saturating_sub(1)))
                    .unwrap_or(point);
                self.selection.as_mut().unwrap().head = head;
            } else {
                self.selection.as_mut().unwrap().head = point;
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Recomputes matches for `pattern` over the full logical text of the
    /// grid (screen + scrollback). Preserves the previously focused match's
    /// logical position if it still matches after the grid has changed;
    /// otherwise focuses the first match at or after the top of the
    /// viewport.
    pub fn search(&mut self, pattern: &str) -> usize {
        let previous_focus = self.focused_match_point();
        self.search_pattern = if pattern.is_empty() { None } else { Some(pattern.to_string()) };

        let matches = self.compute_matches(pattern);
        let count = matches.len();

        let focused = if let Some(prev) = previous_focus {
            matches.iter().position(|m| m.start == prev)
        } else {
            None
        };
        let focused = focused.or_else(|| matches.iter().position(|m| m.start.row >= 0));
        let focused = focused.or(if matches.is_empty() { None } else { Some(0) });

        let state = SearchState { pattern: pattern.to_string(), matches, focused };
        self.set_search_state(if pattern.is_empty() { None } else { Some(state) });
        count
    }

    pub fn next_match(&mut self) {
        self.step_match(1);
    }

    pub fn prev_match(&mut self) {
        self.step_match(-1);
    }

    pub fn clear_search(&mut self) {
        self.set_search_state(None);
    }

    fn focused_match_point(&self) -> Option<GridPoint> {
        let search = self.cached_state.search.as_ref()?;
        let idx = search.focused?;
        search.matches.get(idx).map(|m| m.start)
    }

    fn compute_matches(&self, pattern: &str) -> Vec<SearchMatch> {
        if pattern.is_empty() {
            return Vec::new();
        }
        let needle = pattern.to_lowercase();
        let grid = &self.cached_state.grid;
        let mut matches = Vec::new();
        let mut seen_starts = std::collections::HashSet::new();

        for row_idx in grid.min_absolute_row()..=grid.max_absolute_row() {
            let Some(row) = grid.row(row_idx) else { continue };
            if row.wrapped {
                continue;
            }
            let (text, start_row, _end_row) = grid.logical_line(row_idx);
            let lower = text.to_lowercase();
            let mut search_from = 0usize;
            while let Some(byte_pos) = lower[search_from..].find(&needle) {
                let byte_pos = search_from + byte_pos;
                let char_col = text[..byte_pos].chars().filter(|&c| c != '\n').count();
                if seen_starts.insert((start_row, char_col)) {
                    matches.push(SearchMatch {
                        start: GridPoint::new(start_row, char_col),
                        end: GridPoint::new(start_row, char_col + pattern.chars().count()),
                    });
                }
                search_from = byte_pos + needle.chars().next().map_or(1, |c| c.len_utf8());
            }
        }
        matches.sort_by_key(|m| (m.start.row, m.start.col));
        matches
    }

    fn step_match(&mut self, delta: i32) {
        let Some(search) = self.cached_state.search.clone() else { return };
        if search.matches.is_empty() {
            return;
        }
        let len = search.matches.len() as i32;
        let current = search.focused.map(|i| i as i32).unwrap_or(0);
        let next = ((current + delta) % len + len) % len;
        let mut updated = (*search).clone();
        updated.focused = Some(next as usize);
        self.set_search_state(Some(updated));
    }

    fn set_search_state(&mut self, state: Option<SearchState>) {
        self.cached_state.search = state.map(Arc::new);
        if let Ok(mut snap) = self.snapshot.lock() {
            snap.state.search = self.cached_state.search.clone();
        }
    }

    // ── Queries ──

    pub fn snapshot(&mut self) -> TerminalState {
        self.consume_snapshot();
        self.cached_state.clone()
    }

    pub fn selection_text(&self) -> Option<String> {
        let sel = self.selection.as_ref()?;
        let (start, end) = sel.ordered();
        match sel.kind {
            SelectionKind::Linewise => {
                let mut out = Vec::new();
                let mut row = start.row;
                loop {
                    let (text, _s, last) = self.cached_state.grid.logical_line(row);
                    out.push(text);
                    if last >= end.row {
                        break;
                    }
                    row = last + 1;
                }
                Some(out.join("\n"))
            }
            _ => {
                // `end.col` is the last *included* column (matching the
                // overlay renderer's convention, which also adds one to
                // cover it) so the slice bound needs a +1 here.
                let mut out = String::new();
                for row_idx in start.row..=end.row {
                    let Some(row) = self.cached_state.grid.row(row_idx) else { continue };
                    let text = row.logical_text();
                    let chars: Vec<char> = text.chars().collect();
                    let from = if row_idx == start.row { start.col } else { 0 };
                    let to = if row_idx == end.row { (end.col + 1).min(chars.len()) } else { chars.len() };
                    if from < chars.len() {
                        out.extend(&chars[from..to.max(from)]);
                    }
                    if row_idx != end.row {
                        out.push('\n');
                    }
                }
                Some(out)
            }
        }
    }

    /// OSC 7 is not wired into this projection; queries fall back to the
    /// native cwd probe on demand and cache the result.
    pub fn cwd(&mut self) -> Option<PathBuf> {
        if self.current_dir.is_none() {
            self.current_dir = self.detect_cwd_fallback();
        }
        self.current_dir.clone()
    }

    pub fn cursor(&self) -> CursorState {
        self.cached_state.cursor
    }

    /// Expands the word at `point` using the default separator set.
    pub fn word_at(&self, point: GridPoint) -> Option<(GridPoint, GridPoint)> {
        let row = self.cached_state.grid.row(point.row)?;
        let text: Vec<char> = row.logical_text().chars().collect();
        if point.col >= text.len() {
            return None;
        }
        if WORD_SEPARATORS.contains(text[point.col]) {
            return None;
        }
        let mut start = point.col;
        while start > 0 && !WORD_SEPARATORS.contains(text[start - 1]) {
            start -= 1;
        }
        let mut end = point.col;
        while end + 1 < text.len() && !WORD_SEPARATORS.contains(text[end + 1]) {
            end += 1;
        }
        Some((GridPoint::new(point.row, start), GridPoint::new(point.row, end + 1)))
    }

    pub fn input_row(&self) -> GridPoint {
        GridPoint::new(self.cached_state.cursor.row as i64, self.cached_state.cursor.col as usize)
    }

    pub fn is_bracketed_paste_enabled(&self) -> bool {
        self.cached_state.mode.contains(ModeFlags::BRACKETED_PASTE)
    }

    pub fn is_kitty_keyboard_enabled(&self) -> bool {
        self.cached_state.mode.contains(ModeFlags::KITTY_KEYBOARD)
    }

    fn is_app_cursor_keys(&self) -> bool {
        self.cached_state.mode.contains(ModeFlags::APP_CURSOR_KEYS)
    }

    /// Translates a host key event into the PTY bytes this terminal's
    /// current mode expects, honouring application-cursor-keys mode for
    /// the arrow/Home/End family. The host calls this and forwards the
    /// result to `write`; there is no separate FFI entry point for key
    /// events, matching the byte-oriented `app_write` boundary.
    pub fn key_to_bytes(&self, key: crestterm_core::Key, modifiers: crestterm_core::Modifiers) -> Vec<u8> {
        use crestterm_core::Key;

        let app_cursor = self.is_app_cursor_keys();
        match key {
            Key::Char(c) => {
                if modifiers.ctrl && !modifiers.alt && !modifiers.meta {
                    let lower = c.to_ascii_lowercase();
                    if lower.is_ascii_lowercase() {
                        return vec![(lower as u8) - b'a' + 1];
                    }
                }
                let mut buf = [0u8; 4];
                let s = c.encode_utf8(&mut buf);
                let mut bytes = Vec::with_capacity(s.len() + 1);
                if modifiers.alt {
                    bytes.push(0x1b);
                }
                bytes.extend_from_slice(s.as_bytes());
                bytes
            }
            Key::Enter => vec![b'\r'],
            Key::Backspace => vec![0x7f],
            Key::Tab => {
                if modifiers.shift {
                    b"\x1b[Z".to_vec()
                } else {
                    vec![b'\t']
                }
            }
            Key::Escape => vec![0x1b],
            Key::Delete => b"\x1b[3~".to_vec(),
            Key::Insert => b"\x1b[2~".to_vec(),
            Key::Up => cursor_key_bytes(b'A', app_cursor),
            Key::Down => cursor_key_bytes(b'B', app_cursor),
            Key::Right => cursor_key_bytes(b'C', app_cursor),
            Key::Left => cursor_key_bytes(b'D', app_cursor),
            Key::Home => cursor_key_bytes(b'H', app_cursor),
            Key::End => cursor_key_bytes(b'F', app_cursor),
            Key::PageUp => b"\x1b[5~".to_vec(),
            Key::PageDown => b"\x1b[6~".to_vec(),
            Key::F(n) => function_key_bytes(n),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns `true` at most once per bell; clears the pending flag.
    pub fn take_bell(&mut self) -> bool {
        self.bell.swap(false, Ordering::Relaxed)
    }

    /// Returns the current window title if it changed since the last call.
    pub fn take_title_change(&mut self) -> Option<Option<String>> {
        let current = self.title.lock().ok()?.clone();
        if current == self.last_reported_title {
            return None;
        }
        self.last_reported_title = current.clone();
        Some(current)
    }

    pub fn exit_code(&self) -> Option<i32> {
        if self.closed {
            Some(0)
        } else {
            None
        }
    }
}

/// Waits for a child process to exit after `SIGHUP`, polling with
/// `waitpid`. Escalates to `SIGKILL` if it hasn't exited within 200ms.
fn cursor_key_bytes(final_byte: u8, app_cursor: bool) -> Vec<u8> {
    let prefix: &[u8] = if app_cursor { b"\x1bO" } else { b"\x1b[" };
    let mut out = prefix.to_vec();
    out.push(final_byte);
    out
}

fn function_key_bytes(n: u8) -> Vec<u8> {
    match n {
        1 => b"\x1bOP".to_vec(),
        2 => b"\x1bOQ".to_vec(),
        3 => b"\x1bOR".to_vec(),
        4 => b"\x1bOS".to_vec(),
        5 => b"\x1b[15~".to_vec(),
        6 => b"\x1b[17~".to_vec(),
        7 => b"\x1b[18~".to_vec(),
        8 => b"\x1b[19~".to_vec(),
        9 => b"\x1b[20~".to_vec(),
        10 => b"\x1b[21~".to_vec(),
        11 => b"\x1b[23~".to_vec(),
        12 => b"\x1b[24~".to_vec(),
        _ => Vec::new(),
    }
}

fn wait_for_child_exit(pid: u32) {
    use std::time::{Duration, Instant};

    let deadline = Instant::now() + Duration::from_millis(200);
    loop {
        let ret = unsafe { libc::waitpid(pid as i32, std::ptr::null_mut(), libc::WNOHANG) };
        if ret != 0 {
            return;
        }
        if Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    unsafe {
        libc::kill(-(pid as i32), libc::SIGKILL);
    }
    let kill_deadline = Instant::now() + Duration::from_millis(50);
    loop {
        let ret = unsafe { libc::waitpid(pid as i32, std::ptr::null_mut(), libc::WNOHANG) };
        if ret != 0 || Instant::now() >= kill_deadline {
            return;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if let Some(pid) = self.child_pid {
            unsafe {
                libc::kill(-(pid as i32), libc::SIGHUP);
            }
            wait_for_child_exit(pid);
        }

        self.sync_shutdown.store(true, Ordering::Relaxed);
        self.notify_sync_thread();
        if let Some(handle) = self._sync_join.take() {
            let _ = handle.join();
        }

        let _ = self.notifier.0.send(Msg::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_separators_exclude_alphanumerics_and_underscore() {
        for c in "abcZZ9_".chars() {
            assert!(!WORD_SEPARATORS.contains(c));
        }
        for c in " \t()[]\"".chars() {
            assert!(WORD_SEPARATORS.contains(c));
        }
    }

    #[test]
    fn cursor_keys_use_ss3_in_application_mode() {
        assert_eq!(cursor_key_bytes(b'A', false), b"\x1b[A");
        assert_eq!(cursor_key_bytes(b'A', true), b"\x1bOA");
    }

    #[test]
    fn function_key_bytes_cover_f1_through_f12() {
        assert_eq!(function_key_bytes(1), b"\x1bOP");
        assert_eq!(function_key_bytes(5), b"\x1b[15~");
        assert_eq!(function_key_bytes(12), b"\x1b[24~");
        assert!(function_key_bytes(20).is_empty());
    }
}
