//! Owns the `TerminalId -> Terminal` map and exposes the command/query
//! surface a host drives: create/close terminals, route writes and
//! selection/search commands, drain events, and render a frame.

use std::collections::HashMap;
use std::path::PathBuf;

use crestterm_core::{
    AppConfig, AppEvent, ExitStatus, GridPoint, InputEvent, Key, Rect, SelectionKind, TerminalId,
    TerminalMode, Theme,
};
use crestterm_render::compositor::{Compositor, FinalImage, Glow};
use crestterm_render::Renderer;
use crestterm_terminal::Terminal;

/// Mirrors the FFI boundary's closed numeric error set (§6) one level up;
/// the FFI crate maps these onto `ErrorCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorError {
    NotFound,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSizeOp {
    Reset,
    Decrease,
    Increase,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub cell_width: f32,
    pub cell_height: f32,
    pub line_height: f32,
}

const FONT_SIZE_STEP: f32 = 1.0;
const FONT_SIZE_MIN: f32 = 8.0;
const FONT_SIZE_MAX: f32 = 32.0;

struct Entry {
    terminal: Terminal,
    renderer: Renderer,
    mode: TerminalMode,
    last_cwd: Option<PathBuf>,
    exit_reported: bool,
}

pub struct Coordinator {
    terminals: HashMap<TerminalId, Entry>,
    next_id: TerminalId,
    theme: Theme,
    scale: f32,
    font_size: f32,
    base_font_size: f32,
    line_height_factor: f32,
    history_size: usize,
}

impl Coordinator {
    pub fn new(config: &AppConfig) -> Result<Self, &'static str> {
        config.validate()?;
        Ok(Self {
            terminals: HashMap::new(),
            next_id: 1,
            theme: config.theme.clone(),
            scale: config.scale,
            font_size: config.font_size,
            base_font_size: config.font_size,
            line_height_factor: config.line_height_factor,
            history_size: config.history_size,
        })
    }

    pub fn create_terminal(
        &mut self,
        cols: u16,
        rows: u16,
        shell: Option<String>,
        cwd: Option<PathBuf>,
    ) -> Result<TerminalId, Box<dyn std::error::Error>> {
        let terminal = Terminal::with_cwd(cols, rows, shell, cwd, self.theme.clone(), self.history_size)?;
        let renderer = Renderer::new(self.font_size, self.scale);
        let id = self.next_id;
        self.next_id += 1;
        self.terminals.insert(
            id,
            Entry { terminal, renderer, mode: TerminalMode::Active, last_cwd: None, exit_reported: false },
        );
        Ok(id)
    }

    /// Drops the terminal from the map; `Terminal::drop` tears down its PTY
    /// and sync thread. Returns `false` for an unknown id.
    pub fn close_terminal(&mut self, id: TerminalId) -> bool {
        self.terminals.remove(&id).is_some()
    }

    pub fn set_mode(&mut self, id: TerminalId, mode: TerminalMode) -> Result<(), CoordinatorError> {
        let entry = self.terminals.get_mut(&id).ok_or(CoordinatorError::NotFound)?;
        entry.mode = mode;
        entry.terminal.set_mode(mode);
        Ok(())
    }

    /// Drains bell/title/exit/cwd-change events accumulated since the last
    /// call, across every terminal, in map-iteration (merge-arrival) order.
    pub fn tick(&mut self) -> Vec<AppEvent> {
        let mut events = Vec::new();
        for (&id, entry) in self.terminals.iter_mut() {
            // Background terminals keep parsing but do not raise content
            // damage as a dirty signal — only bell/exit/title below do.
            if entry.mode == TerminalMode::Active && entry.terminal.has_new_output() {
                events.push(AppEvent::Damaged(id));
                events.push(AppEvent::Wakeup);
            }

            if entry.terminal.take_bell() {
                events.push(AppEvent::Bell(id));
                events.push(AppEvent::Wakeup);
            }

            if let Some(title) = entry.terminal.take_title_change() {
                if let Some(title) = title {
                    events.push(AppEvent::TitleChanged(id, title));
                    events.push(AppEvent::Wakeup);
                }
            }

            let cwd = entry.terminal.cwd();
            if cwd != entry.last_cwd {
                if let Some(ref path) = cwd {
                    events.push(AppEvent::CwdChanged(id, path.clone()));
                    events.push(AppEvent::Wakeup);
                }
                entry.last_cwd = cwd;
            }

            if entry.terminal.is_closed() && !entry.exit_reported {
                entry.exit_reported = true;
                let code = entry.terminal.exit_code().unwrap_or(0);
                events.push(AppEvent::Exit(id, ExitStatus { code }));
                events.push(AppEvent::Wakeup);
            }
        }
        events
    }

    pub fn render(
        &mut self,
        layouts: &[(TerminalId, Rect)],
        surface_width: u32,
        surface_height: u32,
        surface_scale: f32,
        glow: Option<(TerminalId, Glow)>,
    ) -> Result<FinalImage, CoordinatorError> {
        let mut frames = Vec::with_capacity(layouts.len());
        for &(id, rect) in layouts {
            let entry = self.terminals.get_mut(&id).ok_or(CoordinatorError::NotFound)?;
            let state = entry.terminal.snapshot();
            let frame = entry.renderer.render(&state, &self.theme, surface_scale);
            frames.push((rect, frame));
        }

        let layers: Vec<(Rect, &crestterm_core::Frame)> = frames.iter().map(|(r, f)| (*r, f)).collect();
        let glow = glow.and_then(|(id, g)| {
            layouts.iter().find(|(lid, _)| *lid == id).map(|_| g)
        });
        Ok(Compositor::compose(&layers, surface_width, surface_height, surface_scale, glow.as_ref()))
    }

    pub fn write(&mut self, id: TerminalId, bytes: &[u8]) -> Result<(), CoordinatorError> {
        let entry = self.terminals.get_mut(&id).ok_or(CoordinatorError::NotFound)?;
        entry.terminal.write(bytes).map_err(|_| CoordinatorError::Closed)
    }

    /// Translates a host key event and forwards the resulting bytes.
    pub fn send_key(&mut self, id: TerminalId, key: Key, modifiers: crestterm_core::Modifiers) -> Result<(), CoordinatorError> {
        let entry = self.terminals.get(&id).ok_or(CoordinatorError::NotFound)?;
        let bytes = entry.terminal.key_to_bytes(key, modifiers);
        self.write(id, &bytes)
    }

    pub fn resize(&mut self, id: TerminalId, cols: u16, rows: u16) -> Result<(), CoordinatorError> {
        let entry = self.terminals.get_mut(&id).ok_or(CoordinatorError::NotFound)?;
        entry.terminal.resize(cols, rows).map_err(|_| CoordinatorError::Closed)?;
        entry.renderer.invalidate_resize();
        Ok(())
    }

    pub fn scroll(&mut self, id: TerminalId, delta: i32) -> Result<(), CoordinatorError> {
        let entry = self.terminals.get_mut(&id).ok_or(CoordinatorError::NotFound)?;
        entry.terminal.scroll(delta);
        Ok(())
    }

    pub fn start_selection(&mut self, id: TerminalId, point: GridPoint, kind: SelectionKind) -> Result<(), CoordinatorError> {
        let entry = self.terminals.get_mut(&id).ok_or(CoordinatorError::NotFound)?;
        entry.terminal.start_selection(point, kind);
        Ok(())
    }

    pub fn update_selection(&mut self, id: TerminalId, point: GridPoint) -> Result<(), CoordinatorError> {
        let entry = self.terminals.get_mut(&id).ok_or(CoordinatorError::NotFound)?;
        entry.terminal.update_selection(point);
        Ok(())
    }

    pub fn clear_selection(&mut self, id: TerminalId) -> Result<(), CoordinatorError> {
        let entry = self.terminals.get_mut(&id).ok_or(CoordinatorError::NotFound)?;
        entry.terminal.clear_selection();
        Ok(())
    }

    pub fn selection_text(&self, id: TerminalId) -> Result<Option<String>, CoordinatorError> {
        let entry = self.terminals.get(&id).ok_or(CoordinatorError::NotFound)?;
        Ok(entry.terminal.selection_text())
    }

    pub fn search(&mut self, id: TerminalId, pattern: &str) -> Result<usize, CoordinatorError> {
        let entry = self.terminals.get_mut(&id).ok_or(CoordinatorError::NotFound)?;
        Ok(entry.terminal.search(pattern))
    }

    pub fn next_match(&mut self, id: TerminalId) -> Result<(), CoordinatorError> {
        let entry = self.terminals.get_mut(&id).ok_or(CoordinatorError::NotFound)?;
        entry.terminal.next_match();
        Ok(())
    }

    pub fn prev_match(&mut self, id: TerminalId) -> Result<(), CoordinatorError> {
        let entry = self.terminals.get_mut(&id).ok_or(CoordinatorError::NotFound)?;
        entry.terminal.prev_match();
        Ok(())
    }

    pub fn clear_search(&mut self, id: TerminalId) -> Result<(), CoordinatorError> {
        let entry = self.terminals.get_mut(&id).ok_or(CoordinatorError::NotFound)?;
        entry.terminal.clear_search();
        Ok(())
    }

    pub fn cursor(&self, id: TerminalId) -> Result<crestterm_core::CursorState, CoordinatorError> {
        let entry = self.terminals.get(&id).ok_or(CoordinatorError::NotFound)?;
        Ok(entry.terminal.cursor())
    }

    pub fn cwd(&mut self, id: TerminalId) -> Result<Option<PathBuf>, CoordinatorError> {
        let entry = self.terminals.get_mut(&id).ok_or(CoordinatorError::NotFound)?;
        Ok(entry.terminal.cwd())
    }

    pub fn foreground_process_name(&self, id: TerminalId) -> Result<Option<String>, CoordinatorError> {
        let entry = self.terminals.get(&id).ok_or(CoordinatorError::NotFound)?;
        Ok(entry.terminal.foreground_process_name())
    }

    pub fn has_running_child_process(&self, id: TerminalId) -> Result<bool, CoordinatorError> {
        let entry = self.terminals.get(&id).ok_or(CoordinatorError::NotFound)?;
        Ok(entry.terminal.is_running_child_process())
    }

    pub fn is_bracketed_paste_enabled(&self, id: TerminalId) -> Result<bool, CoordinatorError> {
        let entry = self.terminals.get(&id).ok_or(CoordinatorError::NotFound)?;
        Ok(entry.terminal.is_bracketed_paste_enabled())
    }

    pub fn is_kitty_keyboard_enabled(&self, id: TerminalId) -> Result<bool, CoordinatorError> {
        let entry = self.terminals.get(&id).ok_or(CoordinatorError::NotFound)?;
        Ok(entry.terminal.is_kitty_keyboard_enabled())
    }

    pub fn font_metrics(&self, id: TerminalId) -> Result<FontMetrics, CoordinatorError> {
        let entry = self.terminals.get(&id).ok_or(CoordinatorError::NotFound)?;
        let size = entry.renderer.cell_size();
        Ok(FontMetrics {
            cell_width: size.width,
            cell_height: size.height,
            line_height: size.height * self.line_height_factor,
        })
    }

    /// Steps the configured font size, clamped to 8.0-32.0pt, and
    /// invalidates every terminal's glyph atlas and line cache — the same
    /// chain the Renderer itself runs on a direct `set_font_size` call.
    pub fn change_font_size(&mut self, op: FontSizeOp) {
        self.font_size = match op {
            FontSizeOp::Reset => self.base_font_size,
            FontSizeOp::Decrease => (self.font_size - FONT_SIZE_STEP).max(FONT_SIZE_MIN),
            FontSizeOp::Increase => (self.font_size + FONT_SIZE_STEP).min(FONT_SIZE_MAX),
        };
        for entry in self.terminals.values_mut() {
            entry.renderer.set_font_size(self.font_size);
        }
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Routes host-reported input to the addressed terminal: key events
    /// translate to PTY bytes via `Terminal::key_to_bytes`; mouse events
    /// outside of a resize are not yet meaningfully routed (no terminal
    /// currently requests mouse reporting bytes back from this coordinator
    /// — hosts that need raw SGR mouse sequences compose them from
    /// `Terminal::mode()` themselves).
    pub fn send_input(&mut self, id: TerminalId, event: InputEvent) -> Result<(), CoordinatorError> {
        match event {
            InputEvent::KeyPress { key, modifiers } => self.send_key(id, key, modifiers),
            InputEvent::Resize { size } => {
                let entry = self.terminals.get(&id).ok_or(CoordinatorError::NotFound)?;
                let cell = entry.renderer.cell_size();
                let cols = (size.width / cell.width.max(1.0)).floor().max(1.0) as u16;
                let rows = (size.height / cell.height.max(1.0)).floor().max(1.0) as u16;
                self.resize(id, cols, rows)
            }
            InputEvent::MouseScroll { delta, .. } => self.scroll(id, delta.round() as i32),
            InputEvent::MouseClick { .. } | InputEvent::MouseMove { .. } | InputEvent::MouseDrag { .. } => {
                self.terminals.get(&id).ok_or(CoordinatorError::NotFound)?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig { cols: 10, rows: 4, ..AppConfig::default() }
    }

    #[test]
    fn unknown_terminal_returns_not_found() {
        let mut coord = Coordinator::new(&config()).unwrap();
        assert_eq!(coord.write(999, b"x").unwrap_err(), CoordinatorError::NotFound);
        assert_eq!(coord.resize(999, 10, 10).unwrap_err(), CoordinatorError::NotFound);
        assert_eq!(coord.scroll(999, 1).unwrap_err(), CoordinatorError::NotFound);
    }

    #[test]
    fn font_size_steps_clamp_and_reset() {
        let mut coord = Coordinator::new(&config()).unwrap();
        assert_eq!(coord.font_size(), 14.0);
        for _ in 0..40 {
            coord.change_font_size(FontSizeOp::Increase);
        }
        assert_eq!(coord.font_size(), FONT_SIZE_MAX);
        for _ in 0..60 {
            coord.change_font_size(FontSizeOp::Decrease);
        }
        assert_eq!(coord.font_size(), FONT_SIZE_MIN);
        coord.change_font_size(FontSizeOp::Reset);
        assert_eq!(coord.font_size(), 14.0);
    }

    #[test]
    fn closing_unknown_terminal_is_a_no_op_false() {
        let mut coord = Coordinator::new(&config()).unwrap();
        assert!(!coord.close_terminal(42));
    }
}
