use std::path::PathBuf;

use crate::TerminalId;

/// A terminal's mode with respect to the Scheduler (§4.3, §4.6): terminals
/// in `Background` still parse bytes correctly but do not raise damage
/// events or cursor-blink events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalMode {
    Active,
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    pub code: i32,
}

/// Events drained by `Application::tick()` and mirrored onto the FFI
/// callback's tagged union (§6). This set is kept a superset of what a
/// host-side session recorder would need (§9 open question), even though
/// recording itself is out of scope for the core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Wakeup,
    Damaged(TerminalId),
    TitleChanged(TerminalId, String),
    Bell(TerminalId),
    Exit(TerminalId, ExitStatus),
    CursorBlinkingChange(TerminalId, bool),
    CwdChanged(TerminalId, PathBuf),
}
