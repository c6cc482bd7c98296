//! C-ABI surface over the Application Coordinator (§6): every exported
//! function takes an opaque `*mut AppHandle` first, returns a numeric
//! `ErrorCode`, and writes results through out-params. String and pixel
//! buffers are always caller-allocated: the host passes a buffer and its
//! capacity and gets back the number of bytes the value actually needs, so
//! ownership never crosses the FFI boundary for anything but the handle
//! itself.

use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::path::PathBuf;
use std::slice;

use crestterm_app::{Coordinator, CoordinatorError, FontSizeOp};
use crestterm_core::{AppConfig, AppEvent, Color, GridPoint, Rect, SelectionKind, Theme, TerminalId, TerminalMode};

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    NullPointer = 1,
    InvalidConfig = 2,
    InvalidUtf8 = 3,
    RenderError = 4,
    OutOfBounds = 5,
    NotFound = 6,
    Closed = 7,
}

impl From<CoordinatorError> for ErrorCode {
    fn from(e: CoordinatorError) -> Self {
        match e {
            CoordinatorError::NotFound => ErrorCode::NotFound,
            CoordinatorError::Closed => ErrorCode::Closed,
        }
    }
}

/// Event type tags delivered through the callback registered with
/// `app_set_event_callback`. `TitleChanged`/`CwdChanged` carry no string
/// inline — the callback fires first with `terminal_id` set, and the host
/// calls `app_take_event_string` immediately afterward (before the next
/// `app_tick`) to retrieve the payload.
pub const EVENT_WAKEUP: u32 = 0;
pub const EVENT_DAMAGED: u32 = 1;
pub const EVENT_TITLE_CHANGED: u32 = 2;
pub const EVENT_BELL: u32 = 3;
pub const EVENT_EXIT: u32 = 4;
pub const EVENT_CURSOR_BLINKING_CHANGE: u32 = 5;
pub const EVENT_CWD_CHANGED: u32 = 6;

pub type EventCallback = extern "C" fn(ctx: *mut c_void, event_type: u32, terminal_id: u64, data: u64);

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl From<FfiColor> for Color {
    fn from(c: FfiColor) -> Self {
        Color::new(c.r, c.g, c.b, c.a)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FfiTheme {
    pub ansi: [FfiColor; 16],
    pub default_fg: FfiColor,
    pub default_bg: FfiColor,
    pub selection: FfiColor,
    pub search_match: FfiColor,
    pub search_focused: FfiColor,
    pub cursor: FfiColor,
}

impl From<FfiTheme> for Theme {
    fn from(t: FfiTheme) -> Self {
        let mut ansi = [Color::BLACK; 16];
        for (dst, src) in ansi.iter_mut().zip(t.ansi.iter()) {
            *dst = (*src).into();
        }
        Theme {
            ansi,
            default_fg: t.default_fg.into(),
            default_bg: t.default_bg.into(),
            selection: t.selection.into(),
            search_match: t.search_match.into(),
            search_focused: t.search_focused.into(),
            cursor: t.cursor.into(),
        }
    }
}

/// FFI-layer simplification of `AppConfig`: a single primary font family
/// rather than the fallback list the Rust API accepts, since a C host has
/// no natural way to hand over a `Vec<String>` through a flat struct.
#[repr(C)]
pub struct FfiAppConfig {
    pub cols: u16,
    pub rows: u16,
    pub font_size: f32,
    pub line_height_factor: f32,
    pub scale: f32,
    pub window_width: u32,
    pub window_height: u32,
    pub history_size: usize,
    pub font_family: *const c_char,
    pub theme: FfiTheme,
}

#[repr(C)]
pub struct FfiCursorState {
    pub col: u16,
    pub row: u16,
    pub shape: u32,
    pub visible: bool,
    pub blink_enabled: bool,
}

#[repr(C)]
pub struct FfiFontMetrics {
    pub cell_width: f32,
    pub cell_height: f32,
    pub line_height: f32,
}

#[repr(C)]
pub struct FfiLayout {
    pub terminal_id: u64,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Opaque handle returned by `app_create`. Owns the `Coordinator`, the
/// registered event callback (if any), and a one-slot staging area for the
/// string payload of the most recent `TitleChanged`/`CwdChanged` event.
pub struct AppHandle {
    coordinator: Coordinator,
    callback: Option<(EventCallback, *mut c_void)>,
    pending_event_string: Option<String>,
}

// SAFETY: `ctx` is an opaque pointer the host supplies and is responsible
// for the thread-safety of; we only ever store and hand it back, never
// dereference it ourselves.
unsafe impl Send for AppHandle {}

fn write_cstr_out(s: &str, buf: *mut c_char, cap: usize, out_len: *mut usize) -> ErrorCode {
    if out_len.is_null() {
        return ErrorCode::NullPointer;
    }
    let bytes = s.as_bytes();
    unsafe {
        *out_len = bytes.len();
    }
    if cap == 0 {
        return if bytes.is_empty() { ErrorCode::Success } else { ErrorCode::OutOfBounds };
    }
    if buf.is_null() {
        return ErrorCode::NullPointer;
    }
    let n = bytes.len().min(cap - 1);
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf as *mut u8, n);
        *buf.add(n) = 0;
    }
    if n < bytes.len() {
        ErrorCode::OutOfBounds
    } else {
        ErrorCode::Success
    }
}

fn write_bytes_out(bytes: &[u8], buf: *mut u8, cap: usize, out_written: *mut usize) -> ErrorCode {
    if out_written.is_null() {
        return ErrorCode::NullPointer;
    }
    unsafe {
        *out_written = bytes.len();
    }
    if bytes.is_empty() {
        return ErrorCode::Success;
    }
    if buf.is_null() {
        return ErrorCode::NullPointer;
    }
    let n = bytes.len().min(cap);
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf, n);
    }
    if n < bytes.len() {
        ErrorCode::OutOfBounds
    } else {
        ErrorCode::Success
    }
}

unsafe fn cstr_to_string(ptr: *const c_char) -> Result<Option<String>, ErrorCode> {
    if ptr.is_null() {
        return Ok(None);
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Ok(Some(s.to_string())),
        Err(_) => Err(ErrorCode::InvalidUtf8),
    }
}

// ──────────────────────────────────────────────
// Lifecycle
// ──────────────────────────────────────────────

#[no_mangle]
pub unsafe extern "C" fn app_create(config: *const FfiAppConfig, out_handle: *mut *mut AppHandle) -> ErrorCode {
    if config.is_null() || out_handle.is_null() {
        return ErrorCode::NullPointer;
    }
    let ffi = &*config;
    let font_family = match cstr_to_string(ffi.font_family) {
        Ok(Some(s)) => s,
        Ok(None) => return ErrorCode::NullPointer,
        Err(e) => return e,
    };

    let app_config = AppConfig {
        cols: ffi.cols,
        rows: ffi.rows,
        font_size: ffi.font_size,
        line_height_factor: ffi.line_height_factor,
        scale: ffi.scale,
        window_width: ffi.window_width,
        window_height: ffi.window_height,
        history_size: ffi.history_size,
        font_families: vec![font_family],
        theme: ffi.theme.into(),
    };

    match Coordinator::new(&app_config) {
        Ok(coordinator) => {
            let handle = Box::new(AppHandle { coordinator, callback: None, pending_event_string: None });
            *out_handle = Box::into_raw(handle);
            ErrorCode::Success
        }
        Err(_) => ErrorCode::InvalidConfig,
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_destroy(handle: *mut AppHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_create_terminal(
    handle: *mut AppHandle,
    cols: u16,
    rows: u16,
    shell: *const c_char,
    cwd: *const c_char,
    out_id: *mut u64,
) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    if out_id.is_null() {
        return ErrorCode::NullPointer;
    }
    let shell = match cstr_to_string(shell) {
        Ok(s) => s,
        Err(e) => return e,
    };
    let cwd = match cstr_to_string(cwd) {
        Ok(s) => s.map(PathBuf::from),
        Err(e) => return e,
    };
    match handle.coordinator.create_terminal(cols, rows, shell, cwd) {
        Ok(id) => {
            *out_id = id;
            ErrorCode::Success
        }
        Err(_) => ErrorCode::InvalidConfig,
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_close_terminal(handle: *mut AppHandle, id: u64) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    if handle.coordinator.close_terminal(id) {
        ErrorCode::Success
    } else {
        ErrorCode::NotFound
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_set_mode(handle: *mut AppHandle, id: u64, mode: u32) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    let mode = if mode == 0 { TerminalMode::Active } else { TerminalMode::Background };
    match handle.coordinator.set_mode(id, mode) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

// ──────────────────────────────────────────────
// I/O
// ──────────────────────────────────────────────

#[no_mangle]
pub unsafe extern "C" fn app_write(handle: *mut AppHandle, id: u64, data: *const u8, len: usize) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    if data.is_null() && len > 0 {
        return ErrorCode::NullPointer;
    }
    let bytes = if len == 0 { &[] } else { slice::from_raw_parts(data, len) };
    if std::str::from_utf8(bytes).is_err() {
        return ErrorCode::InvalidUtf8;
    }
    match handle.coordinator.write(id, bytes) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_resize(handle: *mut AppHandle, id: u64, cols: u16, rows: u16) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    match handle.coordinator.resize(id, cols, rows) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_scroll(handle: *mut AppHandle, id: u64, delta: i32) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    match handle.coordinator.scroll(id, delta) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

// ──────────────────────────────────────────────
// Queries
// ──────────────────────────────────────────────

#[no_mangle]
pub unsafe extern "C" fn app_get_cursor(handle: *mut AppHandle, id: u64, out: *mut FfiCursorState) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    if out.is_null() {
        return ErrorCode::NullPointer;
    }
    match handle.coordinator.cursor(id) {
        Ok(cursor) => {
            *out = FfiCursorState {
                col: cursor.col,
                row: cursor.row,
                shape: cursor.shape as u32,
                visible: cursor.visible,
                blink_enabled: cursor.blink_enabled,
            };
            ErrorCode::Success
        }
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_get_cwd(
    handle: *mut AppHandle,
    id: u64,
    buf: *mut c_char,
    cap: usize,
    out_len: *mut usize,
) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    match handle.coordinator.cwd(id) {
        Ok(cwd) => {
            let text = cwd.map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
            write_cstr_out(&text, buf, cap, out_len)
        }
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_get_foreground_process_name(
    handle: *mut AppHandle,
    id: u64,
    buf: *mut c_char,
    cap: usize,
    out_len: *mut usize,
) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    match handle.coordinator.foreground_process_name(id) {
        Ok(name) => write_cstr_out(&name.unwrap_or_default(), buf, cap, out_len),
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_has_running_child_process(handle: *mut AppHandle, id: u64, out: *mut bool) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    if out.is_null() {
        return ErrorCode::NullPointer;
    }
    match handle.coordinator.has_running_child_process(id) {
        Ok(v) => {
            *out = v;
            ErrorCode::Success
        }
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_is_bracketed_paste_enabled(handle: *mut AppHandle, id: u64, out: *mut bool) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    if out.is_null() {
        return ErrorCode::NullPointer;
    }
    match handle.coordinator.is_bracketed_paste_enabled(id) {
        Ok(v) => {
            *out = v;
            ErrorCode::Success
        }
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_is_kitty_keyboard_enabled(handle: *mut AppHandle, id: u64, out: *mut bool) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    if out.is_null() {
        return ErrorCode::NullPointer;
    }
    match handle.coordinator.is_kitty_keyboard_enabled(id) {
        Ok(v) => {
            *out = v;
            ErrorCode::Success
        }
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_get_font_metrics(handle: *mut AppHandle, id: u64, out: *mut FfiFontMetrics) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    if out.is_null() {
        return ErrorCode::NullPointer;
    }
    match handle.coordinator.font_metrics(id) {
        Ok(m) => {
            *out = FfiFontMetrics { cell_width: m.cell_width, cell_height: m.cell_height, line_height: m.line_height };
            ErrorCode::Success
        }
        Err(e) => e.into(),
    }
}

// ──────────────────────────────────────────────
// Selection / search
// ──────────────────────────────────────────────

fn selection_kind_from_u32(kind: u32) -> SelectionKind {
    match kind {
        1 => SelectionKind::Semantic,
        2 => SelectionKind::Linewise,
        _ => SelectionKind::Simple,
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_start_selection(handle: *mut AppHandle, id: u64, row: i64, col: usize, kind: u32) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    let point = GridPoint::new(row, col);
    match handle.coordinator.start_selection(id, point, selection_kind_from_u32(kind)) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_update_selection(handle: *mut AppHandle, id: u64, row: i64, col: usize) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    match handle.coordinator.update_selection(id, GridPoint::new(row, col)) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_clear_selection(handle: *mut AppHandle, id: u64) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    match handle.coordinator.clear_selection(id) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_get_selection_text(
    handle: *mut AppHandle,
    id: u64,
    buf: *mut c_char,
    cap: usize,
    out_len: *mut usize,
) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    match handle.coordinator.selection_text(id) {
        Ok(text) => write_cstr_out(&text.unwrap_or_default(), buf, cap, out_len),
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_search(handle: *mut AppHandle, id: u64, pattern: *const c_char, out_count: *mut usize) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    if out_count.is_null() {
        return ErrorCode::NullPointer;
    }
    let pattern = match cstr_to_string(pattern) {
        Ok(Some(s)) => s,
        Ok(None) => return ErrorCode::NullPointer,
        Err(e) => return e,
    };
    match handle.coordinator.search(id, &pattern) {
        Ok(count) => {
            *out_count = count;
            ErrorCode::Success
        }
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_next_match(handle: *mut AppHandle, id: u64) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    match handle.coordinator.next_match(id) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_prev_match(handle: *mut AppHandle, id: u64) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    match handle.coordinator.prev_match(id) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_clear_search(handle: *mut AppHandle, id: u64) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    match handle.coordinator.clear_search(id) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

// ──────────────────────────────────────────────
// Render
// ──────────────────────────────────────────────

#[no_mangle]
pub unsafe extern "C" fn app_render(
    handle: *mut AppHandle,
    layouts: *const FfiLayout,
    layout_count: usize,
    surface_width: u32,
    surface_height: u32,
    surface_scale: f32,
    out_pixels: *mut u8,
    out_cap: usize,
    out_written: *mut usize,
    out_width: *mut u32,
    out_height: *mut u32,
) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    if layouts.is_null() && layout_count > 0 {
        return ErrorCode::NullPointer;
    }
    let layout_slice = if layout_count == 0 { &[] } else { slice::from_raw_parts(layouts, layout_count) };
    let layouts: Vec<(TerminalId, Rect)> =
        layout_slice.iter().map(|l| (l.terminal_id, Rect::new(l.x, l.y, l.width, l.height))).collect();

    match handle.coordinator.render(&layouts, surface_width, surface_height, surface_scale, None) {
        Ok(image) => {
            if !out_width.is_null() {
                *out_width = image.width;
            }
            if !out_height.is_null() {
                *out_height = image.height;
            }
            write_bytes_out(&image.pixels, out_pixels, out_cap, out_written)
        }
        Err(CoordinatorError::NotFound) => ErrorCode::NotFound,
        Err(CoordinatorError::Closed) => ErrorCode::Closed,
    }
}

#[no_mangle]
pub unsafe extern "C" fn app_change_font_size(handle: *mut AppHandle, op: u32) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    let op = match op {
        1 => FontSizeOp::Decrease,
        2 => FontSizeOp::Increase,
        _ => FontSizeOp::Reset,
    };
    handle.coordinator.change_font_size(op);
    ErrorCode::Success
}

// ──────────────────────────────────────────────
// Events
// ──────────────────────────────────────────────

#[no_mangle]
pub unsafe extern "C" fn app_set_event_callback(handle: *mut AppHandle, callback: EventCallback, ctx: *mut c_void) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    handle.callback = Some((callback, ctx));
    ErrorCode::Success
}

/// Drains pending events and invokes the registered callback once per
/// event, in arrival order. A no-op (but still `Success`) when no callback
/// is registered, so a host can call this unconditionally on every tick.
#[no_mangle]
pub unsafe extern "C" fn app_tick(handle: *mut AppHandle) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    let events = handle.coordinator.tick();
    let Some((callback, ctx)) = handle.callback else { return ErrorCode::Success };

    for event in events {
        let (event_type, terminal_id, data) = match event {
            AppEvent::Wakeup => (EVENT_WAKEUP, 0, 0),
            AppEvent::Damaged(id) => (EVENT_DAMAGED, id, 0),
            AppEvent::TitleChanged(id, text) => {
                handle.pending_event_string = Some(text);
                (EVENT_TITLE_CHANGED, id, 0)
            }
            AppEvent::Bell(id) => (EVENT_BELL, id, 0),
            AppEvent::Exit(id, status) => (EVENT_EXIT, id, status.code as i64 as u64),
            AppEvent::CursorBlinkingChange(id, blinking) => (EVENT_CURSOR_BLINKING_CHANGE, id, blinking as u64),
            AppEvent::CwdChanged(id, path) => {
                handle.pending_event_string = Some(path.to_string_lossy().into_owned());
                (EVENT_CWD_CHANGED, id, 0)
            }
        };
        callback(ctx, event_type, terminal_id, data);
    }
    ErrorCode::Success
}

/// Retrieves the string payload staged by the most recent
/// `TitleChanged`/`CwdChanged` event delivered to the callback. Valid only
/// until the next `app_tick` call.
#[no_mangle]
pub unsafe extern "C" fn app_take_event_string(
    handle: *mut AppHandle,
    buf: *mut c_char,
    cap: usize,
    out_len: *mut usize,
) -> ErrorCode {
    let Some(handle) = handle.as_mut() else { return ErrorCode::NullPointer };
    let text = handle.pending_event_string.take().unwrap_or_default();
    write_cstr_out(&text, buf, cap, out_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    fn sample_theme() -> FfiTheme {
        let c = FfiColor { r: 0.1, g: 0.2, b: 0.3, a: 1.0 };
        FfiTheme {
            ansi: [c; 16],
            default_fg: c,
            default_bg: c,
            selection: c,
            search_match: c,
            search_focused: c,
            cursor: c,
        }
    }

    fn sample_config(family: &CString) -> FfiAppConfig {
        FfiAppConfig {
            cols: 80,
            rows: 24,
            font_size: 14.0,
            line_height_factor: 1.2,
            scale: 1.0,
            window_width: 800,
            window_height: 600,
            history_size: 1000,
            font_family: family.as_ptr(),
            theme: sample_theme(),
        }
    }

    #[test]
    fn create_destroy_round_trip() {
        let family = CString::new("monospace").unwrap();
        let config = sample_config(&family);
        let mut handle: *mut AppHandle = std::ptr::null_mut();
        unsafe {
            assert_eq!(app_create(&config, &mut handle), ErrorCode::Success);
            assert!(!handle.is_null());
            app_destroy(handle);
        }
    }

    #[test]
    fn null_handle_is_rejected_everywhere() {
        unsafe {
            let mut out = 0u64;
            assert_eq!(app_create_terminal(std::ptr::null_mut(), 80, 24, std::ptr::null(), std::ptr::null(), &mut out), ErrorCode::NullPointer);
            assert_eq!(app_close_terminal(std::ptr::null_mut(), 1), ErrorCode::NullPointer);
        }
    }

    #[test]
    fn unknown_terminal_query_returns_not_found() {
        let family = CString::new("monospace").unwrap();
        let config = sample_config(&family);
        let mut handle: *mut AppHandle = std::ptr::null_mut();
        unsafe {
            assert_eq!(app_create(&config, &mut handle), ErrorCode::Success);
            let mut cursor = FfiCursorState { col: 0, row: 0, shape: 0, visible: false, blink_enabled: false };
            assert_eq!(app_get_cursor(handle, 999, &mut cursor), ErrorCode::NotFound);
            app_destroy(handle);
        }
    }

    #[test]
    fn buffer_too_small_reports_out_of_bounds_but_still_reports_needed_length() {
        let mut out_len = 0usize;
        let mut tiny = [0 as c_char; 2];
        let code = write_cstr_out("hello", tiny.as_mut_ptr(), tiny.len(), &mut out_len);
        assert_eq!(code, ErrorCode::OutOfBounds);
        assert_eq!(out_len, 5);
    }
}
