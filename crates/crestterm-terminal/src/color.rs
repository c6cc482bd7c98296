// Colour resolution: ANSI name / 256-index / true-colour -> crestterm_core::Color.
//
// Named and 0-15 indexed colours resolve through the host-supplied Theme
// (§4.4.4) rather than a hardcoded palette; 16-255 fall back to the
// 6x6x6 cube / grayscale ramp unless the terminal has received an OSC
// palette-set for that index.

use alacritty_terminal::vte::ansi::{Color as AnsiColor, NamedColor, Rgb as AnsiRgb};

use crestterm_core::{indexed_color_cube, indexed_color_grayscale, Color, Theme};

pub(crate) fn named_color_to_rgb(theme: &Theme, named: NamedColor) -> Color {
    match named {
        NamedColor::Black => theme.ansi[0],
        NamedColor::Red => theme.ansi[1],
        NamedColor::Green => theme.ansi[2],
        NamedColor::Yellow => theme.ansi[3],
        NamedColor::Blue => theme.ansi[4],
        NamedColor::Magenta => theme.ansi[5],
        NamedColor::Cyan => theme.ansi[6],
        NamedColor::White => theme.ansi[7],
        NamedColor::BrightBlack => theme.ansi[8],
        NamedColor::BrightRed => theme.ansi[9],
        NamedColor::BrightGreen => theme.ansi[10],
        NamedColor::BrightYellow => theme.ansi[11],
        NamedColor::BrightBlue => theme.ansi[12],
        NamedColor::BrightMagenta => theme.ansi[13],
        NamedColor::BrightCyan => theme.ansi[14],
        NamedColor::BrightWhite => theme.ansi[15],
        NamedColor::Foreground => theme.default_fg,
        NamedColor::Background => theme.default_bg,
        _ => theme.default_fg,
    }
}

fn index_to_named(idx: u8) -> NamedColor {
    match idx {
        0 => NamedColor::Black,
        1 => NamedColor::Red,
        2 => NamedColor::Green,
        3 => NamedColor::Yellow,
        4 => NamedColor::Blue,
        5 => NamedColor::Magenta,
        6 => NamedColor::Cyan,
        7 => NamedColor::White,
        8 => NamedColor::BrightBlack,
        9 => NamedColor::BrightRed,
        10 => NamedColor::BrightGreen,
        11 => NamedColor::BrightYellow,
        12 => NamedColor::BrightBlue,
        13 => NamedColor::BrightMagenta,
        14 => NamedColor::BrightCyan,
        15 => NamedColor::BrightWhite,
        _ => NamedColor::Foreground,
    }
}

/// Fallback for an indexed colour the terminal never received an OSC
/// palette-set for: 16-231 is the 6x6x6 cube, 232-255 the grayscale ramp.
pub(crate) fn indexed_color_fallback(idx: u8) -> Color {
    match idx {
        16..=231 => indexed_color_cube(idx),
        _ => indexed_color_grayscale(idx),
    }
}

/// Resolve an `alacritty_terminal` colour using the active theme and the
/// terminal's own OSC-palette overrides (pre-copied out from under the
/// `Term` lock by the grid sync thread, see `GridSyncer::sync`).
pub(crate) fn convert_color(theme: &Theme, color: &AnsiColor, palette: &[Option<AnsiRgb>; 256]) -> Color {
    match color {
        AnsiColor::Named(named) => named_color_to_rgb(theme, *named),
        AnsiColor::Spec(rgb) => Color::rgb(
            rgb.r as f32 / 255.0,
            rgb.g as f32 / 255.0,
            rgb.b as f32 / 255.0,
        ),
        AnsiColor::Indexed(idx) => {
            if *idx < 16 {
                return named_color_to_rgb(theme, index_to_named(*idx));
            }
            if let Some(rgb) = palette[*idx as usize] {
                Color::rgb(rgb.r as f32 / 255.0, rgb.g as f32 / 255.0, rgb.b as f32 / 255.0)
            } else {
                indexed_color_fallback(*idx)
            }
        }
    }
}
