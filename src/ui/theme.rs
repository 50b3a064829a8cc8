//! Kiosk theme
//!
//! Dark palette meant to sit unobtrusively next to a fullscreen video, with
//! loud status colors so a failing stream is visible across the room.

use ratatui::style::{Color, Modifier, Style};

use crate::models::PlaybackStatus;

pub struct Theme;

impl Theme {
    // ═══════════════════════════════════════════════════════════════════════
    // PALETTE
    // ═══════════════════════════════════════════════════════════════════════

    /// #0a0a0f
    pub const BACKGROUND: Color = Color::Rgb(0x0a, 0x0a, 0x0f);
    /// #14141e, panels and the status bar
    pub const PANEL: Color = Color::Rgb(0x14, 0x14, 0x1e);
    /// #00fff2
    pub const PRIMARY: Color = Color::Rgb(0x00, 0xff, 0xf2);
    /// #ffff00
    pub const ACCENT: Color = Color::Rgb(0xff, 0xff, 0x00);
    /// #e0e0e0
    pub const TEXT: Color = Color::Rgb(0xe0, 0xe0, 0xe0);
    /// #8a8a9a
    pub const MUTED: Color = Color::Rgb(0x8a, 0x8a, 0x9a);
    /// #008078
    pub const BORDER: Color = Color::Rgb(0x00, 0x80, 0x78);
    /// #00ff00
    pub const PLAYING: Color = Color::Rgb(0x00, 0xff, 0x00);
    /// #ffaa00
    pub const LOADING: Color = Color::Rgb(0xff, 0xaa, 0x00);
    /// #ff0040
    pub const ISSUE: Color = Color::Rgb(0xff, 0x00, 0x40);

    // ═══════════════════════════════════════════════════════════════════════
    // STYLES
    // ═══════════════════════════════════════════════════════════════════════

    pub fn text() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::BACKGROUND)
    }

    pub fn muted() -> Style {
        Style::default().fg(Self::MUTED)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn accent() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    /// Border of the offline screen
    pub fn border_issue() -> Style {
        Style::default()
            .fg(Self::ISSUE)
            .add_modifier(Modifier::BOLD)
    }

    pub fn error() -> Style {
        Style::default()
            .fg(Self::ISSUE)
            .add_modifier(Modifier::BOLD)
    }

    pub fn keybind() -> Style {
        Style::default().fg(Self::ACCENT)
    }

    pub fn keybind_desc() -> Style {
        Style::default().fg(Self::MUTED)
    }

    pub fn status_bar() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::PANEL)
    }

    /// Badge color tracks playback status
    pub fn status(status: PlaybackStatus) -> Style {
        let bg = match status {
            PlaybackStatus::Loading => Self::LOADING,
            PlaybackStatus::Ready => Self::PLAYING,
            PlaybackStatus::Failed => Self::ISSUE,
        };
        Style::default()
            .fg(Self::BACKGROUND)
            .bg(bg)
            .add_modifier(Modifier::BOLD)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CONTRAST
// ═══════════════════════════════════════════════════════════════════════════

/// WCAG relative luminance
pub fn relative_luminance(r: u8, g: u8, b: u8) -> f64 {
    fn linear(c: u8) -> f64 {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }

    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

/// 1.0 for identical colors up to 21.0 for black on white
pub fn contrast_ratio(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> f64 {
    let a = relative_luminance(fg.0, fg.1, fg.2);
    let b = relative_luminance(bg.0, bg.1, bg.2);
    let (hi, lo) = if a > b { (a, b) } else { (b, a) };
    (hi + 0.05) / (lo + 0.05)
}

pub fn color_to_rgb(color: Color) -> Option<(u8, u8, u8)> {
    match color {
        Color::Rgb(r, g, b) => Some((r, g, b)),
        _ => None,
    }
}
