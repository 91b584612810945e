//! Colors and styles for the playlist TUI.
//!
//! Task colors follow the progress bar convention of the web client: amber
//! while a job runs or finished with a warning, Spotify green when done, red
//! on failure. Toasts reuse the same colors so a finished job and its toast
//! match.

use playlist_proto::protocol::TaskStatus;
use ratatui::style::{Color, Modifier, Style};

// ── Base palette ──────────────────────────────────────────────────────────────

pub const C_ACCENT: Color = Color::Rgb(255, 95, 95);
pub const C_MUTED: Color = Color::Rgb(72, 72, 88);
pub const C_SEPARATOR: Color = Color::Rgb(40, 40, 52);
pub const C_SECONDARY: Color = Color::Rgb(115, 115, 138);
pub const C_PRIMARY: Color = Color::Rgb(210, 210, 225);
pub const C_SELECTION_BG: Color = Color::Rgb(28, 28, 40);
pub const C_PANEL_BORDER: Color = Color::Rgb(40, 40, 52);
pub const C_PANEL_BORDER_FOCUSED: Color = Color::Rgb(120, 100, 200);
pub const C_NUMBER_HINT: Color = Color::Rgb(90, 90, 115);

// ── Tasks and playlists ───────────────────────────────────────────────────────

pub const C_SPOTIFY: Color = Color::Rgb(29, 185, 84);
pub const C_PROCESSING: Color = Color::Rgb(255, 184, 80);
pub const C_ERROR: Color = Color::Rgb(255, 80, 80);
/// Merge target marker.
pub const C_TARGET: Color = Color::Rgb(180, 120, 220);
/// Sources marked for a batch merge.
pub const C_MARKED: Color = Color::Rgb(255, 210, 50);

pub const C_TOAST_INFO: Color = Color::Rgb(80, 160, 220);
pub const C_TOAST_SUCCESS: Color = C_SPOTIFY;
pub const C_TOAST_WARNING: Color = C_PROCESSING;
pub const C_TOAST_ERROR: Color = C_ERROR;

pub fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Processing | TaskStatus::CompletedWithWarning => C_PROCESSING,
        TaskStatus::Completed => C_SPOTIFY,
        TaskStatus::Error => C_ERROR,
    }
}

// ── Predefined styles ─────────────────────────────────────────────────────────

pub fn style_default() -> Style {
    Style::default().fg(C_PRIMARY)
}

pub fn style_secondary() -> Style {
    Style::default().fg(C_SECONDARY)
}

pub fn style_muted() -> Style {
    Style::default().fg(C_MUTED)
}

/// Row style for a list entry, by selection and pane focus.
pub fn style_row(is_selected: bool, focused: bool) -> Style {
    match (is_selected, focused) {
        (true, true) => Style::default()
            .bg(C_SELECTION_BG)
            .fg(C_PRIMARY)
            .add_modifier(Modifier::BOLD),
        (true, false) => Style::default().bg(C_SELECTION_BG).fg(C_PRIMARY),
        _ => style_default(),
    }
}

pub fn style_status(status: TaskStatus) -> Style {
    Style::default().fg(status_color(status))
}

pub fn style_target() -> Style {
    Style::default().fg(C_TARGET).add_modifier(Modifier::BOLD)
}

pub fn style_marked() -> Style {
    Style::default().fg(C_MARKED)
}

pub fn style_error() -> Style {
    Style::default().fg(C_ERROR)
}

/// Pane border: red while the pane's catalog failed to load, whatever the focus.
pub fn style_border(focused: bool, failed: bool) -> Style {
    match (failed, focused) {
        (true, _) => style_error(),
        (false, true) => Style::default().fg(C_PANEL_BORDER_FOCUSED),
        (false, false) => Style::default().fg(C_PANEL_BORDER),
    }
}
