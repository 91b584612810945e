//! Status bar: bottom line with server, focused pane and keybindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::ComponentId;
use crate::theme::{C_ACCENT, C_MUTED, C_PRIMARY, C_SECONDARY, C_SEPARATOR};

/// Draw a horizontal separator line.
pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

fn key_hints(focus: ComponentId) -> &'static [(&'static str, &'static str)] {
    match focus {
        ComponentId::LocalList => &[
            ("a", "add to spotify"),
            ("r", "reload"),
            ("tab", "switch"),
            ("q", "quit"),
        ],
        ComponentId::SpotifyList => &[
            ("t", "target"),
            ("m", "merge"),
            ("spc", "mark"),
            ("M", "merge marked"),
            ("y", "copy url"),
            ("r", "reload"),
            ("tab", "switch"),
            ("q", "quit"),
        ],
    }
}

/// Draw the keybindings footer bar (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, focus: ComponentId, server: &str, active: usize) {
    let label = match focus {
        ComponentId::LocalList => "FILES",
        ComponentId::SpotifyList => "SPOTIFY",
    };

    let mut spans = vec![Span::styled(
        format!(" {} ", label),
        Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
    )];
    for (key, what) in key_hints(focus) {
        spans.push(Span::styled(format!(" {}", key), Style::default().fg(C_ACCENT)));
        spans.push(Span::styled(format!(" {}", what), Style::default().fg(C_SECONDARY)));
    }

    let mut right = server.to_string();
    if active > 0 {
        right = format!("{} running · {}", active, right);
    }
    let used: usize = spans.iter().map(|s| s.width()).sum();
    let pad = (area.width as usize).saturating_sub(used + right.chars().count() + 1);
    spans.push(Span::raw(" ".repeat(pad)));
    spans.push(Span::styled(right, Style::default().fg(C_MUTED)));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
