//! Bordered pane for a catalog view: `[N] title · load state` plus a badge.

use crate::catalog::LoadState;
use crate::theme::{style_border, style_error, style_muted, C_MUTED, C_NUMBER_HINT, C_PRIMARY};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders},
};

/// Shown right-aligned in the pane header (e.g. "2 ACTIVE", "→ Morning").
pub struct Badge<'a> {
    pub text: &'a str,
    pub color: Color,
}

/// Header suffix describing where the pane's catalog load stands.
pub fn load_suffix<T>(load: &LoadState<T>) -> String {
    match load {
        LoadState::Loading => "loading…".to_string(),
        LoadState::Loaded { items, loaded_at } => {
            format!("{} · {}", items.len(), loaded_at.format("%H:%M"))
        }
        LoadState::Failed(_) => "failed".to_string(),
    }
}

pub fn pane_chrome<'a, T>(
    title: &'a str,
    number_key: char,
    focused: bool,
    load: &LoadState<T>,
    badge: Option<Badge<'a>>,
) -> Block<'a> {
    let title_style = if focused {
        Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(C_MUTED)
    };
    let suffix_style = if load.error().is_some() {
        style_error()
    } else {
        style_muted()
    };

    let header = Line::from(vec![
        Span::styled(format!("[{}] ", number_key), Style::default().fg(C_NUMBER_HINT)),
        Span::styled(title, title_style),
        Span::styled(format!(" · {} ", load_suffix(load)), suffix_style),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style_border(focused, load.error().is_some()))
        .title(header);

    match badge {
        Some(b) => block.title_top(
            Line::from(Span::styled(
                format!(" {} ", b.text),
                Style::default().fg(b.color).add_modifier(Modifier::BOLD),
            ))
            .right_aligned(),
        ),
        None => block,
    }
}
