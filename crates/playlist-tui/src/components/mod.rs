pub mod local_list;
pub mod spotify_list;

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use unicode_width::UnicodeWidthChar;

use crate::widgets::scrollable_list::ScrollableList;

/// Shared list navigation keys. Returns true if the key was consumed.
fn navigate<T>(list: &mut ScrollableList<T>, key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => list.select_up(1),
        KeyCode::Down | KeyCode::Char('j') => list.select_down(1),
        KeyCode::PageUp => list.select_up(10),
        KeyCode::PageDown => list.select_down(10),
        KeyCode::Home | KeyCode::Char('g') => list.select_first(),
        KeyCode::End | KeyCode::Char('G') => list.select_last(),
        _ => return false,
    }
    true
}

/// Cut `s` to at most `width` terminal columns, ending in `…` when cut.
pub fn truncate(s: &str, width: usize) -> String {
    let mut used = 0;
    let mut out = String::new();
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            // Make room for the ellipsis.
            while used + 1 > width {
                match out.pop() {
                    Some(c) => used -= c.width().unwrap_or(0),
                    None => return out,
                }
            }
            out.push('…');
            return out;
        }
        used += w;
        out.push(ch);
    }
    out
}
