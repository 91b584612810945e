//! Playlist files stored on the server, each convertible to a Spotify playlist.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::component::Component;
use crate::theme::{style_error, style_muted, style_row, C_PROCESSING};
use crate::widgets::pane_chrome::{pane_chrome, Badge};
use crate::widgets::progress_bar::progress_line;
use crate::widgets::scrollable_list::ScrollableList;
use crate::widgets::toast::Severity;

use super::{navigate, truncate};

const NAME_WIDTH: usize = 28;
const BAR_WIDTH: usize = 12;

pub struct LocalList {
    list: ScrollableList<String>,
}

impl LocalList {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(),
        }
    }
}

impl Default for LocalList {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for LocalList {
    fn id(&self) -> ComponentId {
        ComponentId::LocalList
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release || navigate(&mut self.list, &key) {
            return vec![];
        }
        match key.code {
            KeyCode::Char('a') | KeyCode::Enter => match self.list.selected_item() {
                Some(file) if state.conversion(file).is_some_and(|(_, busy)| busy) => vec![
                    Action::Notify(Severity::Info, format!("{} is already processing", file)),
                ],
                Some(file) => vec![Action::ConvertFile(file.clone())],
                None => vec![],
            },
            KeyCode::Char('r') => vec![Action::ReloadLocal],
            _ => vec![],
        }
    }

    fn sync(&mut self, state: &AppState) {
        self.list.set_items(state.local.items().to_vec(), |a, b| a == b);
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let busy = state
            .conversions
            .values()
            .filter(|t| t.is_processing())
            .count();
        let badge_text = format!("{} ACTIVE", busy);
        let badge = (busy > 0).then(|| Badge {
            text: &badge_text,
            color: C_PROCESSING,
        });
        let block = pane_chrome("playlist files", '1', focused, &state.local, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if let Some(text) = state
            .local
            .placeholder("Playlists loading...", "No playlist files found.")
        {
            let style = if state.local.error().is_some() {
                style_error()
            } else {
                style_muted()
            };
            frame.render_widget(Paragraph::new(Span::styled(format!("  {}", text), style)), inner);
            return;
        }

        let height = inner.height as usize;
        self.list.ensure_visible(height);
        let selected = self.list.selected();

        let lines: Vec<Line> = self
            .list
            .visible_items(height)
            .map(|(idx, file)| {
                let row_style = style_row(idx == selected, focused);
                let mut spans = vec![Span::styled(
                    format!(" {:<width$} ", truncate(file, NAME_WIDTH), width = NAME_WIDTH),
                    row_style,
                )];
                if let Some((progress, _)) = state.conversion(file) {
                    spans.extend(progress_line(progress, BAR_WIDTH).spans);
                }
                Line::from(spans)
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), inner);
    }
}
