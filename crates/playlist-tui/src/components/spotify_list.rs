//! The user's Spotify playlists: pick a merge target, mark sources, merge.

use std::collections::BTreeSet;

use playlist_proto::protocol::SpotifyPlaylist;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::catalog::LoadState;
use crate::component::Component;
use crate::theme::{
    style_error, style_marked, style_muted, style_row, style_secondary, style_target, C_TARGET,
};
use crate::widgets::pane_chrome::{pane_chrome, Badge};
use crate::widgets::progress_bar::progress_line;
use crate::widgets::scrollable_list::ScrollableList;
use crate::widgets::toast::Severity;

use super::{navigate, truncate};

const NAME_WIDTH: usize = 30;
const BAR_WIDTH: usize = 12;

pub struct SpotifyList {
    list: ScrollableList<SpotifyPlaylist>,
    target: Option<String>,
    marked: BTreeSet<String>,
}

impl SpotifyList {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(),
            target: None,
            marked: BTreeSet::new(),
        }
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn marked(&self) -> impl Iterator<Item = &str> {
        self.marked.iter().map(String::as_str)
    }

    fn toggle_target(&mut self, id: String) -> Action {
        if self.target.as_deref() == Some(id.as_str()) {
            self.target = None;
            Action::Notify(Severity::Info, "Merge target cleared".to_string())
        } else {
            self.target = Some(id);
            Action::Notify(Severity::Info, "Merge target set".to_string())
        }
    }
}

impl Default for SpotifyList {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for SpotifyList {
    fn id(&self) -> ComponentId {
        ComponentId::SpotifyList
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release || navigate(&mut self.list, &key) {
            return vec![];
        }
        let selected = self.list.selected_item().cloned();
        match key.code {
            KeyCode::Char('t') => match selected {
                Some(p) => vec![self.toggle_target(p.id)],
                None => vec![],
            },
            KeyCode::Char('m') | KeyCode::Enter => match selected {
                Some(p) => vec![Action::Merge {
                    sources: vec![p.id],
                    target: self.target.clone(),
                }],
                None => vec![],
            },
            KeyCode::Char(' ') => {
                if let Some(p) = selected {
                    if !self.marked.remove(&p.id) {
                        self.marked.insert(p.id);
                    }
                    self.list.select_down(1);
                }
                vec![]
            }
            KeyCode::Char('M') => {
                if self.marked.is_empty() {
                    return vec![Action::Notify(
                        Severity::Warning,
                        "No playlists marked (space)".to_string(),
                    )];
                }
                let sources = std::mem::take(&mut self.marked).into_iter().collect();
                vec![Action::Merge {
                    sources,
                    target: self.target.clone(),
                }]
            }
            KeyCode::Char('y') => match selected {
                Some(p) if !p.external_url.is_empty() => {
                    vec![Action::CopyToClipboard(p.external_url)]
                }
                Some(_) => vec![Action::Notify(
                    Severity::Warning,
                    "Playlist has no link".to_string(),
                )],
                None => vec![],
            },
            KeyCode::Char('r') => vec![Action::ReloadSpotify],
            _ => vec![],
        }
    }

    fn sync(&mut self, state: &AppState) {
        self.list
            .set_items(state.spotify.items().to_vec(), |a, b| a.id == b.id);
        // Forget marks and target for playlists that are gone.
        if let LoadState::Loaded { items, .. } = &state.spotify {
            self.marked.retain(|id| items.iter().any(|p| &p.id == id));
            if let Some(target) = &self.target {
                if !items.iter().any(|p| &p.id == target) {
                    self.target = None;
                }
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let badge_text = self
            .target
            .as_deref()
            .map(|id| format!("→ {}", truncate(state.playlist_name(id), 20)));
        let badge = badge_text.as_deref().map(|text| Badge {
            text,
            color: C_TARGET,
        });
        let mut block = pane_chrome("spotify playlists", '2', focused, &state.spotify, badge);
        if let Some(selected) = self.list.selected_item() {
            block = block.title_bottom(Line::from(Span::styled(
                format!(" {} ", truncate(selected.description_or_default(), 60)),
                style_muted(),
            )));
        }
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if let Some(text) = state
            .spotify
            .placeholder("Loading your Spotify playlists...", "No Spotify playlists found.")
        {
            let style = if state.spotify.error().is_some() {
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
            .map(|(idx, playlist)| {
                let row_style = style_row(idx == selected, focused);
                let is_target = self.target.as_deref() == Some(playlist.id.as_str());
                let marker = if is_target {
                    Span::styled(" ◎ ", style_target())
                } else if self.marked.contains(&playlist.id) {
                    Span::styled(" ● ", style_marked())
                } else {
                    Span::raw("   ")
                };

                let mut spans = vec![
                    marker,
                    Span::styled(
                        format!("{:<width$} ", truncate(&playlist.name, NAME_WIDTH), width = NAME_WIDTH),
                        row_style,
                    ),
                ];
                match state.merge(&playlist.id) {
                    Some(entry) => spans.extend(progress_line(&entry.progress, BAR_WIDTH).spans),
                    None if state.merges_launching.contains(&playlist.id) => {
                        spans.push(Span::styled("starting merge...", style_muted()))
                    }
                    None => spans.push(Span::styled(
                        format!(
                            "{:>4} tracks  {}",
                            playlist.tracks_total,
                            playlist.visibility_label()
                        ),
                        style_secondary(),
                    )),
                }
                Line::from(spans)
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), inner);
    }
}
