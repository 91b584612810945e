//! Action enum: user intents produced by components, dispatched by the App.

use crate::widgets::toast::Severity;

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    LocalList,
    SpotifyList,
}

impl ComponentId {
    pub fn next(self) -> Self {
        match self {
            ComponentId::LocalList => ComponentId::SpotifyList,
            ComponentId::SpotifyList => ComponentId::LocalList,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPane(ComponentId),
    Quit,

    // ── Catalogs ─────────────────────────────────────────────────────────────
    ReloadLocal,
    ReloadSpotify,

    // ── Jobs ─────────────────────────────────────────────────────────────────
    /// Convert a playlist file into a Spotify playlist.
    ConvertFile(String),
    /// Merge each source playlist into `target` (one task per source).
    Merge {
        sources: Vec<String>,
        target: Option<String>,
    },

    // ── Misc ─────────────────────────────────────────────────────────────────
    CopyToClipboard(String),
    Notify(Severity, String),
}
