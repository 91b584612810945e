//! AppState: data shared read-only with components.

use std::collections::{BTreeMap, HashMap, HashSet};

use playlist_proto::protocol::{SpotifyPlaylist, TaskProgress};

use crate::catalog::LoadState;
use crate::registry::RegistryEntry;
use crate::tracker::TaskTracker;

pub struct AppState {
    pub local: LoadState<String>,
    pub spotify: LoadState<SpotifyPlaylist>,
    /// One tracker per playlist file that has been sent to Spotify.
    pub conversions: HashMap<String, TaskTracker>,
    /// Copy of the merge registry, refreshed whenever it changes.
    pub merges: BTreeMap<String, RegistryEntry>,
    /// Source playlists whose merge request is still in flight.
    pub merges_launching: HashSet<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            local: LoadState::Loading,
            spotify: LoadState::Loading,
            conversions: HashMap::new(),
            merges: BTreeMap::new(),
            merges_launching: HashSet::new(),
        }
    }

    /// Latest progress for a file row, or `None` if it was never launched.
    pub fn conversion(&self, file: &str) -> Option<(&TaskProgress, bool)> {
        self.conversions
            .get(file)
            .map(|t| (t.progress(), t.is_processing()))
    }

    pub fn merge(&self, playlist_id: &str) -> Option<&RegistryEntry> {
        self.merges.get(playlist_id)
    }

    pub fn merge_busy(&self, playlist_id: &str) -> bool {
        self.merges_launching.contains(playlist_id)
            || self.merges.get(playlist_id).is_some_and(|e| e.active)
    }

    pub fn playlist_name<'a>(&'a self, playlist_id: &'a str) -> &'a str {
        self.spotify
            .items()
            .iter()
            .find(|p| p.id == playlist_id)
            .map(|p| p.name.as_str())
            .unwrap_or(playlist_id)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
