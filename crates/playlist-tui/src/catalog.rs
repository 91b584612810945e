//! Loading the two catalog views.

use chrono::{DateTime, Local};
use playlist_proto::protocol::SpotifyPlaylist;
use tracing::{error, info};

use crate::api::{ApiError, PlaylistApi};

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Loading,
    Loaded {
        items: Vec<T>,
        loaded_at: DateTime<Local>,
    },
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn items(&self) -> &[T] {
        match self {
            LoadState::Loaded { items, .. } => items,
            _ => &[],
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(msg) => Some(msg.as_str()),
            _ => None,
        }
    }

    /// Placeholder line for a list that has nothing to show, if any.
    pub fn placeholder(&self, loading: &'static str, empty: &'static str) -> Option<&str> {
        match self {
            LoadState::Loading => Some(loading),
            LoadState::Loaded { items, .. } if items.is_empty() => Some(empty),
            LoadState::Loaded { .. } => None,
            LoadState::Failed(msg) => Some(msg.as_str()),
        }
    }

    fn loaded(items: Vec<T>) -> Self {
        LoadState::Loaded {
            items,
            loaded_at: Local::now(),
        }
    }
}

/// Fetch the playlist file names stored on the server.
pub async fn load_local<A: PlaylistApi>(api: &A) -> LoadState<String> {
    match api.local_playlists().await {
        Ok(files) => {
            info!("loaded {} playlist files", files.len());
            LoadState::loaded(files)
        }
        Err(e) => {
            error!("Error fetching playlists: {}", e);
            LoadState::Failed("Failed to load playlist files".to_string())
        }
    }
}

/// Fetch the user's Spotify playlists.
pub async fn load_spotify<A: PlaylistApi>(api: &A) -> LoadState<SpotifyPlaylist> {
    match api.spotify_playlists().await {
        Ok(playlists) => {
            info!("loaded {} Spotify playlists", playlists.len());
            LoadState::loaded(playlists)
        }
        Err(ApiError::Rejected(message)) => {
            error!("Error from server: {:?}", message);
            LoadState::Failed(
                message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Failed to fetch Spotify playlists".to_string()),
            )
        }
        Err(e) => {
            error!("Error fetching Spotify playlists: {}", e);
            LoadState::Failed("Network error while fetching Spotify playlists".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{playlist, FakeApi};
    use playlist_proto::protocol::ProtocolError;

    #[tokio::test]
    async fn test_local_catalog() {
        let api = FakeApi::new();
        api.script_local(Ok(vec!["kexp.csv".into(), "nts1.csv".into()]));

        let state = load_local(&api).await;
        assert_eq!(state.items(), ["kexp.csv".to_string(), "nts1.csv".to_string()]);
        assert_eq!(state.placeholder("Playlists loading...", "No playlist files found."), None);

        api.script_local(Ok(Vec::new()));
        let state = load_local(&api).await;
        assert_eq!(
            state.placeholder("Playlists loading...", "No playlist files found."),
            Some("No playlist files found.")
        );
    }

    #[tokio::test]
    async fn test_spotify_failure_messages() {
        let api = FakeApi::new();

        api.script_spotify(Err(ApiError::Rejected(Some("Not authenticated".into()))));
        assert_eq!(
            load_spotify(&api).await.error(),
            Some("Not authenticated")
        );

        api.script_spotify(Err(ApiError::Rejected(None)));
        assert_eq!(
            load_spotify(&api).await.error(),
            Some("Failed to fetch Spotify playlists")
        );

        api.script_spotify(Err(ApiError::Transport("refused".into())));
        assert_eq!(
            load_spotify(&api).await.error(),
            Some("Network error while fetching Spotify playlists")
        );

        api.script_spotify(Err(ApiError::Malformed(ProtocolError::MissingPlaylists)));
        assert_eq!(
            load_spotify(&api).await.error(),
            Some("Network error while fetching Spotify playlists")
        );
    }

    #[tokio::test]
    async fn test_spotify_catalog_loads() {
        let api = FakeApi::new();
        api.script_spotify(Ok(vec![playlist("p1", "Morning"), playlist("p2", "Night")]));

        let state = load_spotify(&api).await;
        assert!(!state.is_loading());
        assert_eq!(state.items().len(), 2);
        assert_eq!(state.items()[1].name, "Night");
    }
}
