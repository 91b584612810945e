use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Message shown while a task has been launched but not yet polled.
pub const INITIAL_MESSAGE: &str = "Initializing...";

/// Message synthesized when a progress request fails or returns garbage.
pub const POLL_FAILURE_MESSAGE: &str = "Error checking progress";

/// A response body that does not have the shape the client expects.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("`status` is \"success\" but `task_id` is missing")]
    MissingTaskId,
    #[error("`status` is \"success\" but `playlists` is missing")]
    MissingPlaylists,
}

// ── Tasks ─────────────────────────────────────────────────────────────────────

/// Opaque handle for one server-side job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Status of a server-side job.
///
/// `Processing` is the only non-terminal state. Anything else on the wire is
/// rejected as malformed. `CompletedWithWarning` is what the server reports
/// when a merge copied the tracks but could not delete the source playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Processing,
    Completed,
    #[serde(rename = "completed_with_warning")]
    CompletedWithWarning,
    Error,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Processing)
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::CompletedWithWarning => "completed with warning",
            TaskStatus::Error => "error",
        }
    }
}

/// Latest known status of a task, as returned by `GET /playlist_progress/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub status: TaskStatus,
    #[serde(deserialize_with = "deserialize_percent")]
    pub progress: u8,
    pub message: String,
}

impl TaskProgress {
    pub fn new(status: TaskStatus, progress: u8, message: impl Into<String>) -> Self {
        Self {
            status,
            progress: progress.min(100),
            message: message.into(),
        }
    }

    pub fn initial() -> Self {
        Self::new(TaskStatus::Processing, 0, INITIAL_MESSAGE)
    }

    pub fn poll_failure() -> Self {
        Self::new(TaskStatus::Error, 0, POLL_FAILURE_MESSAGE)
    }

    /// Error progress carrying a launch failure message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(TaskStatus::Error, 0, message)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn from_json(body: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Accepts any JSON number in `0..=100`; the server is free to send floats.
fn deserialize_percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(D::Error::custom(format!(
            "progress {} is outside 0..=100",
            value
        )));
    }
    Ok(value.round() as u8)
}

// ── Launching ─────────────────────────────────────────────────────────────────

/// Which kind of job a request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    CreateFromFile,
    Merge,
}

/// Request body for one of the two launch endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum JobRequest {
    CreateFromFile {
        file_name: String,
    },
    Merge {
        source_playlist_id: String,
        target_playlist_id: String,
    },
}

impl JobRequest {
    pub fn create_from_file(file_name: impl Into<String>) -> Self {
        JobRequest::CreateFromFile {
            file_name: file_name.into(),
        }
    }

    pub fn merge(source: impl Into<String>, target: impl Into<String>) -> Self {
        JobRequest::Merge {
            source_playlist_id: source.into(),
            target_playlist_id: target.into(),
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            JobRequest::CreateFromFile { .. } => JobKind::CreateFromFile,
            JobRequest::Merge { .. } => JobKind::Merge,
        }
    }

    /// Path of the endpoint that starts this job.
    pub fn endpoint(&self) -> &'static str {
        match self {
            JobRequest::CreateFromFile { .. } => "/create_playlist_from_file",
            JobRequest::Merge { .. } => "/merge_playlists",
        }
    }

    /// The key the resulting task is tracked under: the file name or the
    /// source playlist id.
    pub fn entity_key(&self) -> &str {
        match self {
            JobRequest::CreateFromFile { file_name } => file_name,
            JobRequest::Merge {
                source_playlist_id, ..
            } => source_playlist_id,
        }
    }

    /// True for a merge of a playlist into itself, which is never sent.
    pub fn is_self_merge(&self) -> bool {
        matches!(
            self,
            JobRequest::Merge { source_playlist_id, target_playlist_id }
                if source_playlist_id == target_playlist_id
        )
    }
}

/// Raw body of a launch response.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchResponse {
    pub status: String,
    #[serde(default)]
    pub task_id: Option<TaskId>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    Started(TaskId),
    /// Application-level failure, with the server's message if it sent one.
    Rejected(Option<String>),
}

impl LaunchResponse {
    pub fn from_json(body: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn into_outcome(self) -> Result<LaunchOutcome, ProtocolError> {
        if self.status != "success" {
            return Ok(LaunchOutcome::Rejected(self.message));
        }
        self.task_id
            .map(LaunchOutcome::Started)
            .ok_or(ProtocolError::MissingTaskId)
    }
}

// ── Catalogs ──────────────────────────────────────────────────────────────────

/// Body of `GET /api/playlists`: names of playlist files stored on the server.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalPlaylistsResponse {
    pub status: String,
    #[serde(default)]
    pub playlists: Option<Vec<String>>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `GET /spotify_playlists`.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylistsResponse {
    pub status: String,
    #[serde(default)]
    pub playlists: Option<Vec<SpotifyPlaylist>>,
    #[serde(default)]
    pub message: Option<String>,
}

/// What a well-formed catalog body says.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogOutcome<T> {
    Loaded(Vec<T>),
    /// Non-success status, with the server's message if it sent one.
    Rejected(Option<String>),
}

fn catalog_outcome<T>(
    status: &str,
    playlists: Option<Vec<T>>,
    message: Option<String>,
) -> Result<CatalogOutcome<T>, ProtocolError> {
    if status != "success" {
        return Ok(CatalogOutcome::Rejected(message));
    }
    playlists
        .map(CatalogOutcome::Loaded)
        .ok_or(ProtocolError::MissingPlaylists)
}

impl LocalPlaylistsResponse {
    pub fn from_json(body: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn into_outcome(self) -> Result<CatalogOutcome<String>, ProtocolError> {
        catalog_outcome(&self.status, self.playlists, self.message)
    }
}

impl SpotifyPlaylistsResponse {
    pub fn from_json(body: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn into_outcome(self) -> Result<CatalogOutcome<SpotifyPlaylist>, ProtocolError> {
        catalog_outcome(&self.status, self.playlists, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub collaborative: bool,
    #[serde(default)]
    pub tracks_total: u32,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub external_url: String,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    #[serde(default)]
    pub snapshot_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

impl SpotifyPlaylist {
    /// "Public" / "Private", with " • Collaborative" appended when shared.
    pub fn visibility_label(&self) -> String {
        let mut label = if self.public { "Public" } else { "Private" }.to_string();
        if self.collaborative {
            label.push_str(" • Collaborative");
        }
        label
    }

    pub fn description_or_default(&self) -> &str {
        match self.description.as_deref() {
            Some(d) if !d.is_empty() => d,
            _ => "No description",
        }
    }
}
