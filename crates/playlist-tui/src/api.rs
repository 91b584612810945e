//! HTTP transport for the playlist server.
//!
//! `PlaylistApi` is the seam between the task core and the network: the
//! launcher, poller and catalog loaders only see this trait, and tests swap in
//! a scripted implementation.

use std::future::Future;
use std::time::Duration;

use playlist_proto::protocol::{
    CatalogOutcome, JobRequest, LaunchOutcome, LaunchResponse, LocalPlaylistsResponse, ProtocolError,
    SpotifyPlaylist, SpotifyPlaylistsResponse, TaskId, TaskProgress,
};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a readable body (connect, timeout, reset).
    #[error("request failed: {0}")]
    Transport(String),
    /// A body arrived but does not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(#[from] ProtocolError),
    /// The server answered with a non-success application status.
    #[error("server rejected request: {}", .0.as_deref().unwrap_or("no message"))]
    Rejected(Option<String>),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}

pub trait PlaylistApi: Send + Sync + 'static {
    /// `POST` the job to its launch endpoint.
    fn launch(
        &self,
        request: &JobRequest,
    ) -> impl Future<Output = Result<TaskId, ApiError>> + Send;

    /// `GET /playlist_progress/:task_id`.
    fn progress(
        &self,
        task_id: &TaskId,
    ) -> impl Future<Output = Result<TaskProgress, ApiError>> + Send;

    /// `GET /api/playlists`.
    fn local_playlists(&self) -> impl Future<Output = Result<Vec<String>, ApiError>> + Send;

    /// `GET /spotify_playlists`.
    fn spotify_playlists(
        &self,
    ) -> impl Future<Output = Result<Vec<SpotifyPlaylist>, ApiError>> + Send;
}

/// `PlaylistApi` over HTTP with reqwest.
///
/// The status code is only logged: the server reports failures in the JSON
/// body, frequently alongside a 4xx/5xx code, so the body decides.
#[derive(Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_body(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .header("Accept", "application/json")
            .send()
            .await?;
        debug!("GET {} -> {}", path, response.status());
        Ok(response.bytes().await?.to_vec())
    }
}

impl PlaylistApi for HttpApi {
    async fn launch(&self, request: &JobRequest) -> Result<TaskId, ApiError> {
        let path = request.endpoint();
        let response = self
            .client
            .post(self.url(path))
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await?;
        debug!("POST {} -> {}", path, response.status());
        let body = response.bytes().await?;

        match LaunchResponse::from_json(&body)?.into_outcome()? {
            LaunchOutcome::Started(task_id) => Ok(task_id),
            LaunchOutcome::Rejected(message) => Err(ApiError::Rejected(message)),
        }
    }

    async fn progress(&self, task_id: &TaskId) -> Result<TaskProgress, ApiError> {
        let body = self
            .get_body(&format!("/playlist_progress/{}", task_id))
            .await?;
        Ok(TaskProgress::from_json(&body)?)
    }

    async fn local_playlists(&self) -> Result<Vec<String>, ApiError> {
        let body = self.get_body("/api/playlists").await?;
        catalog_result(LocalPlaylistsResponse::from_json(&body)?.into_outcome()?)
    }

    async fn spotify_playlists(&self) -> Result<Vec<SpotifyPlaylist>, ApiError> {
        let body = self.get_body("/spotify_playlists").await?;
        catalog_result(SpotifyPlaylistsResponse::from_json(&body)?.into_outcome()?)
    }
}

fn catalog_result<T>(outcome: CatalogOutcome<T>) -> Result<Vec<T>, ApiError> {
    match outcome {
        CatalogOutcome::Loaded(items) => Ok(items),
        CatalogOutcome::Rejected(message) => Err(ApiError::Rejected(message)),
    }
}
