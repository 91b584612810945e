//! Starts server-side jobs.

use std::sync::Arc;

use playlist_proto::protocol::{JobKind, JobRequest, TaskId};
use tracing::{info, warn};

use crate::api::{ApiError, PlaylistApi};

/// A job could not be started. Never retried: the user re-triggers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LaunchError {
    /// Refused before any request was sent.
    #[error("cannot merge a playlist into itself")]
    SelfMerge,
    #[error("server rejected the job: {}", .0.as_deref().unwrap_or("no message"))]
    Rejected(Option<String>),
    #[error("launch request failed: {0}")]
    Transport(String),
    #[error("malformed launch response: {0}")]
    Malformed(String),
}

impl LaunchError {
    /// True when the request was never sent.
    pub fn is_preflight(&self) -> bool {
        matches!(self, LaunchError::SelfMerge)
    }

    /// Text to show next to the item. Transport and malformed failures share
    /// one generic message per job kind.
    pub fn user_message(&self, kind: JobKind) -> String {
        match self {
            LaunchError::SelfMerge => "Cannot merge a playlist with itself".to_string(),
            LaunchError::Rejected(Some(message)) => message.clone(),
            LaunchError::Rejected(None)
            | LaunchError::Transport(_)
            | LaunchError::Malformed(_) => generic_message(kind).to_string(),
        }
    }
}

fn generic_message(kind: JobKind) -> &'static str {
    match kind {
        JobKind::CreateFromFile => "An error occurred while creating the playlist",
        JobKind::Merge => "An error occurred while merging playlists",
    }
}

impl From<ApiError> for LaunchError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Rejected(message) => LaunchError::Rejected(message),
            ApiError::Transport(msg) => LaunchError::Transport(msg),
            ApiError::Malformed(err) => LaunchError::Malformed(err.to_string()),
        }
    }
}

pub struct TaskLauncher<A> {
    api: Arc<A>,
}

impl<A> Clone for TaskLauncher<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<A: PlaylistApi> TaskLauncher<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Send one launch request and return the task handle.
    pub async fn start(&self, request: &JobRequest) -> Result<TaskId, LaunchError> {
        if request.is_self_merge() {
            warn!(
                "refusing to merge playlist {} into itself",
                request.entity_key()
            );
            return Err(LaunchError::SelfMerge);
        }

        match self.api.launch(request).await {
            Ok(task_id) => {
                info!(
                    "launched {:?} for {} as task {}",
                    request.kind(),
                    request.entity_key(),
                    task_id
                );
                Ok(task_id)
            }
            Err(e) => {
                warn!(
                    "launch {:?} for {} failed: {}",
                    request.kind(),
                    request.entity_key(),
                    e
                );
                Err(e.into())
            }
        }
    }
}
