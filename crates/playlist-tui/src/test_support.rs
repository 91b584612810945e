//! Scripted `PlaylistApi` for unit tests.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use playlist_proto::protocol::{
    JobRequest, SpotifyPlaylist, TaskId, TaskProgress, TaskStatus,
};

use crate::api::{ApiError, PlaylistApi};

/// Responses are queued per endpoint (per task id for progress). An empty
/// progress queue answers "still processing", an empty launch queue hands out
/// `task-N` ids.
#[derive(Default)]
pub struct FakeApi {
    launches: Mutex<VecDeque<Result<TaskId, ApiError>>>,
    launched: Mutex<Vec<JobRequest>>,
    progress: Mutex<HashMap<TaskId, VecDeque<Result<TaskProgress, ApiError>>>>,
    progress_calls: Mutex<HashMap<TaskId, usize>>,
    progress_delay: Option<Duration>,
    local: Mutex<Option<Result<Vec<String>, ApiError>>>,
    spotify: Mutex<Option<Result<Vec<SpotifyPlaylist>, ApiError>>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every progress response resolves only after `delay`.
    pub fn with_progress_delay(delay: Duration) -> Self {
        Self {
            progress_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn script_launch(&self, result: Result<TaskId, ApiError>) {
        self.launches.lock().unwrap().push_back(result);
    }

    pub fn script_progress(&self, task_id: &str, result: Result<TaskProgress, ApiError>) {
        self.progress
            .lock()
            .unwrap()
            .entry(TaskId::new(task_id))
            .or_default()
            .push_back(result);
    }

    pub fn script_local(&self, result: Result<Vec<String>, ApiError>) {
        *self.local.lock().unwrap() = Some(result);
    }

    pub fn script_spotify(&self, result: Result<Vec<SpotifyPlaylist>, ApiError>) {
        *self.spotify.lock().unwrap() = Some(result);
    }

    pub fn launch_calls(&self) -> usize {
        self.launched.lock().unwrap().len()
    }

    pub fn launched(&self) -> Vec<JobRequest> {
        self.launched.lock().unwrap().clone()
    }

    pub fn progress_calls(&self, task_id: &str) -> usize {
        self.progress_calls
            .lock()
            .unwrap()
            .get(&TaskId::new(task_id))
            .copied()
            .unwrap_or(0)
    }
}

pub fn processing(progress: u8, message: &str) -> TaskProgress {
    TaskProgress::new(TaskStatus::Processing, progress, message)
}

pub fn completed(message: &str) -> TaskProgress {
    TaskProgress::new(TaskStatus::Completed, 100, message)
}

pub fn playlist(id: &str, name: &str) -> SpotifyPlaylist {
    SpotifyPlaylist {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        public: true,
        collaborative: false,
        tracks_total: 0,
        owner: "tester".to_string(),
        owner_id: "tester".to_string(),
        href: String::new(),
        external_url: format!("https://open.spotify.com/playlist/{}", id),
        images: Vec::new(),
        snapshot_id: String::new(),
    }
}

impl PlaylistApi for FakeApi {
    fn launch(
        &self,
        request: &JobRequest,
    ) -> impl Future<Output = Result<TaskId, ApiError>> + Send {
        let mut launched = self.launched.lock().unwrap();
        launched.push(request.clone());
        let result = self
            .launches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(TaskId::new(format!("task-{}", launched.len()))));
        async move { result }
    }

    fn progress(
        &self,
        task_id: &TaskId,
    ) -> impl Future<Output = Result<TaskProgress, ApiError>> + Send {
        *self
            .progress_calls
            .lock()
            .unwrap()
            .entry(task_id.clone())
            .or_default() += 1;
        let result = self
            .progress
            .lock()
            .unwrap()
            .get_mut(task_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Ok(processing(0, "Waiting")));
        let delay = self.progress_delay;
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }

    fn local_playlists(&self) -> impl Future<Output = Result<Vec<String>, ApiError>> + Send {
        let result = self
            .local
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()));
        async move { result }
    }

    fn spotify_playlists(
        &self,
    ) -> impl Future<Output = Result<Vec<SpotifyPlaylist>, ApiError>> + Send {
        let result = self
            .spotify
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()));
        async move { result }
    }
}
