//! Single-task tracking for the file → Spotify conversion.
//!
//! One tracker per playlist file row. Unlike the merge registry there is no
//! delayed removal: the final message stays on the row until the next launch.

use playlist_proto::protocol::{TaskId, TaskProgress};
use tracing::debug;

use crate::api::PlaylistApi;
use crate::poller::{CancelHandle, TaskPoller};

#[derive(Debug)]
enum Phase {
    Idle,
    Launching,
    Polling { task_id: TaskId, handle: CancelHandle },
}

#[derive(Debug)]
pub struct TaskTracker {
    phase: Phase,
    progress: TaskProgress,
}

impl Default for TaskTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskTracker {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            progress: TaskProgress::initial(),
        }
    }

    /// Move to `Launching`. Refused while a launch or poll is in flight.
    pub fn begin_launch(&mut self) -> bool {
        if self.is_processing() {
            return false;
        }
        self.phase = Phase::Launching;
        self.progress = TaskProgress::initial();
        true
    }

    /// The launch failed; show `message` and accept a new launch.
    pub fn launch_failed(&mut self, message: impl Into<String>) {
        self.phase = Phase::Idle;
        self.progress = TaskProgress::failed(message);
    }

    /// Start polling `task_id`; `on_update` should route each status back to
    /// `apply` on the owning event loop.
    pub fn begin_polling<A, F>(&mut self, poller: &TaskPoller<A>, task_id: TaskId, on_update: F)
    where
        A: PlaylistApi,
        F: FnMut(TaskProgress) + Send + 'static,
    {
        if let Phase::Polling { handle, .. } = &self.phase {
            handle.cancel();
        }
        let handle = poller.run(task_id.clone(), on_update);
        self.phase = Phase::Polling { task_id, handle };
    }

    /// Record a status for `task_id`. Returns whether it was accepted.
    pub fn apply(&mut self, task_id: &TaskId, progress: TaskProgress) -> bool {
        let Phase::Polling {
            task_id: current,
            handle,
        } = &self.phase
        else {
            debug!("update for task {} while not polling, dropped", task_id);
            return false;
        };
        if current != task_id {
            debug!("update for replaced task {}, dropped", task_id);
            return false;
        }

        let terminal = progress.is_terminal();
        if terminal {
            handle.cancel();
            self.phase = Phase::Idle;
        }
        self.progress = progress;
        true
    }

    /// True from launch until a terminal status or launch failure.
    pub fn is_processing(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    pub fn progress(&self) -> &TaskProgress {
        &self.progress
    }

    /// Stop polling, e.g. when the view goes away.
    pub fn cancel(&mut self) {
        if let Phase::Polling { handle, .. } = &self.phase {
            handle.cancel();
        }
        self.phase = Phase::Idle;
    }
}
