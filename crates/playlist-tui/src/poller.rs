//! Fixed-interval progress polling for one server-side task.
//!
//! Each `run` spawns one tokio task. The first request goes out one interval
//! after `run`; later requests are spaced by the interval measured from the
//! previous tick, and a tick never fires while a request is still in flight.
//! Polling ends on the first terminal status, on the first failed request
//! (reported as a synthesized `Error` update), or on cancellation.

use std::sync::Arc;
use std::time::Duration;

use playlist_proto::protocol::{TaskId, TaskProgress};
use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ApiError, PlaylistApi};

/// A progress request failed after the job was started.
#[derive(Debug, thiserror::Error)]
#[error("polling task {task_id} failed: {source}")]
pub struct PollError {
    pub task_id: TaskId,
    #[source]
    pub source: ApiError,
}

/// Stops a running poll. Cloneable and idempotent.
///
/// Dropping the handle does not stop the poll; it then runs until a terminal
/// status or a failed request.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
    task: AbortHandle,
}

impl CancelHandle {
    /// On a current-thread runtime no `on_update` call happens after this
    /// returns, including for a response that is already on the wire. On a
    /// multi-thread runtime an update being delivered on another worker can
    /// still land, so receivers match updates against the task id they track.
    pub fn cancel(&self) {
        self.token.cancel();
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the poll task has exited, for whatever reason.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

pub struct TaskPoller<A> {
    api: Arc<A>,
    interval: Duration,
}

impl<A> Clone for TaskPoller<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            interval: self.interval,
        }
    }
}

impl<A: PlaylistApi> TaskPoller<A> {
    pub fn new(api: Arc<A>, interval: Duration) -> Self {
        Self { api, interval }
    }

    /// Poll `task_id` until it finishes, reporting every observed status to
    /// `on_update` exactly once.
    pub fn run<F>(&self, task_id: TaskId, mut on_update: F) -> CancelHandle
    where
        F: FnMut(TaskProgress) + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let api = Arc::clone(&self.api);
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let result = tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    result = api.progress(&task_id) => result,
                };
                if cancelled.is_cancelled() {
                    break;
                }

                match result {
                    Ok(progress) => {
                        debug!(
                            "task {}: {} {}% {}",
                            task_id,
                            progress.status.label(),
                            progress.progress,
                            progress.message
                        );
                        let terminal = progress.is_terminal();
                        if terminal {
                            info!("task {} finished: {}", task_id, progress.status.label());
                        }
                        on_update(progress);
                        if terminal {
                            break;
                        }
                    }
                    Err(source) => {
                        let err = PollError {
                            task_id: task_id.clone(),
                            source,
                        };
                        warn!("{}", err);
                        on_update(TaskProgress::poll_failure());
                        break;
                    }
                }
            }
            debug!("task {}: poller stopped", task_id);
        });

        CancelHandle {
            token,
            task: task.abort_handle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{completed, processing, FakeApi};
    use playlist_proto::protocol::TaskStatus;
    use tokio::sync::mpsc;

    const TICK: Duration = Duration::from_millis(1000);

    fn collect(
        poller: &TaskPoller<FakeApi>,
        task_id: &str,
    ) -> (CancelHandle, mpsc::UnboundedReceiver<TaskProgress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = poller.run(TaskId::new(task_id), move |p| {
            let _ = tx.send(p);
        });
        (handle, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_poll_after_one_interval() {
        let api = Arc::new(FakeApi::new());
        api.script_progress("t1", Ok(processing(10, "Reading file")));
        let poller = TaskPoller::new(Arc::clone(&api), TICK);
        let started = Instant::now();

        let (_handle, mut rx) = collect(&poller, "t1");
        time::sleep(Duration::from_millis(999)).await;
        assert_eq!(api.progress_calls("t1"), 0);

        let first = rx.recv().await.unwrap();
        assert!(started.elapsed() >= TICK);
        assert_eq!(first, processing(10, "Reading file"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_stops_requests() {
        let api = Arc::new(FakeApi::new());
        api.script_progress("t1", Ok(processing(40, "Merging...")));
        api.script_progress("t1", Ok(completed("Done")));
        let poller = TaskPoller::new(Arc::clone(&api), TICK);

        let (handle, mut rx) = collect(&poller, "t1");
        assert_eq!(rx.recv().await.unwrap().status, TaskStatus::Processing);
        assert_eq!(rx.recv().await.unwrap().status, TaskStatus::Completed);

        time::sleep(TICK * 10).await;
        assert_eq!(api.progress_calls("t1"), 2);
        assert!(rx.recv().await.is_none());
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_request_reports_one_error_and_stops() {
        let api = Arc::new(FakeApi::new());
        api.script_progress("t1", Ok(processing(5, "Starting")));
        api.script_progress("t1", Err(ApiError::Transport("connection reset".into())));
        let poller = TaskPoller::new(Arc::clone(&api), TICK);

        let (_handle, mut rx) = collect(&poller, "t1");
        let mut updates = Vec::new();
        while let Some(p) = rx.recv().await {
            updates.push(p);
        }

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1], TaskProgress::poll_failure());
        time::sleep(TICK * 5).await;
        assert_eq!(api.progress_calls("t1"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_tick_means_no_updates() {
        let api = Arc::new(FakeApi::new());
        api.script_progress("t1", Ok(completed("Done")));
        let poller = TaskPoller::new(Arc::clone(&api), TICK);

        let (handle, mut rx) = collect(&poller, "t1");
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());

        time::sleep(TICK * 5).await;
        assert!(rx.recv().await.is_none());
        assert_eq!(api.progress_calls("t1"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_in_flight_response() {
        let api = Arc::new(FakeApi::with_progress_delay(Duration::from_millis(500)));
        api.script_progress("t1", Ok(completed("Done")));
        let poller = TaskPoller::new(Arc::clone(&api), TICK);

        let (handle, mut rx) = collect(&poller, "t1");
        time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(api.progress_calls("t1"), 1);

        handle.cancel();
        time::sleep(Duration::from_millis(1000)).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_responses_do_not_overlap() {
        let api = Arc::new(FakeApi::with_progress_delay(Duration::from_millis(2500)));
        let poller = TaskPoller::new(Arc::clone(&api), TICK);

        let (handle, _rx) = collect(&poller, "t1");
        // Requests start at 1000ms and 3500ms; a wall-clock schedule would
        // have issued four by now.
        time::sleep(Duration::from_millis(4200)).await;
        assert_eq!(api.progress_calls("t1"), 2);
        handle.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_as_response_arrives_ends_delivery() {
        let api = Arc::new(FakeApi::with_progress_delay(Duration::from_millis(500)));
        api.script_progress("t1", Ok(processing(60, "Merging...")));
        let poller = TaskPoller::new(Arc::clone(&api), TICK);
        let started = Instant::now();

        let (handle, mut rx) = collect(&poller, "t1");
        // The response resolves at 1500ms, the same instant cancel runs.
        time::sleep_until(started + Duration::from_millis(1500)).await;
        let mut delivered = 0;
        while rx.try_recv().is_ok() {
            delivered += 1;
        }
        handle.cancel();
        assert!(delivered <= 1);

        time::sleep(TICK * 5).await;
        assert!(rx.recv().await.is_none());
        assert_eq!(api.progress_calls("t1"), 1);
    }
}
