//! Registry of in-flight tasks keyed by entity (source playlist id).
//!
//! The registry is owned by one event loop. Pollers and removal timers never
//! touch the map directly: they post `RegistryEvent`s to the channel returned
//! by `TaskRegistry::new`, and the loop feeds them back through `apply`.
//! Events are matched on task id, so anything produced for an entry that has
//! since been replaced or removed is dropped.
//!
//! Per key:
//!
//! ```text
//! Idle -> Launching -> Polling -> Finished -> (grace period) -> Idle
//!            |                                     ^
//!            +---- launch failure -----------------+ (immediately)
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use playlist_proto::protocol::{TaskId, TaskProgress};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::api::PlaylistApi;
use crate::poller::{CancelHandle, TaskPoller};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub entity_key: String,
    pub task_id: TaskId,
    pub progress: TaskProgress,
    /// Cleared the moment a terminal status is observed.
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Progress {
        key: String,
        task_id: TaskId,
        progress: TaskProgress,
    },
    /// The grace period after a terminal status has elapsed.
    Expired { key: String, task_id: TaskId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Idle,
    Launching,
    Polling,
    /// Terminal status shown, waiting for removal.
    Finished,
}

struct EntryTimers {
    poller: CancelHandle,
    removal: Option<AbortHandle>,
}

impl EntryTimers {
    fn release(self) {
        self.poller.cancel();
        if let Some(removal) = self.removal {
            removal.abort();
        }
    }
}

pub struct TaskRegistry<A> {
    poller: TaskPoller<A>,
    grace: Duration,
    entries: BTreeMap<String, RegistryEntry>,
    timers: HashMap<String, EntryTimers>,
    launching: HashSet<String>,
    events_tx: mpsc::UnboundedSender<RegistryEvent>,
}

impl<A: PlaylistApi> TaskRegistry<A> {
    pub fn new(
        poller: TaskPoller<A>,
        grace: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<RegistryEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let registry = Self {
            poller,
            grace,
            entries: BTreeMap::new(),
            timers: HashMap::new(),
            launching: HashSet::new(),
            events_tx,
        };
        (registry, events_rx)
    }

    /// Claim `key` for a launch. Fails while a launch or poll is in flight.
    pub fn reserve(&mut self, key: &str) -> bool {
        if self.is_busy(key) {
            warn!("{}: a task is already in flight, ignoring", key);
            return false;
        }
        self.launching.insert(key.to_string());
        true
    }

    /// Give the key back after a failed launch. No entry is created.
    pub fn release(&mut self, key: &str) {
        self.launching.remove(key);
    }

    /// Start polling `task_id` on behalf of `key`.
    ///
    /// Returns `false` (and does nothing) if `key` already has an active
    /// entry. A finished entry still inside its grace period is replaced and
    /// its pending removal cancelled.
    pub fn begin_tracking(&mut self, key: impl Into<String>, task_id: TaskId) -> bool {
        let key = key.into();
        if self.is_tracking(&key) {
            warn!(
                "{}: already tracking task, not starting {}",
                key, task_id
            );
            return false;
        }
        self.launching.remove(&key);
        if let Some(previous) = self.timers.remove(&key) {
            debug!("{}: replacing finished entry", key);
            previous.release();
        }

        let tx = self.events_tx.clone();
        let event_key = key.clone();
        let event_task = task_id.clone();
        let poller = self.poller.run(task_id.clone(), move |progress| {
            let _ = tx.send(RegistryEvent::Progress {
                key: event_key.clone(),
                task_id: event_task.clone(),
                progress,
            });
        });

        info!("{}: tracking task {}", key, task_id);
        self.entries.insert(
            key.clone(),
            RegistryEntry {
                entity_key: key.clone(),
                task_id,
                progress: TaskProgress::initial(),
                active: true,
            },
        );
        self.timers.insert(
            key,
            EntryTimers {
                poller,
                removal: None,
            },
        );
        true
    }

    /// Fold one event into the map. Returns whether anything visible changed.
    pub fn apply(&mut self, event: RegistryEvent) -> bool {
        match event {
            RegistryEvent::Progress {
                key,
                task_id,
                progress,
            } => self.apply_progress(key, task_id, progress),
            RegistryEvent::Expired { key, task_id } => self.apply_expired(&key, &task_id),
        }
    }

    fn apply_progress(&mut self, key: String, task_id: TaskId, progress: TaskProgress) -> bool {
        let Some(entry) = self.entries.get_mut(&key) else {
            debug!("{}: update for unknown entry, dropped", key);
            return false;
        };
        if entry.task_id != task_id || !entry.active {
            debug!("{}: stale update for task {}, dropped", key, task_id);
            return false;
        }

        let terminal = progress.is_terminal();
        entry.progress = progress;
        if !terminal {
            return true;
        }

        entry.active = false;
        info!(
            "{}: task {} {} ({})",
            key,
            task_id,
            entry.progress.status.label(),
            entry.progress.message
        );

        let tx = self.events_tx.clone();
        let grace = self.grace;
        let expired_key = key.clone();
        let removal = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = tx.send(RegistryEvent::Expired {
                key: expired_key,
                task_id,
            });
        });

        if let Some(timers) = self.timers.get_mut(&key) {
            timers.poller.cancel();
            if let Some(old) = timers.removal.replace(removal.abort_handle()) {
                old.abort();
            }
        }
        true
    }

    fn apply_expired(&mut self, key: &str, task_id: &TaskId) -> bool {
        match self.entries.get(key) {
            Some(entry) if &entry.task_id == task_id && !entry.active => {}
            _ => {
                debug!("{}: stale removal for task {}, dropped", key, task_id);
                return false;
            }
        }
        self.entries.remove(key);
        if let Some(timers) = self.timers.remove(key) {
            timers.release();
        }
        debug!("{}: entry removed", key);
        true
    }

    pub fn snapshot(&self) -> &BTreeMap<String, RegistryEntry> {
        &self.entries
    }

    pub fn entry(&self, key: &str) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }

    /// True iff `key` has an entry that has not reached a terminal status.
    pub fn is_tracking(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|e| e.active)
    }

    /// True while a launch or poll is in flight for `key`.
    pub fn is_busy(&self, key: &str) -> bool {
        self.launching.contains(key) || self.is_tracking(key)
    }

    pub fn key_state(&self, key: &str) -> KeyState {
        if self.launching.contains(key) {
            return KeyState::Launching;
        }
        match self.entries.get(key) {
            Some(e) if e.active => KeyState::Polling,
            Some(_) => KeyState::Finished,
            None => KeyState::Idle,
        }
    }

    /// Keys whose launch request is still in flight.
    pub fn launching(&self) -> impl Iterator<Item = &str> {
        self.launching.iter().map(String::as_str)
    }

    pub fn active_count(&self) -> usize {
        self.entries.values().filter(|e| e.active).count()
    }

    /// Stop every poller and removal timer and forget all entries.
    pub fn shutdown(&mut self) {
        for (_, timers) in self.timers.drain() {
            timers.release();
        }
        self.entries.clear();
        self.launching.clear();
    }
}
