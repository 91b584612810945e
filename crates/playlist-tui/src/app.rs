//! App: component-based event loop.
//!
//! Architecture:
//! - `App` owns the components, `AppState`, the merge registry and one
//!   tracker per converted file.
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background
//!   tasks (key reader, catalog loads, launches, conversion polls).
//! - Merge pollers and removal timers report on the registry's own channel.
//! - Components return `Vec<Action>`; App dispatches each Action.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use playlist_proto::config::Config;
use playlist_proto::protocol::{JobKind, JobRequest, SpotifyPlaylist, TaskId, TaskProgress, TaskStatus};

use crate::{
    action::{Action, ComponentId},
    api::PlaylistApi,
    app_state::AppState,
    catalog::{self, LoadState},
    component::Component,
    components::{local_list::LocalList, spotify_list::SpotifyList},
    launcher::{LaunchError, TaskLauncher},
    poller::TaskPoller,
    registry::{RegistryEvent, TaskRegistry},
    widgets::{
        status_bar,
        toast::{Severity, ToastManager},
    },
};

// ── Internal event bus ────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum AppMessage {
    Event(Event),
    LocalLoaded(LoadState<String>),
    SpotifyLoaded {
        generation: u64,
        state: LoadState<SpotifyPlaylist>,
    },
    ConversionLaunched {
        file: String,
        result: Result<TaskId, LaunchError>,
    },
    ConversionProgress {
        file: String,
        task_id: TaskId,
        progress: TaskProgress,
    },
    MergeLaunched {
        source: String,
        target: String,
        result: Result<TaskId, LaunchError>,
    },
}

pub struct App<A: PlaylistApi> {
    api: Arc<A>,
    launcher: TaskLauncher<A>,
    poller: TaskPoller<A>,
    registry: TaskRegistry<A>,
    state: AppState,
    /// Bumped per Spotify reload; replies from older loads are dropped.
    spotify_generation: u64,

    local_list: LocalList,
    spotify_list: SpotifyList,
    focus: ComponentId,
    toast: ToastManager,
    server: String,
    should_quit: bool,

    tx: mpsc::UnboundedSender<AppMessage>,
    rx: Option<mpsc::UnboundedReceiver<AppMessage>>,
    registry_rx: Option<mpsc::UnboundedReceiver<RegistryEvent>>,
}

impl<A: PlaylistApi> App<A> {
    pub fn new(api: Arc<A>, config: &Config) -> Self {
        let poller = TaskPoller::new(Arc::clone(&api), config.poll_interval());
        let (registry, registry_rx) = TaskRegistry::new(poller.clone(), config.removal_grace());
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            launcher: TaskLauncher::new(Arc::clone(&api)),
            api,
            poller,
            registry,
            state: AppState::new(),
            spotify_generation: 0,
            local_list: LocalList::new(),
            spotify_list: SpotifyList::new(),
            focus: ComponentId::LocalList,
            toast: ToastManager::new(),
            server: config.server.base_url.clone(),
            should_quit: false,
            tx,
            rx: Some(rx),
            registry_rx: Some(registry_rx),
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        let (Some(mut rx), Some(mut registry_rx)) = (self.rx.take(), self.registry_rx.take())
        else {
            anyhow::bail!("app event loop already started");
        };

        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        // ── Background task: keyboard events ──────────────────────────────────
        let event_tx = self.tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        self.dispatch(Action::ReloadLocal);
        self.dispatch(Action::ReloadSpotify);

        // Toast expiry check
        let mut toast_tick = tokio::time::interval(Duration::from_millis(100));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    needs_redraw = self.handle_message(msg);
                    while let Ok(next) = rx.try_recv() {
                        needs_redraw |= self.handle_message(next);
                    }
                }

                Some(event) = registry_rx.recv() => {
                    needs_redraw = self.handle_registry_event(event);
                }

                _ = toast_tick.tick() => {
                    needs_redraw = self.toast.tick();
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        self.shutdown();
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        Ok(())
    }

    /// Cancel every poller and pending removal.
    pub fn shutdown(&mut self) {
        info!(
            "shutting down with {} merge(s) and {} conversion(s) in flight",
            self.registry.active_count(),
            self.state
                .conversions
                .values()
                .filter(|t| t.is_processing())
                .count()
        );
        self.registry.shutdown();
        for tracker in self.state.conversions.values_mut() {
            tracker.cancel();
        }
        self.sync_merges();
    }

    // ── Messages ──────────────────────────────────────────────────────────────

    /// Returns whether the screen needs a redraw.
    fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                for action in self.handle_key(key) {
                    self.dispatch(action);
                }
                true
            }
            AppMessage::Event(Event::Resize(..)) => true,
            AppMessage::Event(_) => false,

            AppMessage::LocalLoaded(state) => {
                self.state.local = state;
                self.local_list.sync(&self.state);
                true
            }
            AppMessage::SpotifyLoaded { generation, state } => {
                if generation != self.spotify_generation {
                    debug!(
                        "dropping stale spotify catalog (load {}, latest {})",
                        generation, self.spotify_generation
                    );
                    return false;
                }
                if let Some(err) = state.error() {
                    self.toast.error(err.to_string());
                }
                self.state.spotify = state;
                self.spotify_list.sync(&self.state);
                true
            }

            AppMessage::ConversionLaunched { file, result } => {
                self.on_conversion_launched(file, result);
                true
            }
            AppMessage::ConversionProgress {
                file,
                task_id,
                progress,
            } => self.on_conversion_progress(&file, &task_id, progress),

            AppMessage::MergeLaunched {
                source,
                target,
                result,
            } => {
                self.on_merge_launched(source, &target, result);
                true
            }
        }
    }

    fn handle_registry_event(&mut self, event: RegistryEvent) -> bool {
        let finished = match &event {
            RegistryEvent::Progress { key, progress, .. } if progress.is_terminal() => {
                Some((key.clone(), progress.clone()))
            }
            _ => None,
        };
        if !self.registry.apply(event) {
            return false;
        }
        if let Some((key, progress)) = finished {
            let name = self.state.playlist_name(&key).to_string();
            self.notify_finished(&name, &progress);
            if progress.status != TaskStatus::Error {
                // Track counts changed and the source may be gone.
                self.dispatch(Action::ReloadSpotify);
            }
        }
        self.sync_merges();
        true
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Char('q') if key.modifiers == KeyModifiers::NONE => return vec![Action::Quit],
            KeyCode::Char('c') if key.modifiers == KeyModifiers::CONTROL => {
                return vec![Action::Quit]
            }
            KeyCode::Tab | KeyCode::BackTab => return vec![Action::FocusNext],
            KeyCode::Char('1') => return vec![Action::FocusPane(ComponentId::LocalList)],
            KeyCode::Char('2') => return vec![Action::FocusPane(ComponentId::SpotifyList)],
            _ => {}
        }
        match self.focus {
            ComponentId::LocalList => self.local_list.handle_key(key, &self.state),
            ComponentId::SpotifyList => self.spotify_list.handle_key(key, &self.state),
        }
    }

    // ── Actions ───────────────────────────────────────────────────────────────

    fn dispatch(&mut self, action: Action) {
        match action {
            Action::FocusNext => self.focus = self.focus.next(),
            Action::FocusPane(id) => self.focus = id,
            Action::Quit => self.should_quit = true,

            Action::ReloadLocal => {
                self.state.local = LoadState::Loading;
                let api = Arc::clone(&self.api);
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let loaded = catalog::load_local(api.as_ref()).await;
                    let _ = tx.send(AppMessage::LocalLoaded(loaded));
                });
            }
            Action::ReloadSpotify => {
                if !self.state.spotify.is_loading() && self.state.spotify.items().is_empty() {
                    self.state.spotify = LoadState::Loading;
                }
                self.spotify_generation += 1;
                let generation = self.spotify_generation;
                let api = Arc::clone(&self.api);
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let state = catalog::load_spotify(api.as_ref()).await;
                    let _ = tx.send(AppMessage::SpotifyLoaded { generation, state });
                });
            }

            Action::ConvertFile(file) => self.start_conversion(file),
            Action::Merge { sources, target } => match target {
                Some(target) => {
                    for source in sources {
                        self.start_merge(source, &target);
                    }
                }
                None => self.toast.warning("Pick a target playlist first (t)"),
            },

            Action::CopyToClipboard(text) => {
                match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.clone())) {
                    Ok(()) => self.toast.success(format!("copied: {}", text)),
                    Err(e) => {
                        warn!("clipboard unavailable: {}", e);
                        self.toast.error("Clipboard unavailable");
                    }
                }
            }
            Action::Notify(severity, message) => self.toast.push(message, severity),
        }
    }

    // ── File conversion ───────────────────────────────────────────────────────

    fn start_conversion(&mut self, file: String) {
        let tracker = self.state.conversions.entry(file.clone()).or_default();
        if !tracker.begin_launch() {
            warn!("{}: conversion already in flight, ignoring", file);
            self.toast.info(format!("{} is already processing", file));
            return;
        }

        let launcher = self.launcher.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = launcher.start(&JobRequest::create_from_file(&file)).await;
            let _ = tx.send(AppMessage::ConversionLaunched { file, result });
        });
    }

    fn on_conversion_launched(&mut self, file: String, result: Result<TaskId, LaunchError>) {
        let Some(tracker) = self.state.conversions.get_mut(&file) else {
            return;
        };
        match result {
            Ok(task_id) => {
                let tx = self.tx.clone();
                let update_file = file.clone();
                let update_task = task_id.clone();
                tracker.begin_polling(&self.poller, task_id, move |progress| {
                    let _ = tx.send(AppMessage::ConversionProgress {
                        file: update_file.clone(),
                        task_id: update_task.clone(),
                        progress,
                    });
                });
            }
            Err(e) => {
                let message = e.user_message(JobKind::CreateFromFile);
                tracker.launch_failed(message.clone());
                self.toast.error(message);
            }
        }
    }

    fn on_conversion_progress(&mut self, file: &str, task_id: &TaskId, progress: TaskProgress) -> bool {
        let Some(tracker) = self.state.conversions.get_mut(file) else {
            return false;
        };
        let terminal = progress.is_terminal();
        if !tracker.apply(task_id, progress) {
            return false;
        }
        if terminal {
            let progress = tracker.progress().clone();
            self.notify_finished(file, &progress);
        }
        true
    }

    // ── Merges ────────────────────────────────────────────────────────────────

    fn start_merge(&mut self, source: String, target: &str) {
        let request = JobRequest::merge(source.as_str(), target);
        if request.is_self_merge() {
            warn!("{}: refusing to merge a playlist into itself", source);
            self.toast
                .warning(LaunchError::SelfMerge.user_message(JobKind::Merge));
            return;
        }
        if !self.registry.reserve(&source) {
            let name = self.state.playlist_name(&source).to_string();
            self.toast.info(format!("{} is already merging", name));
            return;
        }
        self.sync_merges();

        let launcher = self.launcher.clone();
        let tx = self.tx.clone();
        let target = target.to_string();
        tokio::spawn(async move {
            let result = launcher.start(&request).await;
            let _ = tx.send(AppMessage::MergeLaunched {
                source,
                target,
                result,
            });
        });
    }

    fn on_merge_launched(&mut self, source: String, target: &str, result: Result<TaskId, LaunchError>) {
        match result {
            Ok(task_id) => {
                let message = format!(
                    "Merging {} into {}",
                    self.state.playlist_name(&source),
                    self.state.playlist_name(target)
                );
                if self.registry.begin_tracking(source, task_id) {
                    self.toast.info(message);
                }
            }
            Err(e) => {
                self.registry.release(&source);
                self.toast.error(e.user_message(JobKind::Merge));
            }
        }
        self.sync_merges();
    }

    fn sync_merges(&mut self) {
        self.state.merges = self.registry.snapshot().clone();
        self.state.merges_launching = self.registry.launching().map(str::to_string).collect();
    }

    fn notify_finished(&mut self, name: &str, progress: &TaskProgress) {
        let severity = match progress.status {
            TaskStatus::Completed => Severity::Success,
            TaskStatus::CompletedWithWarning => Severity::Warning,
            TaskStatus::Processing | TaskStatus::Error => Severity::Error,
        };
        self.toast
            .push(format!("{}: {}", name, progress.message), severity);
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(outer[0]);

        let focus = self.focus;
        self.local_list.draw(
            frame,
            panes[0],
            focus == self.local_list.id(),
            &self.state,
        );
        self.spotify_list.draw(
            frame,
            panes[1],
            focus == self.spotify_list.id(),
            &self.state,
        );

        status_bar::draw_separator(frame, outer[1]);
        let active = self.registry.active_count()
            + self
                .state
                .conversions
                .values()
                .filter(|t| t.is_processing())
                .count();
        status_bar::draw_keys_bar(frame, outer[2], focus, &self.server, active);

        self.toast.draw(frame, area);
    }
}
