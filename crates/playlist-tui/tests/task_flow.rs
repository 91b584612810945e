//! End-to-end task flows against an in-process mock of the playlist server.
//!
//! The mock speaks the same JSON as the real server, including failure
//! bodies sent with 4xx/5xx codes. Intervals are shortened so the whole
//! suite runs in well under a second per test.
//!
//! Run with: cargo test --test task_flow

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use playlist_proto::protocol::{JobRequest, TaskId, TaskProgress, TaskStatus};
use playlist_tui::api::{ApiError, HttpApi, PlaylistApi};
use playlist_tui::catalog::{load_local, load_spotify};
use playlist_tui::launcher::{LaunchError, TaskLauncher};
use playlist_tui::poller::TaskPoller;
use playlist_tui::registry::{KeyState, RegistryEvent, TaskRegistry};

const POLL: Duration = Duration::from_millis(50);
const GRACE: Duration = Duration::from_millis(200);
const DEADLINE: Duration = Duration::from_secs(5);

// ── Mock server ───────────────────────────────────────────────────────────────

#[derive(Default)]
struct MockServer {
    launched: Vec<Value>,
    progress: HashMap<String, VecDeque<Value>>,
    progress_hits: HashMap<String, usize>,
    next_task: usize,
    drop_local_playlists: bool,
}

type Shared = Arc<Mutex<MockServer>>;

async fn merge_playlists(State(mock): State<Shared>, Json(body): Json<Value>) -> Response {
    if body["source_playlist_id"] == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"status": "error", "message": "Source playlist not found"})),
        )
            .into_response();
    }
    launch(&mock, body)
}

async fn create_playlist_from_file(State(mock): State<Shared>, Json(body): Json<Value>) -> Response {
    launch(&mock, body)
}

fn launch(mock: &Shared, body: Value) -> Response {
    let mut mock = mock.lock().unwrap();
    mock.launched.push(body);
    mock.next_task += 1;
    let task_id = format!("task-{}", mock.next_task);
    Json(json!({"status": "success", "task_id": task_id})).into_response()
}

async fn playlist_progress(State(mock): State<Shared>, Path(task_id): Path<String>) -> Response {
    let mut mock = mock.lock().unwrap();
    *mock.progress_hits.entry(task_id.clone()).or_default() += 1;
    if task_id == "broken" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "<h1>Internal Server Error</h1>").into_response();
    }
    let body = mock
        .progress
        .get_mut(&task_id)
        .and_then(|queue| queue.pop_front())
        .unwrap_or_else(|| json!({"status": "processing", "progress": 0, "message": "Waiting"}));
    Json(body).into_response()
}

async fn local_playlists(State(mock): State<Shared>) -> Json<Value> {
    if mock.lock().unwrap().drop_local_playlists {
        return Json(json!({"status": "success"}));
    }
    Json(json!({"status": "success", "playlists": ["kexp.csv", "nts1.csv"]}))
}

async fn spotify_playlists() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"status": "error", "message": "Not authenticated"})),
    )
        .into_response()
}

async fn start_mock() -> (Shared, SocketAddr) {
    let mock: Shared = Arc::new(Mutex::new(MockServer::default()));
    let app = Router::new()
        .route("/merge_playlists", post(merge_playlists))
        .route("/create_playlist_from_file", post(create_playlist_from_file))
        .route("/playlist_progress/:task_id", get(playlist_progress))
        .route("/api/playlists", get(local_playlists))
        .route("/spotify_playlists", get(spotify_playlists))
        .with_state(Arc::clone(&mock));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (mock, addr)
}

fn script(mock: &Shared, task_id: &str, bodies: Vec<Value>) {
    mock.lock()
        .unwrap()
        .progress
        .entry(task_id.to_string())
        .or_default()
        .extend(bodies);
}

fn client(addr: SocketAddr) -> Arc<HttpApi> {
    Arc::new(HttpApi::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_catalogs_over_http() {
    let (_mock, addr) = start_mock().await;
    let api = client(addr);

    let local = load_local(api.as_ref()).await;
    assert_eq!(local.items(), ["kexp.csv".to_string(), "nts1.csv".to_string()]);

    let spotify = load_spotify(api.as_ref()).await;
    assert_eq!(spotify.error(), Some("Not authenticated"));
}

#[tokio::test]
async fn test_success_without_playlists_is_malformed() {
    let (mock, addr) = start_mock().await;
    mock.lock().unwrap().drop_local_playlists = true;
    let api = client(addr);

    assert!(matches!(
        api.local_playlists().await,
        Err(ApiError::Malformed(_))
    ));
    assert_eq!(
        load_local(api.as_ref()).await.error(),
        Some("Failed to load playlist files")
    );
}

#[tokio::test]
async fn test_merge_tracked_to_removal() {
    let (mock, addr) = start_mock().await;
    script(
        &mock,
        "task-1",
        vec![
            json!({"status": "processing", "progress": 40, "message": "Merging..."}),
            json!({"status": "completed", "progress": 100, "message": "Done"}),
        ],
    );
    let api = client(addr);
    let launcher = TaskLauncher::new(Arc::clone(&api));
    let (mut registry, mut events) = TaskRegistry::new(TaskPoller::new(Arc::clone(&api), POLL), GRACE);

    assert!(registry.reserve("src"));
    let task_id = launcher
        .start(&JobRequest::merge("src", "dst"))
        .await
        .unwrap();
    assert_eq!(task_id, TaskId::new("task-1"));
    assert!(registry.begin_tracking("src", task_id));

    let mut seen = Vec::new();
    tokio::time::timeout(DEADLINE, async {
        while let Some(event) = events.recv().await {
            let expired = matches!(event, RegistryEvent::Expired { .. });
            if let RegistryEvent::Progress { progress, .. } = &event {
                seen.push(progress.clone());
            }
            registry.apply(event);
            if expired {
                break;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].progress, 40);
    assert_eq!(seen[1].status, TaskStatus::Completed);
    assert_eq!(registry.key_state("src"), KeyState::Idle);
    assert!(registry.snapshot().is_empty());

    let mock = mock.lock().unwrap();
    assert_eq!(
        mock.launched,
        vec![json!({"source_playlist_id": "src", "target_playlist_id": "dst"})]
    );
    assert_eq!(mock.progress_hits["task-1"], 2);
}

#[tokio::test]
async fn test_rejected_launch_carries_server_message() {
    let (mock, addr) = start_mock().await;
    let launcher = TaskLauncher::new(client(addr));

    let err = launcher
        .start(&JobRequest::merge("missing", "dst"))
        .await
        .unwrap_err();
    assert_eq!(err, LaunchError::Rejected(Some("Source playlist not found".into())));
    assert_eq!(
        err.user_message(playlist_proto::protocol::JobKind::Merge),
        "Source playlist not found"
    );
    assert!(mock.lock().unwrap().launched.is_empty());
}

#[tokio::test]
async fn test_conversion_launch_and_poll() {
    let (mock, addr) = start_mock().await;
    script(
        &mock,
        "task-1",
        vec![json!({"status": "completed", "progress": 100.0, "message": "Playlist created"})],
    );
    let api = client(addr);
    let launcher = TaskLauncher::new(Arc::clone(&api));
    let poller = TaskPoller::new(Arc::clone(&api), POLL);

    let task_id = launcher
        .start(&JobRequest::create_from_file("kexp.csv"))
        .await
        .unwrap();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _handle = poller.run(task_id, move |p| {
        let _ = tx.send(p);
    });

    let last = tokio::time::timeout(DEADLINE, rx.recv()).await.unwrap().unwrap();
    assert_eq!(last, TaskProgress::new(TaskStatus::Completed, 100, "Playlist created"));
    assert_eq!(
        mock.lock().unwrap().launched,
        vec![json!({"file_name": "kexp.csv"})]
    );
}

#[tokio::test]
async fn test_malformed_progress_ends_polling_with_error() {
    let (mock, addr) = start_mock().await;
    let poller = TaskPoller::new(client(addr), POLL);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _handle = poller.run(TaskId::new("broken"), move |p| {
        let _ = tx.send(p);
    });

    let update = tokio::time::timeout(DEADLINE, rx.recv()).await.unwrap().unwrap();
    assert_eq!(update, TaskProgress::poll_failure());
    assert!(tokio::time::timeout(DEADLINE, rx.recv()).await.unwrap().is_none());

    tokio::time::sleep(POLL * 4).await;
    assert_eq!(mock.lock().unwrap().progress_hits["broken"], 1);
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_failure() {
    // Bind then drop to get a port nobody listens on.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let api = client(addr);

    assert!(matches!(
        api.local_playlists().await,
        Err(ApiError::Transport(_))
    ));

    let err = TaskLauncher::new(api)
        .start(&JobRequest::create_from_file("kexp.csv"))
        .await
        .unwrap_err();
    assert!(matches!(err, LaunchError::Transport(_)));
    assert_eq!(
        err.user_message(playlist_proto::protocol::JobKind::CreateFromFile),
        "An error occurred while creating the playlist"
    );
}
