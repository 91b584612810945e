use std::sync::Arc;

use playlist_proto::config::Config;
use playlist_tui::{api::HttpApi, app::App};

// Pollers share the event loop's thread; `CancelHandle::cancel` relies on it.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().unwrap_or_default();

    let log_path = config.paths.log_file.clone();
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress noisy
    // connection-level DEBUG from HTTP client internals (hyper_util, reqwest).
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("plsync log: {}", log_path.display());

    tracing::info!(
        "plsync starting against {} (poll every {:?}, keep finished for {:?})",
        config.server.base_url,
        config.poll_interval(),
        config.removal_grace()
    );

    let api = HttpApi::new(&config.server.base_url, config.request_timeout())?;
    let app = App::new(Arc::new(api), &config);
    app.run().await?;

    Ok(())
}
