use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tasks: TaskConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Where the playlist server lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Task polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Delay before the first progress request and between requests.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long a finished merge stays visible before it is dropped.
    #[serde(default = "default_removal_grace_ms")]
    pub removal_grace_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            removal_grace_ms: default_removal_grace_ms(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl TaskConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn removal_grace(&self) -> Duration {
        Duration::from_millis(self.removal_grace_ms)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8001".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_removal_grace_ms() -> u64 {
    5000
}

fn default_log_file() -> PathBuf {
    platform::data_dir().join("plsync.log")
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Read the config at `path`, writing the defaults there first if the
    /// file does not exist yet.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    pub fn poll_interval(&self) -> Duration {
        self.tasks.poll_interval()
    }

    pub fn removal_grace(&self) -> Duration {
        self.tasks.removal_grace()
    }

    pub fn request_timeout(&self) -> Duration {
        self.server.request_timeout()
    }
}
