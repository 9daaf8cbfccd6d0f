use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Default transfer block size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Terminal-job notification settings (optional `[notify]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook receiving a JSON embed per finished job. None = log only.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Notify for completed jobs.
    #[serde(default = "default_true")]
    pub notify_success: bool,
    /// Notify for failed and cancelled jobs.
    #[serde(default = "default_true")]
    pub notify_failure: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            notify_success: true,
            notify_failure: true,
        }
    }
}

/// Global configuration loaded from `~/.config/shuttle/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShuttleConfig {
    /// Idle sleep between queue polls when nothing is queued.
    pub poll_interval_secs: u64,
    /// Sleep after a failed scheduling iteration before polling again.
    pub fault_backoff_secs: u64,
    /// How long `stop` waits for the worker thread to exit.
    pub stop_timeout_secs: u64,
    /// Transfer block size in bytes; also the worst-case cancellation latency.
    pub chunk_size_bytes: usize,
    /// Error messages longer than this (in chars) are truncated before storage.
    pub max_error_len: usize,
    /// Per-subscriber event buffer; a subscriber that falls this far behind is dropped.
    pub subscriber_buffer: usize,
    /// Remove partial destination content on failure too, not only on cancellation.
    #[serde(default)]
    pub cleanup_on_failure: bool,
    /// Job database location (None = `~/.local/state/shuttle/jobs.db`).
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// Storage root sources are taken from. Relative submissions resolve
    /// against it and absolute ones must stay inside it. None = unrestricted.
    #[serde(default)]
    pub source_root: Option<PathBuf>,
    /// Storage root destinations are written under (same rules as `source_root`).
    #[serde(default)]
    pub destination_root: Option<PathBuf>,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Default for ShuttleConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            fault_backoff_secs: 5,
            stop_timeout_secs: 5,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            max_error_len: 2000,
            subscriber_buffer: 256,
            cleanup_on_failure: false,
            db_path: None,
            source_root: None,
            destination_root: None,
            notify: NotifyConfig::default(),
        }
    }
}

impl ShuttleConfig {
    /// Idle wait with a one-second floor; a zero would make the worker spin.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Same floor as `poll_interval`.
    pub fn fault_backoff(&self) -> Duration {
        Duration::from_secs(self.fault_backoff_secs.max(1))
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Chunk size with a floor of one byte so a zero in config can't stall the copy loop.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size_bytes.max(1)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("shuttle")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ShuttleConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ShuttleConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: ShuttleConfig = toml::from_str(&data)?;
    Ok(cfg)
}
