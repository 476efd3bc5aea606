//! Configuration management
//!
//! Fixed tuning constants live in the submodules below; user-tunable
//! settings are persisted as `config.json` in the platform config dir.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;

/// Directory name under the platform config dir
pub const APP_DIR: &str = "iptv_grid";

/// Keys of the persisted key-value store
pub mod keys {
    /// Serialized station collection (full snapshot)
    pub const STATIONS: &str = "media_autoload";
    /// Index of the station last opened in the player
    pub const LAST_INDEX: &str = "last_index";
}

/// Network-related configuration
pub mod network {
    use std::time::Duration;

    /// Budget for a single reachability probe
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

    /// Budget for a server ping against the stream origin
    pub const PING_TIMEOUT: Duration = Duration::from_secs(5);

    /// Budget for downloading a remote playlist
    pub const PLAYLIST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Stack for each probe thread; one thread runs per station
    pub const PROBE_STACK_SIZE: usize = 512 * 1024;

    /// Budget for fetching a station logo
    pub const LOGO_TIMEOUT: Duration = Duration::from_secs(10);

    /// Largest logo body accepted
    pub const MAX_LOGO_BYTES: u64 = 2 * 1024 * 1024;

    /// Logo downloads allowed in flight at once
    pub const MAX_LOGO_FETCHES: usize = 16;

    pub const DEFAULT_USER_AGENT: &str = concat!("IPTV-Grid/", env!("CARGO_PKG_VERSION"));
}

/// Stream monitor configuration
pub mod monitor {
    use std::time::Duration;

    /// Cadence of the bitrate/buffer estimation
    pub const STATS_INTERVAL: Duration = Duration::from_secs(1);

    /// Cadence of the server ping
    pub const PING_INTERVAL: Duration = Duration::from_secs(5);

    /// Samples retained per series
    pub const HISTORY_CAPACITY: usize = 100;

    /// Most recent bitrate samples used for the graph's vertical scale
    pub const SCALE_WINDOW: usize = 30;

    /// Proxy factor applied to buffered-depth growth (seconds -> "bit/s")
    pub const BITRATE_FACTOR: f64 = 160.0;

    pub const HEALTHY_BITRATE: f64 = 200.0;
    pub const CAUTION_BITRATE: f64 = 100.0;

    /// Estimates below this value raise the low-bitrate alarm
    pub const LOW_BITRATE: f64 = 50.0;

    /// A low-bitrate episode longer than this forces a session reload
    pub const LOW_BITRATE_RELOAD_AFTER: Duration = Duration::from_secs(10);

    /// Half-period of the alarm indicator blink
    pub const BLINK_PERIOD: Duration = Duration::from_millis(500);

    /// Minimum vertical scale of both graphs
    pub const SCALE_FLOOR: f64 = 100.0;
}

/// UI-related configuration
pub mod ui {
    /// Logo used when a playlist entry carries none
    pub const PLACEHOLDER_LOGO: &str = "https://via.placeholder.com/140x80?text=Channel";

    /// Decoded logos are scaled down to fit this many pixels per side
    pub const LOGO_MAX_SIDE: u32 = 256;

    /// Lines kept in the diagnostics console
    pub const CONSOLE_LOG_LIMIT: usize = 500;

    pub const EXPORT_FILE_NAME: &str = "playlist_backup.json";

    /// Scheme used for shareable player links
    pub const SHARE_LINK_PREFIX: &str = "iptv-grid://player?";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_true")]
    pub dark_mode: bool,
    #[serde(default = "default_true")]
    pub alert_sound: bool,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Overrides the location of the persisted station store
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

fn default_user_agent() -> String { network::DEFAULT_USER_AGENT.to_string() }
fn default_true() -> bool { true }
fn default_probe_timeout_ms() -> u64 { network::PROBE_TIMEOUT.as_millis() as u64 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            dark_mode: true,
            alert_sound: true,
            probe_timeout_ms: default_probe_timeout_ms(),
            store_dir: None,
        }
    }
}

/// Platform config directory for the app (not created)
pub fn config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

/// Default location of the persisted station store
pub fn default_store_dir() -> PathBuf {
    config_dir().join("store")
}

impl AppConfig {
    fn config_path() -> PathBuf {
        config_dir().join("config.json")
    }

    /// Load settings, falling back to defaults when missing or unreadable
    pub fn load() -> Self {
        let path = Self::config_path();

        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms.max(1))
    }

    pub fn store_dir(&self) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(default_store_dir)
    }
}
