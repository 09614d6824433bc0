//! Application settings, persisted at `~/.config/playmusic/config.json`.
//!
//! Every field is optional in the file:
//!
//! ```json
//! {
//!   "gateway_url": "http://127.0.0.1:9999",
//!   "backend": "vlc",
//!   "vlc_path": "vlc",
//!   "poll_interval_ms": 100,
//!   "station_tracks": 25,
//!   "download_dir": "/home/me/Music",
//!   "device_id": "Pixel"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gateway_url: String,
    pub backend: BackendKind,
    /// Executable started by the VLC backend.
    pub vlc_path: PathBuf,
    pub poll_interval_ms: u64,
    /// Number of tracks requested when a station starts.
    pub station_tracks: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
    /// Preferred device, matched by id or friendly name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway_url: playmusic_api::DEFAULT_GATEWAY.to_owned(),
            backend: BackendKind::Vlc,
            vlc_path: PathBuf::from("vlc"),
            poll_interval_ms: 100,
            station_tracks: 25,
            download_dir: None,
            device_id: None,
        }
    }
}

impl AppConfig {
    /// Load from the default location; a missing file yields the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        if config.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".into()));
        }
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn path() -> Result<PathBuf> {
        let config = dirs::config_dir()
            .ok_or_else(|| Error::Config("cannot determine config directory".into()))?;
        Ok(config.join("playmusic").join("config.json"))
    }
}
