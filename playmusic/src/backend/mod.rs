//! Media playback backends.
//!
//! The playback engine drives a [`MediaBackend`]; which one is chosen at
//! startup from [`BackendKind`]. Positions and durations are milliseconds.

#[cfg(feature = "native")]
mod native;
mod vlc;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::{Error, Result};

#[cfg(feature = "native")]
pub use native::NativeBackend;
pub use vlc::VlcBackend;

pub trait MediaBackend {
    /// Replace the current media with `url`. Does not start playback.
    fn load_url(&mut self, url: &str) -> Result<()>;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn unpause(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Whether media is loaded and not finished (paused counts as playing).
    fn is_playing(&mut self) -> bool;

    /// Length of the loaded media, when the backend knows it.
    fn duration_ms(&mut self) -> Option<u64>;

    /// Current position, when the backend can report it.
    fn position_ms(&mut self) -> Option<u64>;

    /// Seek to `ms`. An error means playback is no longer in a usable state.
    fn set_position(&mut self, ms: u64) -> Result<()>;
}

impl<B: MediaBackend + ?Sized> MediaBackend for Box<B> {
    fn load_url(&mut self, url: &str) -> Result<()> {
        (**self).load_url(url)
    }
    fn play(&mut self) -> Result<()> {
        (**self).play()
    }
    fn pause(&mut self) -> Result<()> {
        (**self).pause()
    }
    fn unpause(&mut self) -> Result<()> {
        (**self).unpause()
    }
    fn stop(&mut self) -> Result<()> {
        (**self).stop()
    }
    fn is_playing(&mut self) -> bool {
        (**self).is_playing()
    }
    fn duration_ms(&mut self) -> Option<u64> {
        (**self).duration_ms()
    }
    fn position_ms(&mut self) -> Option<u64> {
        (**self).position_ms()
    }
    fn set_position(&mut self, ms: u64) -> Result<()> {
        (**self).set_position(ms)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Default audio output through rodio (requires the `native` feature).
    Native,
    /// An external `vlc` process driven over its remote-control interface.
    #[default]
    Vlc,
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "native" | "player" => Ok(Self::Native),
            "vlc" | "player_vlc" | "player-vlc" => Ok(Self::Vlc),
            other => Err(Error::Config(format!("unknown backend {other:?}"))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Native => "native",
            Self::Vlc => "vlc",
        })
    }
}

/// Construct the backend selected by `kind`.
pub fn open_backend(kind: BackendKind, config: &AppConfig) -> Result<Box<dyn MediaBackend>> {
    match kind {
        BackendKind::Vlc => Ok(Box::new(VlcBackend::new(&config.vlc_path))),
        #[cfg(feature = "native")]
        BackendKind::Native => Ok(Box::new(NativeBackend::new()?)),
        #[cfg(not(feature = "native"))]
        BackendKind::Native => Err(Error::Backend(
            "built without the `native` feature; use the vlc backend".into(),
        )),
    }
}
