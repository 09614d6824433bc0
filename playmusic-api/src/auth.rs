//! Session cache: persists the gateway session token to disk.
//!
//! The cache file is stored at `~/.config/playmusic/session.json` and contains:
//!
//! ```json
//! { "username": "me@example.com", "token": "ya29.a0Af..." }
//! ```
//!
//! The password itself is never written anywhere. It is sent once to
//! [`GatewayClient::login`](crate::GatewayClient::login), which exchanges it
//! for the token cached here. A rejected token surfaces as
//! [`ApiError::AuthFailure`] and the front-end prompts again.

use crate::error::{ApiError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persistent login session backed by a JSON file on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SessionCache {
    /// Account the token was issued for; shown as the prompt default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Gateway session token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SessionCache {
    /// Load the session from `~/.config/playmusic/session.json`.
    ///
    /// Returns a default (empty) session if the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load the session from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Save the session to disk, creating parent directories if needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Delete the session file from disk.
    pub fn clear() -> Result<()> {
        let path = Self::path()?;
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Check whether a token is present (does not validate it).
    pub fn is_logged_in(&self) -> bool {
        self.token.as_ref().is_some_and(|t| !t.is_empty())
    }

    fn path() -> Result<PathBuf> {
        let config = dirs::config_dir()
            .ok_or_else(|| ApiError::Other("cannot determine config directory".into()))?;
        Ok(config.join("playmusic").join("session.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionCache::load_from(&dir.path().join("nope.json")).unwrap();
        assert!(!session.is_logged_in());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let session = SessionCache {
            username: Some("me@example.com".into()),
            token: Some("tok".into()),
        };
        session.save_to(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("password"));
        assert_eq!(SessionCache::load_from(&path).unwrap(), session);
    }

    #[test]
    fn empty_token_is_not_logged_in() {
        let session = SessionCache {
            username: None,
            token: Some(String::new()),
        };
        assert!(!session.is_logged_in());
    }
}
