//! Data types for account gateway responses.
//!
//! Field names follow Rust conventions (`snake_case`) rather than the
//! camelCase the cloud library uses on the wire. Parsing is done by hand in
//! the endpoint modules because the library is loose about types: numeric
//! fields such as `durationMillis` or `trackNumber` frequently arrive as
//! strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One playable item from the library snapshot, a store search or a station.
///
/// Exactly one of `id`, `store_id` or `episode_id` is normally present; the
/// first present one is the track's identity (see [`Track::identity`]).
///
/// API JSON fields: `id`, `storeId`, `episodeId`, `title`, `artist`,
/// `albumArtist`, `album`, `genre`, `year`, `trackNumber`, `discNumber`,
/// `durationMillis`, `albumArtRef`, `artistArtRef`, `art`,
/// `publicationTimestampMillis`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Library (uploaded or added) track id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Store catalogue id (tracks from stations or the store).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<String>,
    /// Podcast episode id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<String>,
    pub title: String,
    pub artist: String,
    pub album_artist: String,
    pub album: String,
    pub genre: String,
    /// Release year, `0` when unknown.
    pub year: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disc_number: Option<u32>,
    pub duration_ms: u64,
    /// Album cover URLs (`albumArtRef[].url`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub album_art: Vec<String>,
    /// Artist image URLs (`artistArtRef[].url`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artist_art: Vec<String>,
    /// Generic art URLs (`art[].url`, used by podcast episodes).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub art: Vec<String>,
    /// Publication time of podcast episodes, in milliseconds since the epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_ms: Option<i64>,
}

impl Track {
    /// The track's identity: the first present of `id`, `store_id`, `episode_id`.
    ///
    /// Empty strings count as absent.
    pub fn identity(&self) -> Option<TrackId<'_>> {
        fn present(v: Option<&String>) -> Option<&str> {
            v.map(String::as_str).filter(|s| !s.is_empty())
        }
        present(self.id.as_ref())
            .map(TrackId::Library)
            .or_else(|| present(self.store_id.as_ref()).map(TrackId::Store))
            .or_else(|| present(self.episode_id.as_ref()).map(TrackId::Episode))
    }

    /// First available cover art URL: album art, then artist art, then generic art.
    pub fn cover_url(&self) -> Option<&str> {
        self.album_art
            .first()
            .or_else(|| self.artist_art.first())
            .or_else(|| self.art.first())
            .map(String::as_str)
    }
}

/// Borrowed identity of a [`Track`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackId<'a> {
    Library(&'a str),
    Store(&'a str),
    Episode(&'a str),
}

impl<'a> TrackId<'a> {
    /// The raw id string.
    pub fn as_str(self) -> &'a str {
        match self {
            Self::Library(id) | Self::Store(id) | Self::Episode(id) => id,
        }
    }

    /// Episodes are streamed through the podcast endpoint.
    pub fn is_episode(self) -> bool {
        matches!(self, Self::Episode(_))
    }
}

impl fmt::Display for TrackId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a registered device.
///
/// API JSON field `type`: `ANDROID`, `IOS`, `DESKTOP_APP`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    Android,
    Ios,
    Desktop,
    Other,
}

impl DeviceKind {
    pub fn from_api(s: &str) -> Self {
        match s {
            "ANDROID" => Self::Android,
            "IOS" => Self::Ios,
            "DESKTOP_APP" => Self::Desktop,
            _ => Self::Other,
        }
    }

    /// Only mobile devices may authorize stream URLs.
    pub fn is_mobile(self) -> bool {
        matches!(self, Self::Android | Self::Ios)
    }
}

/// A device registered on the account.
///
/// Returned by [`MusicService::get_registered_devices`](crate::MusicService::get_registered_devices).
///
/// API JSON fields: `type`, `id`, `friendlyName`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub kind: DeviceKind,
    /// Raw device id. Android ids carry a `0x` prefix.
    pub id: String,
    pub friendly_name: String,
}

impl Device {
    /// The id to pass to stream URL requests, without the `0x` prefix.
    pub fn stream_id(&self) -> &str {
        self.id.strip_prefix("0x").unwrap_or(&self.id)
    }
}

/// A user playlist with its entries.
///
/// Returned by [`MusicService::get_all_user_playlist_contents`](crate::MusicService::get_all_user_playlist_contents).
///
/// API JSON fields: `id`, `name`, `tracks` (array of `{ trackId }`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    /// Library track ids, in playlist order.
    pub entries: Vec<String>,
}

/// A radio station.
///
/// API JSON fields: `id`, `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
}

/// Username and password, held in memory only for the login call.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
