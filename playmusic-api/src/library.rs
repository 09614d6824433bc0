//! Library, playlist and station APIs.
//!
//! # Endpoints
//!
//! ## `all_songs`: `GET /library/tracks`
//!
//! Response:
//! ```json
//! {
//!   "tracks": [{
//!     "id": "7d8f...", "title": "Song", "artist": "Artist",
//!     "albumArtist": "Artist", "album": "Album", "genre": "Rock",
//!     "year": 1999, "trackNumber": 3, "discNumber": 1,
//!     "durationMillis": "215000",
//!     "albumArtRef": [{ "url": "https://..." }]
//!   }]
//! }
//! ```
//!
//! ## `playlists`: `GET /playlists`
//!
//! Response: `{ "playlists": [{ "id": "...", "name": "...", "tracks": [{ "trackId": "..." }] }] }`
//!
//! ## `stations`: `GET /stations`
//!
//! Response: `{ "stations": [{ "id": "...", "name": "..." }] }`
//!
//! ## `station_tracks`: `GET /stations/{id}/tracks?num=25`
//!
//! Response: `{ "tracks": [ ...track objects, usually with `storeId`... ] }`

use crate::client::GatewayClient;
use crate::error::Result;
use crate::types::{Playlist, Station, Track};
use serde_json::Value;

impl GatewayClient {
    /// Fetch the whole library snapshot.
    pub fn all_songs(&self) -> Result<Vec<Track>> {
        let resp = self.get("/library/tracks")?;
        Ok(parse_tracks(&resp["tracks"]))
    }

    /// Fetch every user playlist with its entries.
    pub fn playlists(&self) -> Result<Vec<Playlist>> {
        let resp = self.get("/playlists")?;
        let Some(arr) = resp["playlists"].as_array() else {
            return Ok(vec![]);
        };
        Ok(arr
            .iter()
            .map(|p| Playlist {
                id: text(&p["id"]),
                name: text(&p["name"]),
                entries: p["tracks"]
                    .as_array()
                    .map(|entries| {
                        entries
                            .iter()
                            .filter_map(|e| e["trackId"].as_str().map(String::from))
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect())
    }

    /// Fetch the account's radio stations.
    pub fn stations(&self) -> Result<Vec<Station>> {
        let resp = self.get("/stations")?;
        let Some(arr) = resp["stations"].as_array() else {
            return Ok(vec![]);
        };
        Ok(arr
            .iter()
            .map(|s| Station {
                id: text(&s["id"]),
                name: text(&s["name"]),
            })
            .collect())
    }

    /// Fetch `num_tracks` tracks generated by a station.
    pub fn station_tracks(&self, station_id: &str, num_tracks: u32) -> Result<Vec<Track>> {
        let path = format!(
            "/stations/{}/tracks?num={num_tracks}",
            urlencoding::encode(station_id)
        );
        let resp = self.get(&path)?;
        Ok(parse_tracks(&resp["tracks"]))
    }
}

pub(crate) fn parse_tracks(v: &Value) -> Vec<Track> {
    v.as_array()
        .map(|arr| arr.iter().map(parse_track).collect())
        .unwrap_or_default()
}

pub(crate) fn parse_track(v: &Value) -> Track {
    Track {
        id: opt_text(&v["id"]),
        store_id: opt_text(&v["storeId"]),
        episode_id: opt_text(&v["episodeId"]),
        title: text(&v["title"]),
        artist: text(&v["artist"]),
        album_artist: text(&v["albumArtist"]),
        album: text(&v["album"]),
        genre: text(&v["genre"]),
        year: number(&v["year"])
            .and_then(|y| u32::try_from(y).ok())
            .unwrap_or(0),
        track_number: number(&v["trackNumber"]).and_then(|n| u32::try_from(n).ok()),
        disc_number: number(&v["discNumber"]).and_then(|n| u32::try_from(n).ok()),
        duration_ms: number(&v["durationMillis"]).unwrap_or(0),
        album_art: art_urls(&v["albumArtRef"]),
        artist_art: art_urls(&v["artistArtRef"]),
        art: art_urls(&v["art"]),
        published_ms: v["publicationTimestampMillis"]
            .as_i64()
            .or_else(|| v["publicationTimestampMillis"].as_str()?.parse().ok()),
    }
}

fn text(v: &Value) -> String {
    v.as_str().unwrap_or("").to_owned()
}

fn opt_text(v: &Value) -> Option<String> {
    v.as_str().filter(|s| !s.is_empty()).map(String::from)
}

/// Numbers arrive either as JSON numbers or as decimal strings.
fn number(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| v.as_str()?.trim().parse().ok())
}

fn art_urls(v: &Value) -> Vec<String> {
    v.as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|a| a["url"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionCache;
    use serde_json::json;

    fn client(server: &mockito::Server) -> GatewayClient {
        let session = SessionCache {
            username: None,
            token: Some("tok".into()),
        };
        GatewayClient::with_session(&server.url(), &session).unwrap()
    }

    #[test]
    fn parse_track_accepts_string_numbers() {
        let t = parse_track(&json!({
            "id": "abc",
            "title": "Song",
            "artist": "X",
            "albumArtist": "X",
            "album": "Y",
            "genre": "Rock",
            "year": "1999",
            "trackNumber": "3",
            "discNumber": 2,
            "durationMillis": "215000",
            "albumArtRef": [{ "url": "https://img/a.jpg" }]
        }));
        assert_eq!(t.id.as_deref(), Some("abc"));
        assert_eq!(t.year, 1999);
        assert_eq!(t.track_number, Some(3));
        assert_eq!(t.disc_number, Some(2));
        assert_eq!(t.duration_ms, 215_000);
        assert_eq!(t.album_art, vec!["https://img/a.jpg".to_owned()]);
    }

    #[test]
    fn parse_track_defaults_missing_fields() {
        let t = parse_track(&json!({ "episodeId": "ep1", "title": "Episode" }));
        assert_eq!(t.id, None);
        assert_eq!(t.episode_id.as_deref(), Some("ep1"));
        assert_eq!(t.year, 0);
        assert_eq!(t.track_number, None);
        assert!(t.album_art.is_empty());
    }

    #[test]
    fn all_songs_parses_library() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/library/tracks")
            .with_body(r#"{"tracks":[{"id":"1","title":"A"},{"id":"2","title":"B"}]}"#)
            .create();

        let songs = client(&server).all_songs().unwrap();
        let titles: Vec<_> = songs.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["A", "B"]);
    }

    #[test]
    fn playlists_keep_entry_order() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/playlists")
            .with_body(
                r#"{"playlists":[{"id":"p","name":"Mix","tracks":[{"trackId":"2"},{"trackId":"1"}]}]}"#,
            )
            .create();

        let lists = client(&server).playlists().unwrap();
        assert_eq!(lists[0].name, "Mix");
        assert_eq!(lists[0].entries, ["2", "1"]);
    }

    #[test]
    fn station_tracks_passes_count() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/stations/st1/tracks")
            .match_query(mockito::Matcher::UrlEncoded("num".into(), "5".into()))
            .with_body(r#"{"tracks":[{"storeId":"T1","title":"Radio"}]}"#)
            .create();

        let tracks = client(&server).station_tracks("st1", 5).unwrap();
        assert_eq!(tracks[0].store_id.as_deref(), Some("T1"));
        mock.assert();
    }
}
