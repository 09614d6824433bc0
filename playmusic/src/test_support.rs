//! In-memory fakes shared by the unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use playmusic_api::{ApiError, Device, MusicService, Playlist, Station, Track};

use crate::backend::MediaBackend;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, Fetched};
use crate::tag::{CoverArt, TagWriter, TrackTags};

pub fn track(id: &str, title: &str) -> Track {
    Track {
        id: Some(id.into()),
        title: title.into(),
        artist: "Artist".into(),
        album_artist: "Artist".into(),
        album: "Album".into(),
        duration_ms: 1_000,
        ..Track::default()
    }
}

#[derive(Default)]
pub struct FakeService {
    pub library: Vec<Track>,
    pub playlists: Vec<Playlist>,
    pub stations: Vec<Station>,
    pub station_tracks: HashMap<String, Vec<Track>>,
    failing: HashSet<String>,
}

impl FakeService {
    pub fn with_library(library: Vec<Track>) -> Self {
        Self {
            library,
            ..Self::default()
        }
    }

    /// Stream URL requests for `id` fail.
    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_owned());
        self
    }

    fn url(&self, kind: &str, id: &str, device: &str) -> playmusic_api::Result<String> {
        if self.failing.contains(id) {
            return Err(ApiError::Other(format!("{id} unavailable")));
        }
        Ok(format!("fake://{kind}/{id}?device={device}"))
    }
}

impl MusicService for FakeService {
    fn get_all_songs(&self) -> playmusic_api::Result<Vec<Track>> {
        Ok(self.library.clone())
    }

    fn get_stream_url(&self, track_id: &str, device_id: &str) -> playmusic_api::Result<String> {
        self.url("track", track_id, device_id)
    }

    fn get_podcast_episode_stream_url(
        &self,
        episode_id: &str,
        device_id: &str,
    ) -> playmusic_api::Result<String> {
        self.url("episode", episode_id, device_id)
    }

    fn get_registered_devices(&self) -> playmusic_api::Result<Vec<Device>> {
        Ok(vec![])
    }

    fn get_all_user_playlist_contents(&self) -> playmusic_api::Result<Vec<Playlist>> {
        Ok(self.playlists.clone())
    }

    fn get_all_stations(&self) -> playmusic_api::Result<Vec<Station>> {
        Ok(self.stations.clone())
    }

    fn get_station_tracks(
        &self,
        station_id: &str,
        num_tracks: u32,
    ) -> playmusic_api::Result<Vec<Track>> {
        let mut tracks = self.station_tracks.get(station_id).cloned().unwrap_or_default();
        tracks.truncate(num_tracks as usize);
        Ok(tracks)
    }
}

/// Observable state of a [`MockBackend`], shared with the test.
#[derive(Debug, Default)]
pub struct BackendState {
    pub calls: Vec<String>,
    pub loaded: Option<String>,
    pub playing: bool,
    pub paused: bool,
    /// URLs containing any of these fragments are rejected by `play`.
    pub reject: Vec<String>,
    pub duration: Option<u64>,
    pub position: Option<u64>,
    pub seek_fails: bool,
}

#[derive(Clone, Default)]
pub struct MockBackend(pub Rc<RefCell<BackendState>>);

impl MockBackend {
    pub fn state(&self) -> std::cell::RefMut<'_, BackendState> {
        self.0.borrow_mut()
    }

    /// Tracks successfully started, in order.
    pub fn started(&self) -> Vec<String> {
        let state = self.0.borrow();
        state
            .calls
            .iter()
            .filter_map(|c| c.strip_prefix("play ").map(String::from))
            .collect()
    }
}

impl MediaBackend for MockBackend {
    fn load_url(&mut self, url: &str) -> Result<()> {
        let mut s = self.state();
        s.calls.push(format!("load {url}"));
        s.loaded = Some(url.to_owned());
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let mut s = self.state();
        let url = s.loaded.clone().unwrap_or_default();
        if s.reject.iter().any(|r| url.contains(r.as_str())) {
            s.calls.push(format!("reject {url}"));
            return Err(Error::Backend(format!("cannot play {url}")));
        }
        s.calls.push(format!("play {url}"));
        s.playing = true;
        s.paused = false;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut s = self.state();
        s.calls.push("pause".into());
        s.paused = true;
        Ok(())
    }

    fn unpause(&mut self) -> Result<()> {
        let mut s = self.state();
        s.calls.push("unpause".into());
        s.paused = false;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut s = self.state();
        s.calls.push("stop".into());
        s.playing = false;
        Ok(())
    }

    fn is_playing(&mut self) -> bool {
        self.state().playing
    }

    fn duration_ms(&mut self) -> Option<u64> {
        self.state().duration
    }

    fn position_ms(&mut self) -> Option<u64> {
        self.state().position
    }

    fn set_position(&mut self, ms: u64) -> Result<()> {
        let mut s = self.state();
        s.calls.push(format!("seek {ms}"));
        if s.seek_fails {
            s.playing = false;
            return Err(Error::Backend("seek failed".into()));
        }
        s.position = Some(ms);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    pub bodies: HashMap<String, Fetched>,
}

impl FakeFetcher {
    pub fn serve(mut self, url: &str, bytes: &[u8]) -> Self {
        self.bodies.insert(
            url.to_owned(),
            Fetched {
                bytes: bytes.to_vec(),
                mime: None,
            },
        );
        self
    }
}

impl Fetch for FakeFetcher {
    fn fetch(&self, url: &str) -> Result<Fetched> {
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| Error::fetch(url, "404 Not Found"))
    }
}

#[derive(Default)]
pub struct RecordingTagWriter {
    pub written: RefCell<Vec<(PathBuf, TrackTags, Option<CoverArt>)>>,
}

impl TagWriter for RecordingTagWriter {
    fn write_tags(&self, path: &Path, tags: &TrackTags, cover: Option<&CoverArt>) -> Result<()> {
        self.written
            .borrow_mut()
            .push((path.to_owned(), tags.clone(), cover.cloned()));
        Ok(())
    }
}
