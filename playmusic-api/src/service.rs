//! The session handle contract consumed by the player and the downloader.

use crate::client::GatewayClient;
use crate::error::Result;
use crate::types::{Device, Playlist, Station, Track};

/// Authenticated access to the cloud music account.
///
/// [`GatewayClient`] is the network implementation; tests substitute
/// in-memory fakes. All calls block.
pub trait MusicService {
    /// The full library snapshot.
    fn get_all_songs(&self) -> Result<Vec<Track>>;

    /// Stream URL for a library or store track, authorized by `device_id`.
    fn get_stream_url(&self, track_id: &str, device_id: &str) -> Result<String>;

    /// Stream URL for a podcast episode, authorized by `device_id`.
    fn get_podcast_episode_stream_url(&self, episode_id: &str, device_id: &str) -> Result<String>;

    fn get_registered_devices(&self) -> Result<Vec<Device>>;

    fn get_all_user_playlist_contents(&self) -> Result<Vec<Playlist>>;

    fn get_all_stations(&self) -> Result<Vec<Station>>;

    fn get_station_tracks(&self, station_id: &str, num_tracks: u32) -> Result<Vec<Track>>;
}

impl MusicService for GatewayClient {
    fn get_all_songs(&self) -> Result<Vec<Track>> {
        self.all_songs()
    }

    fn get_stream_url(&self, track_id: &str, device_id: &str) -> Result<String> {
        self.stream_url(track_id, device_id)
    }

    fn get_podcast_episode_stream_url(&self, episode_id: &str, device_id: &str) -> Result<String> {
        self.episode_stream_url(episode_id, device_id)
    }

    fn get_registered_devices(&self) -> Result<Vec<Device>> {
        self.devices()
    }

    fn get_all_user_playlist_contents(&self) -> Result<Vec<Playlist>> {
        self.playlists()
    }

    fn get_all_stations(&self) -> Result<Vec<Station>> {
        self.stations()
    }

    fn get_station_tracks(&self, station_id: &str, num_tracks: u32) -> Result<Vec<Track>> {
        self.station_tracks(station_id, num_tracks)
    }
}
