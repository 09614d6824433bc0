use playmusic_api::{MusicService, Track};
use tracing::info;

use crate::error::{Error, Result};

/// Everything the player and downloader need from the signed-in account:
/// the session handle, the bound device and the library snapshot.
///
/// Built once per process. The snapshot is not refreshed; a new library
/// requires a new context.
pub struct SessionContext {
    service: Box<dyn MusicService>,
    device_id: String,
    library: Vec<Track>,
}

impl SessionContext {
    /// Bind `device_id` and fetch the library snapshot.
    pub fn open(service: Box<dyn MusicService>, device_id: impl Into<String>) -> Result<Self> {
        let library = service.get_all_songs()?;
        info!(tracks = library.len(), "library loaded");
        Ok(Self::with_library(service, device_id, library))
    }

    pub fn with_library(
        service: Box<dyn MusicService>,
        device_id: impl Into<String>,
        library: Vec<Track>,
    ) -> Self {
        Self {
            service,
            device_id: device_id.into(),
            library,
        }
    }

    pub fn service(&self) -> &dyn MusicService {
        self.service.as_ref()
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn library(&self) -> &[Track] {
        &self.library
    }

    /// Resolve a fresh stream URL for `track` through the bound device.
    ///
    /// Episodes go through the podcast endpoint, everything else through
    /// the track endpoint.
    pub fn stream_url(&self, track: &Track) -> Result<String> {
        let id = track.identity().ok_or_else(|| Error::MalformedTrack {
            title: track.title.clone(),
        })?;
        let resolved = if id.is_episode() {
            self.service
                .get_podcast_episode_stream_url(id.as_str(), &self.device_id)
        } else {
            self.service.get_stream_url(id.as_str(), &self.device_id)
        };
        resolved.map_err(|e| Error::fetch(format!("stream URL for {:?}", track.title), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeService, track};

    #[test]
    fn open_loads_library() {
        let service = FakeService::with_library(vec![track("1", "A"), track("2", "B")]);
        let ctx = SessionContext::open(Box::new(service), "dev").unwrap();
        assert_eq!(ctx.library().len(), 2);
        assert_eq!(ctx.device_id(), "dev");
    }

    #[test]
    fn episodes_use_podcast_endpoint() {
        let ctx = SessionContext::with_library(Box::new(FakeService::default()), "dev", vec![]);
        let episode = Track {
            episode_id: Some("ep".into()),
            ..Track::default()
        };
        assert_eq!(ctx.stream_url(&episode).unwrap(), "fake://episode/ep?device=dev");
        assert_eq!(
            ctx.stream_url(&track("7", "T")).unwrap(),
            "fake://track/7?device=dev"
        );
    }

    #[test]
    fn track_without_identity_is_malformed() {
        let ctx = SessionContext::with_library(Box::new(FakeService::default()), "dev", vec![]);
        let err = ctx.stream_url(&Track::default()).unwrap_err();
        assert!(matches!(err, Error::MalformedTrack { .. }));
    }

    #[test]
    fn unavailable_stream_is_fetch_error() {
        let service = FakeService::default().failing("7");
        let ctx = SessionContext::with_library(Box::new(service), "dev", vec![]);
        let err = ctx.stream_url(&track("7", "T")).unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }
}
