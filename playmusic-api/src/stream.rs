//! Stream URL APIs.
//!
//! ## `stream_url`: `GET /stream/track/{id}?device={device_id}`
//!
//! ## `episode_stream_url`: `GET /stream/episode/{id}?device={device_id}`
//!
//! Response:
//! ```json
//! { "url": "https://streams.example/....mp3?expire=..." }
//! ```
//!
//! The URL is short-lived; fetch it right before loading or downloading.
//! `url` is `null` when the device is not authorized or the item is not
//! streamable.

use crate::client::GatewayClient;
use crate::error::{ApiError, Result};

impl GatewayClient {
    /// Get a stream URL for a library or store track.
    pub fn stream_url(&self, track_id: &str, device_id: &str) -> Result<String> {
        self.resolve_stream("track", track_id, device_id)
    }

    /// Get a stream URL for a podcast episode.
    pub fn episode_stream_url(&self, episode_id: &str, device_id: &str) -> Result<String> {
        self.resolve_stream("episode", episode_id, device_id)
    }

    fn resolve_stream(&self, kind: &str, id: &str, device_id: &str) -> Result<String> {
        let path = format!(
            "/stream/{kind}/{}?device={}",
            urlencoding::encode(id),
            urlencoding::encode(device_id),
        );
        let resp = self.get(&path)?;
        resp["url"]
            .as_str()
            .filter(|u| !u.is_empty())
            .map(String::from)
            .ok_or_else(|| ApiError::Other(format!("no stream available for {kind} {id}")))
    }
}

#[cfg(test)]
mod tests {
    use crate::auth::SessionCache;
    use crate::client::GatewayClient;
    use crate::error::ApiError;
    use mockito::Matcher;

    fn client(server: &mockito::Server) -> GatewayClient {
        let session = SessionCache {
            username: None,
            token: Some("tok".into()),
        };
        GatewayClient::with_session(&server.url(), &session).unwrap()
    }

    #[test]
    fn track_stream_url() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/stream/track/abc")
            .match_query(Matcher::UrlEncoded("device".into(), "1234".into()))
            .with_body(r#"{"url":"https://cdn/abc.mp3"}"#)
            .create();

        let url = client(&server).stream_url("abc", "1234").unwrap();
        assert_eq!(url, "https://cdn/abc.mp3");
        mock.assert();
    }

    #[test]
    fn episode_uses_episode_endpoint() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/stream/episode/ep9")
            .match_query(Matcher::Any)
            .with_body(r#"{"url":"https://cdn/ep9.mp3"}"#)
            .create();

        let url = client(&server).episode_stream_url("ep9", "1234").unwrap();
        assert_eq!(url, "https://cdn/ep9.mp3");
        mock.assert();
    }

    #[test]
    fn null_url_is_an_error() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/stream/track/gone")
            .match_query(Matcher::Any)
            .with_body(r#"{"url":null}"#)
            .create();

        let err = client(&server).stream_url("gone", "1234").unwrap_err();
        assert!(matches!(err, ApiError::Other(_)));
    }
}
