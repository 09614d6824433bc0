use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::error::{Error, Result};

/// A downloaded body and its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

/// Blocking byte retrieval: stream bodies and cover art.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Fetched>;
}

pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("playmusic/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::fetch("HTTP client", e))?;
        Ok(Self { http })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Fetched> {
        debug!(%url, "fetching");
        let resp = self
            .http
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| Error::fetch(url, e))?;
        let mime = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = resp.bytes().map_err(|e| Error::fetch(url, e))?;
        Ok(Fetched {
            bytes: bytes.to_vec(),
            mime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_body_and_content_type() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/cover")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body([0x89, b'P', b'N', b'G'])
            .create();

        let got = HttpFetcher::new()
            .unwrap()
            .fetch(&format!("{}/cover", server.url()))
            .unwrap();

        mock.assert();
        assert_eq!(got.bytes, [0x89, b'P', b'N', b'G']);
        assert_eq!(got.mime.as_deref(), Some("image/png"));
    }

    #[test]
    fn error_status_is_a_fetch_error() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/gone").with_status(404).create();
        let url = format!("{}/gone", server.url());

        let err = HttpFetcher::new().unwrap().fetch(&url).unwrap_err();

        assert!(matches!(err, Error::Fetch { ref what, .. } if *what == url), "{err:?}");
    }

    #[test]
    fn refused_connection_is_a_fetch_error() {
        let err = HttpFetcher::new()
            .unwrap()
            .fetch("http://127.0.0.1:1/stream")
            .unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }), "{err:?}");
    }
}
