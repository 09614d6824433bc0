//! Blocking HTTP client for the cloud music account gateway.
//!
//! The gateway fronts the account API with a small JSON interface. Every
//! request except login carries the cached session token:
//!
//! ```text
//! Authorization: Bearer <token>
//! ```
//!
//! # Response format
//!
//! Successful responses are JSON objects whose payload lives under an
//! endpoint-specific key (`tracks`, `devices`, `url`, ...). Failures use a
//! non-2xx status and, when available, a body of the form:
//!
//! ```json
//! { "message": "device not authorized" }
//! ```
//!
//! Status 401 is mapped to [`ApiError::AuthFailure`](crate::ApiError::AuthFailure),
//! other failures to [`ApiError::Api`](crate::ApiError::Api).

use crate::auth::SessionCache;
use crate::error::{ApiError, Result};
use crate::types::Credentials;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// Gateway used when neither the config file nor the CLI names one.
pub const DEFAULT_GATEWAY: &str = "http://127.0.0.1:9999";
const USER_AGENT: &str = concat!("playmusic/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking client for the account gateway.
///
/// Holds a [`reqwest::blocking::Client`], the gateway base URL and the
/// session token. Endpoint methods live in separate modules (`library`,
/// `stream`, `device`) as `impl GatewayClient` blocks; the
/// [`MusicService`](crate::MusicService) impl in `service` forwards to them.
pub struct GatewayClient {
    http: Client,
    base_url: String,
    token: String,
}

impl GatewayClient {
    /// Authenticate with username and password and return a client holding
    /// the issued session token.
    ///
    /// # Errors
    ///
    /// - [`ApiError::AuthFailure`]: the gateway rejected the credentials
    /// - [`ApiError::Http`]: network failure
    pub fn login(base_url: &str, credentials: &Credentials) -> Result<Self> {
        let http = build_http()?;
        let base_url = base_url.trim_end_matches('/').to_owned();
        let resp = http
            .post(format!("{base_url}/auth/login"))
            .json(&json!({
                "username": credentials.username,
                "password": credentials.password,
            }))
            .send()?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::AuthFailure(format!(
                "credentials rejected for {}",
                credentials.username
            )));
        }
        let body = check(status, resp.text()?)?;
        let token = body["token"]
            .as_str()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::AuthFailure("gateway issued no token".into()))?
            .to_owned();
        debug!(user = %credentials.username, "logged in");
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// Create a client from a cached session.
    ///
    /// Returns [`ApiError::NotLoggedIn`] if the cache holds no token. The
    /// token is not validated until the first request.
    pub fn with_session(base_url: &str, session: &SessionCache) -> Result<Self> {
        let token = session
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::NotLoggedIn)?;
        Ok(Self {
            http: build_http()?,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
        })
    }

    /// The session token, for persisting with [`SessionCache::save`].
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Send an authenticated GET to `path` (relative to the base URL) and
    /// return the decoded JSON body.
    pub fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "GET");
        self.send(self.http.get(&url))
    }

    fn send(&self, req: RequestBuilder) -> Result<Value> {
        let resp = req.bearer_auth(&self.token).send()?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthFailure("session token expired".into()));
        }
        check(status, resp.text()?)
    }
}

fn build_http() -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(TIMEOUT)
        .build()?)
}

/// Map a non-success status to [`ApiError::Api`], otherwise parse the body.
fn check(status: StatusCode, body: String) -> Result<Value> {
    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["message"].as_str().map(String::from))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_owned());
        return Err(ApiError::Api {
            status: status.as_u16(),
            message,
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body)?)
}
