//! Error types for the cloud music account client.

use thiserror::Error;

/// Errors that can occur when talking to the account gateway.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport error (connection refused, timeout, TLS failure, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-success HTTP status.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the response body, or the status reason.
        message: String,
    },

    /// Credentials or session token were rejected.
    ///
    /// Interactive front-ends re-prompt for credentials on this error.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// No session token is cached. Run `login` first.
    #[error("not logged in")]
    NotLoggedIn,

    /// File I/O error (session cache read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a JSON document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors (e.g. missing config directory, no device).
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Whether re-entering credentials could fix this error.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthFailure(_) | Self::NotLoggedIn)
    }
}

/// Convenience alias for `Result<T, ApiError>`.
pub type Result<T> = std::result::Result<T, ApiError>;
