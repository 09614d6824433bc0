//! Cloud music account client library.
//!
//! Provides the [`MusicService`] contract (library snapshot, stream URLs,
//! devices, playlists, stations) and [`GatewayClient`], a blocking
//! implementation that talks JSON to the account gateway.
//!
//! # Authentication
//!
//! A username and password are exchanged once for a session token, which is
//! cached in `~/.config/playmusic/session.json`. The password is not stored.
//!
//! ```no_run
//! use playmusic_api::auth::SessionCache;
//! use playmusic_api::types::Credentials;
//! use playmusic_api::GatewayClient;
//!
//! let creds = Credentials { username: "me@example.com".into(), password: "...".into() };
//! let client = GatewayClient::login("http://127.0.0.1:9999", &creds).unwrap();
//! SessionCache { username: Some(creds.username), token: Some(client.token().into()) }
//!     .save()
//!     .unwrap();
//! ```
//!
//! # Endpoint mapping
//!
//! | Method                                 | Gateway endpoint                 |
//! |----------------------------------------|----------------------------------|
//! | [`GatewayClient::login`]               | `POST /auth/login`               |
//! | [`GatewayClient::all_songs`]           | `GET /library/tracks`            |
//! | [`GatewayClient::stream_url`]          | `GET /stream/track/{id}`         |
//! | [`GatewayClient::episode_stream_url`]  | `GET /stream/episode/{id}`       |
//! | [`GatewayClient::devices`]             | `GET /devices`                   |
//! | [`GatewayClient::playlists`]           | `GET /playlists`                 |
//! | [`GatewayClient::stations`]            | `GET /stations`                  |
//! | [`GatewayClient::station_tracks`]      | `GET /stations/{id}/tracks`      |

pub mod auth;
pub mod client;
pub mod device;
pub mod error;
mod library;
mod service;
mod stream;
pub mod types;

pub use client::{DEFAULT_GATEWAY, GatewayClient};
pub use device::choose_device;
pub use error::{ApiError, Result};
pub use service::MusicService;
pub use types::{Credentials, Device, DeviceKind, Playlist, Station, Track, TrackId};
