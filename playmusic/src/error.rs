use std::path::PathBuf;

use playmusic_api::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The track has none of `id`, `storeId`, `episodeId`.
    #[error("track {title:?} has no id, storeId or episodeId")]
    MalformedTrack { title: String },
    /// Stream URL resolution or byte download failed.
    #[error("failed to fetch {what}: {reason}")]
    Fetch { what: String, reason: String },
    /// The media backend rejected a load, play or seek.
    #[error("media backend error: {0}")]
    Backend(String),
    #[error("tagging error: {0}")]
    Tag(String),
    #[error("no track at index {0}")]
    TrackNotFound(usize),
    #[error("track list is empty")]
    EmptyTrackList,
    #[error("nothing is playing")]
    NothingPlaying,
    /// Every track in the list failed to load during one traversal.
    #[error("all {0} tracks failed to play")]
    Exhausted(usize),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid search: {0}")]
    Search(#[from] regex::Error),
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn fetch(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            what: what.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
