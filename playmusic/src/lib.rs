pub mod backend;
pub mod config;
mod context;
pub mod download;
pub mod error;
mod fetch;
pub mod hierarchy;
pub mod playback;
pub mod query;
mod tag;
#[cfg(test)]
mod test_support;
mod tracklist;

pub use backend::{BackendKind, MediaBackend, open_backend};
pub use config::AppConfig;
pub use context::SessionContext;
pub use download::{BatchReport, Downloader, Progress};
pub use error::{Error, Result};
pub use fetch::{Fetch, Fetched, HttpFetcher};
pub use hierarchy::{LibraryTree, NodeId, NodeKind};
pub use playback::{NowPlaying, PlaybackEngine, PlaybackToken, PlayerState, TickOutcome};
pub use query::{Order, SearchField};
pub use tag::{CoverArt, Id3TagWriter, TagWriter, TrackTags};
pub use tracklist::TrackList;

use std::path::Path;

/// Download the tracks under `selection` from `tree` into `base` over HTTP,
/// tagging each file.
pub fn download_selection(
    ctx: &SessionContext,
    tree: &LibraryTree,
    selection: &[NodeId],
    base: &Path,
    progress: &mut dyn FnMut(&Progress),
) -> Result<BatchReport> {
    let fetcher = HttpFetcher::new()?;
    let tagger = Id3TagWriter;
    Ok(Downloader::new(ctx, &fetcher, &tagger).download_selection(tree, selection, base, progress))
}
