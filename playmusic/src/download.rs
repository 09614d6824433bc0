//! Tagged file downloads, single and batched.
//!
//! A track becomes `{ordinal}-{title}-{album}-{artist}.mp3` in the target
//! directory. Batches mirror the library tree: one directory per artist and
//! per album under the chosen base directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use playmusic_api::Track;
use tracing::{error, info, warn};

use crate::context::SessionContext;
use crate::error::{Error, Result};
use crate::fetch::Fetch;
use crate::hierarchy::{LibraryTree, NodeId, NodeKind};
use crate::tag::{CoverArt, TagWriter, TrackTags};

/// Replace the characters that would split a file name.
pub fn sanitize(component: &str) -> String {
    component.replace(['/', '='], "_")
}

/// Directory names only need `/` replaced.
pub fn sanitize_dir(name: &str) -> String {
    name.replace('/', "_")
}

/// Output file name for `track`.
///
/// The ordinal is the track number, or the publication date
/// (`YYYY-MM-DD`, UTC) for undated items such as podcast episodes.
pub fn filename(track: &Track) -> String {
    let ordinal = match (track.track_number, track.published_ms) {
        (Some(n), _) => n.to_string(),
        (None, Some(ms)) => DateTime::from_timestamp_millis(ms)
            .map_or_else(|| "0".to_owned(), |d| d.format("%Y-%m-%d").to_string()),
        (None, None) => "0".to_owned(),
    };
    format!(
        "{ordinal}-{}-{}-{}.mp3",
        sanitize(&track.title),
        sanitize(&track.album),
        sanitize(&track.artist),
    )
}

/// Batch progress, reported after every step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub message: String,
}

#[derive(Debug)]
pub struct Failure {
    pub title: String,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<Failure>,
}

struct Batch<'p> {
    completed: usize,
    total: usize,
    report: BatchReport,
    progress: &'p mut dyn FnMut(&Progress),
}

impl Batch<'_> {
    fn step(&mut self, message: String) {
        self.completed += 1;
        (self.progress)(&Progress {
            completed: self.completed,
            total: self.total,
            message,
        });
    }
}

pub struct Downloader<'a> {
    ctx: &'a SessionContext,
    fetcher: &'a dyn Fetch,
    tagger: &'a dyn TagWriter,
}

impl<'a> Downloader<'a> {
    pub fn new(ctx: &'a SessionContext, fetcher: &'a dyn Fetch, tagger: &'a dyn TagWriter) -> Self {
        Self {
            ctx,
            fetcher,
            tagger,
        }
    }

    /// Download `track` into `dir` and tag it. An existing file is overwritten.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedTrack`]: no identity; nothing is written
    /// - [`Error::Fetch`]: stream URL or body could not be retrieved; nothing is written
    /// - [`Error::Io`] / [`Error::Tag`]: writing or tagging the file failed
    pub fn download_track(&self, track: &Track, dir: &Path) -> Result<PathBuf> {
        if track.identity().is_none() {
            return Err(Error::MalformedTrack {
                title: track.title.clone(),
            });
        }
        let url = self.ctx.stream_url(track)?;
        let body = self.fetcher.fetch(&url)?;

        let path = dir.join(filename(track));
        fs::write(&path, &body.bytes).map_err(|e| Error::io(&path, e))?;

        let cover = self.fetch_cover(track);
        self.tagger
            .write_tags(&path, &TrackTags::from_track(track), cover.as_ref())?;
        info!(path = %path.display(), bytes = body.bytes.len(), "downloaded");
        Ok(path)
    }

    fn fetch_cover(&self, track: &Track) -> Option<CoverArt> {
        let url = track.cover_url()?;
        match self.fetcher.fetch(url) {
            Ok(body) => Some(CoverArt {
                data: body.bytes,
                mime: body.mime,
            }),
            Err(e) => {
                warn!(title = %track.title, "cover art unavailable: {e}");
                None
            }
        }
    }

    /// Download every node in `selection` below `base`, in order.
    ///
    /// Artists get a directory, albums get a directory inside their
    /// artist's (or directly in `base` when the album itself was selected),
    /// tracks land in the directory of whatever was selected. A failed item
    /// is recorded and the batch moves on.
    pub fn download_selection(
        &self,
        tree: &LibraryTree,
        selection: &[NodeId],
        base: &Path,
        progress: &mut dyn FnMut(&Progress),
    ) -> BatchReport {
        let mut batch = Batch {
            completed: 0,
            total: tree.count_steps(selection),
            report: BatchReport::default(),
            progress,
        };
        for &id in selection {
            match &tree.node(id).kind {
                NodeKind::Artist(name) => {
                    batch.step(format!("Retrieving: {name}"));
                    let dir = base.join(sanitize_dir(name));
                    ensure_dir(&dir, &mut batch);
                    for &child in tree.children(id) {
                        self.download_child(tree, child, &dir, &mut batch);
                    }
                }
                NodeKind::Album(_) => self.download_album(tree, id, base, &mut batch),
                NodeKind::Track(track) => self.download_one(track, base, &mut batch),
            }
        }
        batch.report
    }

    fn download_child(&self, tree: &LibraryTree, id: NodeId, dir: &Path, batch: &mut Batch<'_>) {
        match &tree.node(id).kind {
            NodeKind::Track(track) => self.download_one(track, dir, batch),
            _ => self.download_album(tree, id, dir, batch),
        }
    }

    fn download_album(&self, tree: &LibraryTree, id: NodeId, parent: &Path, batch: &mut Batch<'_>) {
        let name = match &tree.node(id).kind {
            NodeKind::Album(name) | NodeKind::Artist(name) => name.as_str(),
            NodeKind::Track(_) => return,
        };
        batch.step(format!("Retrieving: {name}"));
        let dir = parent.join(sanitize_dir(name));
        ensure_dir(&dir, batch);
        for &child in tree.children(id) {
            if let Some(track) = tree.node(child).track() {
                self.download_one(track, &dir, batch);
            }
        }
    }

    fn download_one(&self, track: &Track, dir: &Path, batch: &mut Batch<'_>) {
        match self.download_track(track, dir) {
            Ok(path) => batch.report.written.push(path),
            Err(e) => {
                error!(title = %track.title, "download failed: {e}");
                batch.report.failures.push(Failure {
                    title: track.title.clone(),
                    error: e,
                });
            }
        }
        batch.step(format!("Retrieving: {}", track.title));
    }
}

fn ensure_dir(dir: &Path, batch: &mut Batch<'_>) {
    // create_dir_all treats an existing directory as success.
    if let Err(e) = fs::create_dir_all(dir) {
        error!(dir = %dir.display(), "cannot create directory: {e}");
        batch.report.failures.push(Failure {
            title: dir.display().to_string(),
            error: Error::io(dir, e),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeFetcher, FakeService, RecordingTagWriter, track};

    fn ctx(service: FakeService) -> SessionContext {
        SessionContext::with_library(Box::new(service), "dev", vec![])
    }

    fn stream(id: &str) -> String {
        format!("fake://track/{id}?device=dev")
    }

    #[test]
    fn filename_replaces_unsafe_characters() {
        let t = Track {
            track_number: Some(5),
            title: "A/B".into(),
            album: "X=Y".into(),
            artist: "Z".into(),
            ..Track::default()
        };
        assert_eq!(filename(&t), "5-A_B-X_Y-Z.mp3");
    }

    #[test]
    fn filename_uses_publication_date_without_track_number() {
        let t = Track {
            title: "Ep".into(),
            album: "Show".into(),
            artist: "Host".into(),
            // 2016-03-01T12:00:00Z
            published_ms: Some(1_456_833_600_000),
            ..Track::default()
        };
        assert_eq!(filename(&t), "2016-03-01-Ep-Show-Host.mp3");
    }

    #[test]
    fn malformed_track_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(FakeService::default());
        let fetcher = FakeFetcher::default();
        let tagger = RecordingTagWriter::default();
        let dl = Downloader::new(&ctx, &fetcher, &tagger);

        let err = dl
            .download_track(&Track::default(), dir.path())
            .unwrap_err();
        assert!(matches!(err, Error::MalformedTrack { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(tagger.written.borrow().is_empty());
    }

    #[test]
    fn download_writes_bytes_and_tags_with_album_art() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(FakeService::default());
        let fetcher = FakeFetcher::default()
            .serve(&stream("1"), b"ID3audio")
            .serve("https://img/album.jpg", b"jpeg");
        let tagger = RecordingTagWriter::default();
        let dl = Downloader::new(&ctx, &fetcher, &tagger);

        let mut t = track("1", "Song");
        t.track_number = Some(3);
        t.album_art = vec!["https://img/album.jpg".into()];
        t.artist_art = vec!["https://img/artist.jpg".into()];

        let path = dl.download_track(&t, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("3-Song-Album-Artist.mp3"));
        assert_eq!(fs::read(&path).unwrap(), b"ID3audio");

        let written = tagger.written.borrow();
        let (tagged, tags, cover) = &written[0];
        assert_eq!(tagged, &path);
        assert_eq!(tags.title, "Song");
        assert_eq!(cover.as_ref().unwrap().data, b"jpeg");
    }

    #[test]
    fn missing_art_still_tags() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(FakeService::default());
        let fetcher = FakeFetcher::default().serve(&stream("1"), b"audio");
        let tagger = RecordingTagWriter::default();
        let dl = Downloader::new(&ctx, &fetcher, &tagger);

        let mut t = track("1", "Song");
        t.album_art = vec!["https://img/gone.jpg".into()];
        dl.download_track(&t, dir.path()).unwrap();

        let written = tagger.written.borrow();
        assert_eq!(written.len(), 1);
        assert!(written[0].2.is_none());
    }

    #[test]
    fn redownload_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(FakeService::default());
        let fetcher = FakeFetcher::default().serve(&stream("1"), b"new");
        let tagger = RecordingTagWriter::default();
        let dl = Downloader::new(&ctx, &fetcher, &tagger);

        let t = track("1", "Song");
        fs::write(dir.path().join(filename(&t)), b"old contents").unwrap();
        let path = dl.download_track(&t, dir.path()).unwrap();
        assert_eq!(fs::read(path).unwrap(), b"new");
    }

    #[test]
    fn batch_builds_tree_and_survives_failures() {
        let base = tempfile::tempdir().unwrap();
        let mut tracks = Vec::new();
        let mut fetcher = FakeFetcher::default();
        for album in ["Y1", "Y/2"] {
            for n in 1..=3u32 {
                let id = format!("{}-{n}", album.replace('/', ""));
                let mut t = track(&id, &format!("t{n}"));
                t.album_artist = "X".into();
                t.artist = "X".into();
                t.album = album.into();
                t.track_number = Some(n);
                if id != "Y1-2" {
                    fetcher = fetcher.serve(&stream(&id), b"audio");
                }
                tracks.push(t);
            }
        }
        let tree = LibraryTree::build(&tracks);
        let artist = tree.artist("X").unwrap();

        let ctx = ctx(FakeService::default());
        let tagger = RecordingTagWriter::default();
        let dl = Downloader::new(&ctx, &fetcher, &tagger);

        // Pre-existing directory must not stop the batch.
        fs::create_dir_all(base.path().join("X").join("Y1")).unwrap();

        let mut seen = Vec::new();
        let report = dl.download_selection(&tree, &[artist], base.path(), &mut |p: &Progress| {
            seen.push(p.clone());
        });

        assert_eq!(report.written.len(), 5);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].title, "t2");
        assert!(base.path().join("X").join("Y_2").join("3-t3-Y_2-X.mp3").exists());
        assert!(base.path().join("X").join("Y1").join("1-t1-Y1-X.mp3").exists());

        let last = seen.last().unwrap();
        assert_eq!(last.total, 9);
        assert_eq!(last.completed, 9);
        assert_eq!(seen.len(), 9);
    }

    #[test]
    fn selected_album_and_track_go_to_base() {
        let base = tempfile::tempdir().unwrap();
        let mut a = track("a", "A");
        a.album = "Solo".into();
        let mut b = track("b", "B");
        b.album = String::new();
        b.album_artist = String::new();
        let tree = LibraryTree::build(&[a, b]);
        let album = tree.album(Some("Artist"), "Solo").unwrap();
        let loose = tree.find_track("b").unwrap();

        let ctx = ctx(FakeService::default());
        let fetcher = FakeFetcher::default()
            .serve(&stream("a"), b"a")
            .serve(&stream("b"), b"b");
        let tagger = RecordingTagWriter::default();
        let dl = Downloader::new(&ctx, &fetcher, &tagger);

        let mut quiet = |_: &Progress| {};
        let report = dl.download_selection(&tree, &[album, loose], base.path(), &mut quiet);
        assert!(report.failures.is_empty());
        assert!(base.path().join("Solo").join("0-A-Solo-Artist.mp3").exists());
        assert!(base.path().join("0-B--Artist.mp3").exists());
    }
}
