use std::path::Path;

use lofty::config::WriteOptions;
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt};
use playmusic_api::Track;

use crate::error::{Error, Result};

/// Genre written when the track has none, which is the case for podcast episodes.
pub const DEFAULT_GENRE: &str = "Podcast";

/// PNG magic bytes for MIME detection.
const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// The tag fields written to a downloaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub genre: String,
    /// `None` when the track's year is 0.
    pub year: Option<u32>,
    pub track_number: u32,
    pub disc_number: u32,
}

impl TrackTags {
    pub fn from_track(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            album_artist: track.album_artist.clone(),
            genre: if track.genre.is_empty() {
                DEFAULT_GENRE.to_owned()
            } else {
                track.genre.clone()
            },
            year: (track.year != 0).then_some(track.year),
            track_number: track.track_number.unwrap_or(0),
            disc_number: track.disc_number.unwrap_or(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    pub data: Vec<u8>,
    /// MIME type reported by the server, if any.
    pub mime: Option<String>,
}

impl CoverArt {
    fn mime_type(&self) -> MimeType {
        match self.mime.as_deref() {
            Some("image/png") => MimeType::Png,
            Some("image/jpeg" | "image/jpg") => MimeType::Jpeg,
            _ if self.data.starts_with(&PNG_MAGIC) => MimeType::Png,
            _ => MimeType::Jpeg,
        }
    }
}

/// Writes tags plus one front cover into an audio file on disk.
pub trait TagWriter {
    fn write_tags(&self, path: &Path, tags: &TrackTags, cover: Option<&CoverArt>) -> Result<()>;
}

/// ID3 tagging through lofty. Creates the file's primary tag when missing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Id3TagWriter;

impl TagWriter for Id3TagWriter {
    fn write_tags(&self, path: &Path, tags: &TrackTags, cover: Option<&CoverArt>) -> Result<()> {
        let mut tagged_file = Probe::open(path)
            .map_err(|e| Error::Tag(e.to_string()))?
            .read()
            .map_err(|e| Error::Tag(e.to_string()))?;

        if tagged_file.primary_tag().is_none() {
            let tag_type = tagged_file.primary_tag_type();
            tagged_file.insert_tag(Tag::new(tag_type));
        }
        let tag = tagged_file
            .primary_tag_mut()
            .ok_or_else(|| Error::Tag("file cannot hold a tag".into()))?;

        tag.set_title(tags.title.clone());
        tag.set_artist(tags.artist.clone());
        tag.set_album(tags.album.clone());
        tag.insert_text(ItemKey::AlbumArtist, tags.album_artist.clone());
        tag.set_genre(tags.genre.clone());
        if let Some(year) = tags.year {
            for key in [
                ItemKey::RecordingDate,
                ItemKey::ReleaseDate,
                ItemKey::OriginalReleaseDate,
            ] {
                tag.insert_text(key, year.to_string());
            }
        }
        tag.set_track(tags.track_number);
        tag.set_disk(tags.disc_number);

        if let Some(art) = cover {
            let pic = Picture::unchecked(art.data.clone())
                .pic_type(PictureType::CoverFront)
                .mime_type(art.mime_type())
                .build();
            tag.remove_picture_type(PictureType::CoverFront);
            tag.push_picture(pic);
        }

        tag.save_to_path(path, WriteOptions::default())
            .map_err(|e| Error::Tag(e.to_string()))?;

        Ok(())
    }
}
