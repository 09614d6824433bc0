//! Building a [`TrackList`] from a search, a playlist or a radio station.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use playmusic_api::{MusicService, Playlist, Station, Track};
use rand::seq::SliceRandom;
use regex::RegexBuilder;
use tracing::debug;

use crate::error::{Error, Result};
use crate::tracklist::TrackList;

pub const DEFAULT_STATION_TRACKS: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Artist,
    Genre,
    Album,
    Title,
}

impl SearchField {
    fn value(self, track: &Track) -> &str {
        match self {
            Self::Artist => &track.artist,
            Self::Genre => &track.genre,
            Self::Album => &track.album,
            Self::Title => &track.title,
        }
    }
}

impl FromStr for SearchField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "artist" => Ok(Self::Artist),
            "genre" => Ok(Self::Genre),
            "album" => Ok(Self::Album),
            "title" | "song" => Ok(Self::Title),
            other => Err(Error::Config(format!("unknown search field {other:?}"))),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Artist => "artist",
            Self::Genre => "genre",
            Self::Album => "album",
            Self::Title => "title",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    /// Artist, then album, then track number.
    #[default]
    Library,
    Shuffled,
}

/// Tracks whose `field` contains any of the whitespace-separated `terms`,
/// ignoring case. Terms are literal text, not patterns.
///
/// # Errors
///
/// [`Error::Search`] only if the combined pattern exceeds the regex size limit.
pub fn search(
    library: &[Track],
    field: SearchField,
    terms: &str,
    order: Order,
) -> Result<TrackList> {
    let alternatives: Vec<String> = terms.split_whitespace().map(regex::escape).collect();
    if alternatives.is_empty() {
        return Ok(TrackList::default());
    }
    let pattern = RegexBuilder::new(&alternatives.join("|"))
        .case_insensitive(true)
        .build()?;

    let mut found: Vec<Track> = library
        .iter()
        .filter(|t| pattern.is_match(field.value(t)))
        .cloned()
        .collect();
    debug!(%field, terms, matches = found.len(), "search");
    arrange(&mut found, order);
    Ok(TrackList::new(found))
}

/// Reorder `tracks` in place.
pub fn arrange(tracks: &mut [Track], order: Order) {
    match order {
        Order::Library => tracks.sort_by(|a, b| {
            a.artist
                .cmp(&b.artist)
                .then_with(|| a.album.cmp(&b.album))
                .then_with(|| a.track_number.cmp(&b.track_number))
        }),
        Order::Shuffled => tracks.shuffle(&mut rand::rng()),
    }
}

/// Playlists worth offering; unnamed ones are hidden.
pub fn visible_playlists(playlists: &[Playlist]) -> impl Iterator<Item = &Playlist> {
    playlists.iter().filter(|p| !p.name.is_empty())
}

/// Library tracks referenced by `playlist`, in playlist order.
///
/// Entries may name a track by library id or store id. Entries missing from
/// the library are dropped.
pub fn playlist_tracks(library: &[Track], playlist: &Playlist) -> TrackList {
    let mut by_id: HashMap<&str, &Track> = HashMap::new();
    for track in library {
        for id in [&track.id, &track.store_id].into_iter().flatten() {
            by_id.entry(id.as_str()).or_insert(track);
        }
    }
    let tracks: Vec<Track> = playlist
        .entries
        .iter()
        .filter_map(|entry| {
            let found = by_id.get(entry.as_str()).copied().cloned();
            if found.is_none() {
                debug!(playlist = %playlist.name, entry, "entry not in library");
            }
            found
        })
        .collect();
    TrackList::new(tracks)
}

/// `n` tracks generated by `station`.
pub fn station_tracks(service: &dyn MusicService, station: &Station, n: u32) -> Result<TrackList> {
    let tracks = service.get_station_tracks(&station.id, n)?;
    debug!(station = %station.name, tracks = tracks.len(), "station tracks");
    Ok(TrackList::new(tracks))
}
