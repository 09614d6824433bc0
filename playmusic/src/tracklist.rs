use std::ops::Deref;

use playmusic_api::Track;

/// An ordered list of tracks with a cursor.
///
/// `next` and `prev` wrap around. `at` with an out-of-range index returns
/// `None` and leaves the cursor where it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackList {
    tracks: Vec<Track>,
    pos: usize,
}

impl TrackList {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The track under the cursor, `None` when the list is empty.
    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.pos)
    }

    /// Move the cursor forward (wrapping) and return the new current track.
    pub fn next(&mut self) -> Option<&Track> {
        if self.tracks.is_empty() {
            return None;
        }
        self.pos = (self.pos + 1) % self.tracks.len();
        self.current()
    }

    /// Move the cursor back (wrapping) and return the new current track.
    pub fn prev(&mut self) -> Option<&Track> {
        if self.tracks.is_empty() {
            return None;
        }
        self.pos = self.pos.checked_sub(1).unwrap_or(self.tracks.len() - 1);
        self.current()
    }

    /// Move the cursor to `index` if it is in range.
    pub fn at(&mut self, index: usize) -> Option<&Track> {
        if index >= self.tracks.len() {
            return None;
        }
        self.pos = index;
        self.current()
    }

    pub fn into_inner(self) -> Vec<Track> {
        self.tracks
    }
}

impl Deref for TrackList {
    type Target = [Track];

    fn deref(&self) -> &[Track] {
        &self.tracks
    }
}

impl From<Vec<Track>> for TrackList {
    fn from(tracks: Vec<Track>) -> Self {
        Self::new(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(n: usize) -> TrackList {
        (0..n)
            .map(|i| Track {
                id: Some(i.to_string()),
                title: format!("t{i}"),
                ..Track::default()
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn next_cycles_back_to_start() {
        for n in 1..6 {
            let mut l = list(n);
            l.at(n / 2);
            let start = l.pos();
            for _ in 0..n {
                l.next();
            }
            assert_eq!(l.pos(), start);
        }
    }

    #[test]
    fn prev_undoes_next() {
        let mut l = list(4);
        for p in 0..4 {
            l.at(p);
            l.next();
            l.prev();
            assert_eq!(l.pos(), p);
        }
    }

    #[test]
    fn next_wraps_from_last() {
        let mut l = list(3);
        l.at(2);
        assert_eq!(l.next().unwrap().title, "t0");
        assert_eq!(l.prev().unwrap().title, "t2");
    }

    #[test]
    fn at_out_of_range_keeps_cursor() {
        let mut l = list(3);
        l.at(1);
        assert!(l.at(3).is_none());
        assert!(l.at(usize::MAX).is_none());
        assert_eq!(l.pos(), 1);
        assert_eq!(l.at(0).unwrap().title, "t0");
    }

    #[test]
    fn empty_list_has_no_current() {
        let mut l = TrackList::default();
        assert!(l.current().is_none());
        assert!(l.next().is_none());
        assert!(l.prev().is_none());
        assert_eq!(l.pos(), 0);
    }
}
