//! Artist → Album → Track grouping of a flat track collection.
//!
//! Tracks are ordered by album artist, album, disc number, track number and
//! title (the last key breaking ties), then attached:
//!
//! - under an artist node keyed by `album_artist`, unless that string is empty,
//!   in which case the track (or its album) sits at the root;
//! - under an album node keyed by (artist, `album`), unless `album` is empty,
//!   in which case the track hangs directly off the artist (or the root).
//!
//! Emptiness is tested on the literal string. Group identity uses the
//! trimmed label, so `"Artist "` and `"Artist"` share a node while `"artist"`
//! gets its own.

use std::collections::HashMap;

use playmusic_api::Track;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Artist(String),
    Album(String),
    Track(Track),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn label(&self) -> String {
        match &self.kind {
            NodeKind::Artist(name) => format!("Artist: {name}"),
            NodeKind::Album(name) => format!("Album: {name}"),
            NodeKind::Track(track) => track.title.clone(),
        }
    }

    pub fn track(&self) -> Option<&Track> {
        match &self.kind {
            NodeKind::Track(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Artist(String),
    Album {
        artist: Option<String>,
        album: String,
    },
}

/// Presentation tree over a set of tracks. Rebuild it whenever the set changes.
#[derive(Debug, Clone, Default)]
pub struct LibraryTree {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    groups: HashMap<GroupKey, NodeId>,
}

impl LibraryTree {
    pub fn build(tracks: &[Track]) -> Self {
        let mut sorted = tracks.to_vec();
        sort_for_tree(&mut sorted);

        let mut tree = Self::default();
        for track in sorted {
            let artist = (!track.album_artist.is_empty()).then(|| {
                let key = GroupKey::Artist(track.album_artist.trim().to_owned());
                tree.group(key, None, NodeKind::Artist(track.album_artist.clone()))
            });
            let album = (!track.album.is_empty()).then(|| {
                let key = GroupKey::Album {
                    artist: artist.map(|_| track.album_artist.trim().to_owned()),
                    album: track.album.trim().to_owned(),
                };
                tree.group(key, artist, NodeKind::Album(track.album.clone()))
            });
            tree.push(album.or(artist), NodeKind::Track(track));
        }
        tree
    }

    fn group(&mut self, key: GroupKey, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        if let Some(&id) = self.groups.get(&key) {
            return id;
        }
        let id = self.push(parent, kind);
        self.groups.insert(key, id);
        id
    }

    fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// # Panics
    ///
    /// If `id` does not come from this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Artist node for `name`, compared after trimming.
    pub fn artist(&self, name: &str) -> Option<NodeId> {
        self.groups
            .get(&GroupKey::Artist(name.trim().to_owned()))
            .copied()
    }

    /// Album node for `album`, under `artist` or at the root when `None`.
    pub fn album(&self, artist: Option<&str>, album: &str) -> Option<NodeId> {
        self.groups
            .get(&GroupKey::Album {
                artist: artist.map(|a| a.trim().to_owned()),
                album: album.trim().to_owned(),
            })
            .copied()
    }

    /// Track node whose identity (`id`, `storeId` or `episodeId`) equals `id`.
    pub fn find_track(&self, id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| {
                n.track()
                    .and_then(Track::identity)
                    .is_some_and(|tid| tid.as_str() == id)
            })
            .map(NodeId)
    }

    /// All tracks at or below `id`, in tree order.
    pub fn tracks_under(&self, id: NodeId) -> Vec<&Track> {
        let mut out = Vec::new();
        self.collect_tracks(id, &mut out);
        out
    }

    fn collect_tracks<'a>(&'a self, id: NodeId, out: &mut Vec<&'a Track>) {
        let node = self.node(id);
        if let Some(t) = node.track() {
            out.push(t);
        }
        for &child in &node.children {
            self.collect_tracks(child, out);
        }
    }

    /// Progress-bar size for downloading `selection`: one step per selected
    /// node, per child and per grandchild.
    pub fn count_steps(&self, selection: &[NodeId]) -> usize {
        selection
            .iter()
            .map(|&id| {
                1 + self
                    .children(id)
                    .iter()
                    .map(|&c| 1 + self.children(c).len())
                    .sum::<usize>()
            })
            .sum()
    }

    /// Depth-first walk yielding `(depth, node id)`.
    pub fn walk(&self) -> Vec<(usize, NodeId)> {
        self.walk_from(&self.roots)
    }

    /// Depth-first walk of the subtrees rooted at `start`, which sit at depth 0.
    pub fn walk_from(&self, start: &[NodeId]) -> Vec<(usize, NodeId)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, NodeId)> = start.iter().rev().map(|&id| (0, id)).collect();
        while let Some((depth, id)) = stack.pop() {
            out.push((depth, id));
            stack.extend(self.children(id).iter().rev().map(|&c| (depth + 1, c)));
        }
        out
    }
}

/// Order tracks by album artist, album, disc, track number, then title.
pub fn sort_for_tree(tracks: &mut [Track]) {
    tracks.sort_by(|a, b| {
        a.album_artist
            .cmp(&b.album_artist)
            .then_with(|| a.album.cmp(&b.album))
            .then_with(|| a.disc_number.cmp(&b.disc_number))
            .then_with(|| a.track_number.cmp(&b.track_number))
            .then_with(|| a.title.cmp(&b.title))
    });
}
