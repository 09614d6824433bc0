//! The playback state machine.
//!
//! [`PlaybackEngine`] owns a [`TrackList`] and a [`MediaBackend`] and moves
//! through [`PlayerState`]s in response to explicit calls. Nothing runs on
//! its own: the caller invokes [`PlaybackEngine::tick`] every poll interval
//! with the [`PlaybackToken`] it got from [`PlaybackEngine::start`]. Starting
//! a new list invalidates every earlier token.
//!
//! Position is estimated by adding the poll interval on each unpaused tick;
//! every [`RESYNC_TICKS`] ticks the backend's own position and duration are
//! adopted when it reports them.

use std::fmt;
use std::time::Duration;

use playmusic_api::Track;
use tracing::{debug, info, warn};

use crate::backend::MediaBackend;
use crate::context::SessionContext;
use crate::error::{Error, Result};
use crate::tracklist::TrackList;

pub const RESYNC_TICKS: u64 = 10;

/// The backend saying "not playing" right after a load is not trusted
/// until this much playback time has passed.
pub const END_GRACE_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Stopped,
    Playing,
    Seeking,
    Advancing,
    NewQuery,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Seeking => "seeking",
            Self::Advancing => "advancing",
            Self::NewQuery => "new query",
        })
    }
}

/// Identifies one started track list. Compared, never inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The token belongs to a superseded list; nothing was done.
    Stale,
    /// Paused, or in a transient state.
    Idle,
    Playing { position_ms: u64 },
    /// The track ended and playback moved on to this index.
    Advanced(usize),
    Stopped,
}

/// Snapshot for renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying<'a> {
    pub track: &'a Track,
    pub index: usize,
    pub len: usize,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub paused: bool,
    pub state: PlayerState,
}

impl fmt::Display for NowPlaying<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}/{}] {} - {} ({} / {}){}",
            self.index + 1,
            self.len,
            self.track.artist,
            self.track.title,
            format_millis(self.position_ms),
            format_millis(self.duration_ms),
            if self.paused { " paused" } else { "" },
        )
    }
}

/// `m:ss`.
pub fn format_millis(ms: u64) -> String {
    let secs = ms / 1_000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

pub struct PlaybackEngine<'a, B: MediaBackend> {
    ctx: &'a SessionContext,
    backend: B,
    interval_ms: u64,
    list: TrackList,
    state: PlayerState,
    generation: u64,
    paused: bool,
    position_ms: u64,
    duration_ms: u64,
    /// Ticks and unpaused milliseconds since the current track started.
    ticks: u64,
    elapsed_ms: u64,
}

impl<'a, B: MediaBackend> PlaybackEngine<'a, B> {
    pub fn new(ctx: &'a SessionContext, backend: B, poll_interval: Duration) -> Self {
        Self {
            ctx,
            backend,
            interval_ms: u64::try_from(poll_interval.as_millis()).unwrap_or(u64::MAX),
            list: TrackList::default(),
            state: PlayerState::Stopped,
            generation: 0,
            paused: false,
            position_ms: 0,
            duration_ms: 0,
            ticks: 0,
            elapsed_ms: 0,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Token of the most recently started list.
    pub fn token(&self) -> PlaybackToken {
        PlaybackToken(self.generation)
    }

    pub fn tracks(&self) -> &TrackList {
        &self.list
    }

    pub fn now_playing(&self) -> Option<NowPlaying<'_>> {
        if self.state == PlayerState::Stopped {
            return None;
        }
        Some(NowPlaying {
            track: self.list.current()?,
            index: self.list.pos(),
            len: self.list.len(),
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
            paused: self.paused,
            state: self.state,
        })
    }

    /// Replace whatever is playing with `list` and start its first track.
    ///
    /// An empty list is rejected and leaves current playback alone. Tracks
    /// that fail to load are skipped; if all of them fail the engine stops
    /// with [`Error::Exhausted`].
    pub fn start(&mut self, list: TrackList) -> Result<PlaybackToken> {
        if list.is_empty() {
            return Err(Error::EmptyTrackList);
        }
        if self.state != PlayerState::Stopped {
            self.transition(PlayerState::NewQuery);
            if let Err(e) = self.backend.stop() {
                warn!("stopping previous playback: {e}");
            }
        }
        self.generation += 1;
        self.list = list;
        self.paused = false;
        self.play_from_cursor(Direction::Forward)?;
        Ok(self.token())
    }

    /// Advance the position clock and detect end of track.
    ///
    /// Never fails: a track that cannot be advanced past shows up as
    /// [`TickOutcome::Stopped`].
    pub fn tick(&mut self, token: PlaybackToken) -> TickOutcome {
        if token != self.token() {
            return TickOutcome::Stale;
        }
        match self.state {
            PlayerState::Stopped => return TickOutcome::Stopped,
            PlayerState::Playing if !self.paused => {}
            _ => return TickOutcome::Idle,
        }

        self.ticks += 1;
        self.position_ms = self.position_ms.saturating_add(self.interval_ms);
        self.elapsed_ms = self.elapsed_ms.saturating_add(self.interval_ms);

        let mut backend_ended = false;
        if self.ticks % RESYNC_TICKS == 0 {
            if let Some(pos) = self.backend.position_ms() {
                self.position_ms = pos;
            }
            if let Some(len) = self.backend.duration_ms().filter(|&d| d > 0) {
                self.duration_ms = len;
            }
            backend_ended = self.elapsed_ms >= END_GRACE_MS && !self.backend.is_playing();
        }

        let reached_end = self.duration_ms > 0 && self.position_ms >= self.duration_ms;
        if !(reached_end || backend_ended) {
            return TickOutcome::Playing {
                position_ms: self.position_ms,
            };
        }
        debug!(position = self.position_ms, duration = self.duration_ms, "track ended");
        match self.advance(Direction::Forward) {
            Ok(index) => TickOutcome::Advanced(index),
            Err(e) => {
                warn!("playback stopped: {e}");
                TickOutcome::Stopped
            }
        }
    }

    /// Skip to the next track, wrapping at the end.
    pub fn next(&mut self) -> Result<usize> {
        self.advance(Direction::Forward)
    }

    /// Go back one track, wrapping at the start.
    pub fn previous(&mut self) -> Result<usize> {
        self.advance(Direction::Backward)
    }

    /// Play the track at `index`. Out of range leaves everything untouched.
    pub fn jump_to(&mut self, index: usize) -> Result<usize> {
        if self.list.is_empty() {
            return Err(Error::NothingPlaying);
        }
        if self.list.at(index).is_none() {
            return Err(Error::TrackNotFound(index));
        }
        self.transition(PlayerState::Advancing);
        self.play_from_cursor(Direction::Forward)
    }

    fn advance(&mut self, direction: Direction) -> Result<usize> {
        if self.list.is_empty() {
            return Err(Error::NothingPlaying);
        }
        self.transition(PlayerState::Advancing);
        self.step(direction);
        self.play_from_cursor(direction)
    }

    fn step(&mut self, direction: Direction) {
        match direction {
            Direction::Forward => self.list.next(),
            Direction::Backward => self.list.prev(),
        };
    }

    /// Load the track under the cursor, moving on in `direction` past
    /// failures for at most one traversal of the list.
    fn play_from_cursor(&mut self, direction: Direction) -> Result<usize> {
        let len = self.list.len();
        for _ in 0..len {
            match self.load_current() {
                Ok(()) => {
                    self.transition(PlayerState::Playing);
                    return Ok(self.list.pos());
                }
                Err(e) => {
                    warn!(index = self.list.pos(), "skipping track: {e}");
                    self.step(direction);
                }
            }
        }
        self.halt();
        Err(Error::Exhausted(len))
    }

    fn load_current(&mut self) -> Result<()> {
        let track = self.list.current().ok_or(Error::EmptyTrackList)?;
        let url = self.ctx.stream_url(track)?;
        self.backend.load_url(&url)?;
        self.backend.play()?;

        info!(artist = %track.artist, title = %track.title, "now playing");
        self.duration_ms = track.duration_ms;
        self.position_ms = 0;
        self.ticks = 0;
        self.elapsed_ms = 0;
        self.paused = false;
        Ok(())
    }

    /// Seek to `fraction` of the track (NaN counts as 0, out-of-range clamps).
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn seek_fraction(&mut self, fraction: f64) -> Result<u64> {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let duration = self.known_duration()?;
        self.seek_to((duration as f64 * fraction).round() as u64)
    }

    /// Seek by `secs` from the current position, clamped to the track.
    pub fn seek_relative(&mut self, secs: i64) -> Result<u64> {
        self.known_duration()?;
        let delta = secs.unsigned_abs().saturating_mul(1_000);
        let target = if secs >= 0 {
            self.position_ms.saturating_add(delta)
        } else {
            self.position_ms.saturating_sub(delta)
        };
        self.seek_to(target)
    }

    fn known_duration(&mut self) -> Result<u64> {
        if !matches!(self.state, PlayerState::Playing) {
            return Err(Error::NothingPlaying);
        }
        if self.duration_ms == 0 {
            self.duration_ms = self.backend.duration_ms().unwrap_or(0);
        }
        Ok(self.duration_ms)
    }

    fn seek_to(&mut self, target: u64) -> Result<u64> {
        let target = target.min(self.duration_ms);
        self.transition(PlayerState::Seeking);
        if let Err(e) = self.backend.set_position(target) {
            self.halt();
            return Err(e);
        }
        self.position_ms = target;
        self.transition(PlayerState::Playing);
        Ok(target)
    }

    /// Pause or resume. Asking for the current state is a no-op.
    pub fn set_paused(&mut self, paused: bool) -> Result<()> {
        if self.state == PlayerState::Stopped {
            return Err(Error::NothingPlaying);
        }
        if self.paused == paused {
            return Ok(());
        }
        if paused {
            self.backend.pause()?;
        } else {
            self.backend.unpause()?;
        }
        self.paused = paused;
        debug!(paused, "pause state");
        Ok(())
    }

    /// Flip the pause state and return the new one.
    pub fn toggle_pause(&mut self) -> Result<bool> {
        self.set_paused(!self.paused)?;
        Ok(self.paused)
    }

    pub fn stop(&mut self) -> Result<()> {
        if self.state == PlayerState::Stopped {
            return Ok(());
        }
        self.transition(PlayerState::Stopped);
        self.paused = false;
        self.backend.stop()
    }

    fn halt(&mut self) {
        self.transition(PlayerState::Stopped);
        self.paused = false;
        if let Err(e) = self.backend.stop() {
            warn!("stopping backend: {e}");
        }
    }

    fn transition(&mut self, to: PlayerState) {
        if self.state != to {
            debug!(from = %self.state, %to, "player state");
            self.state = to;
        }
    }
}
