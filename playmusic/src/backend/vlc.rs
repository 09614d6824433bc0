//! VLC driven through its remote-control (`rc`) interface.
//!
//! The `vlc` child process is spawned on first use. Commands go to its stdin
//! one per line; a reader thread forwards stdout lines over a channel so
//! replies can be awaited with a timeout.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use super::MediaBackend;
use crate::error::{Error, Result};

const REPLY_TIMEOUT: Duration = Duration::from_millis(500);

/// Outcome of a query. VLC answers slowly while buffering, so silence is
/// not the same as "no".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reply {
    Value(u64),
    Silent,
    /// No process, or it exited.
    Gone,
}

impl Reply {
    fn value(self) -> Option<u64> {
        match self {
            Self::Value(v) => Some(v),
            Self::Silent | Self::Gone => None,
        }
    }
}

struct VlcProcess {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
}

pub struct VlcBackend {
    program: PathBuf,
    process: Option<VlcProcess>,
    /// VLC's `pause` toggles, so the pause state is tracked here.
    paused: bool,
}

impl VlcBackend {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            process: None,
            paused: false,
        }
    }

    fn process(&mut self) -> Result<&mut VlcProcess> {
        if self.process.is_none() {
            self.process = Some(self.spawn()?);
        }
        self.process
            .as_mut()
            .ok_or_else(|| Error::Backend("vlc is not running".into()))
    }

    fn spawn(&self) -> Result<VlcProcess> {
        let mut child = Command::new(&self.program)
            .args(["-I", "rc", "--rc-fake-tty", "--no-video", "--quiet"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Backend(format!("cannot start {}: {e}", self.program.display())))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            // Both are piped above.
            let _ = child.kill();
            return Err(Error::Backend("vlc stdio unavailable".into()));
        };
        let (tx, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines().map_while(std::result::Result::ok) {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        debug!(program = %self.program.display(), pid = child.id(), "vlc started");
        Ok(VlcProcess {
            child,
            stdin,
            lines,
        })
    }

    fn send(&mut self, command: &str) -> Result<()> {
        let process = self.process()?;
        trace!(command, "vlc <");
        writeln!(process.stdin, "{command}")
            .and_then(|()| process.stdin.flush())
            .map_err(|e| Error::Backend(format!("vlc went away: {e}")))
    }

    /// Send `command` and wait for the first numeric reply.
    fn query(&mut self, command: &str) -> Reply {
        let Ok(process) = self.process() else {
            return Reply::Gone;
        };
        while process.lines.try_recv().is_ok() {}
        if let Err(e) = self.send(command) {
            warn!("{e}");
            return Reply::Gone;
        }
        let Some(process) = self.process.as_mut() else {
            return Reply::Gone;
        };
        let deadline = Instant::now() + REPLY_TIMEOUT;
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match process.lines.recv_timeout(left) {
                Ok(line) => {
                    trace!(line, "vlc >");
                    if let Some(value) = parse_reply(&line) {
                        return Reply::Value(value);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    debug!(command, "no reply from vlc");
                    return Reply::Silent;
                }
                Err(RecvTimeoutError::Disconnected) => return Reply::Gone,
            }
        }
    }

    /// `Some(false)` only when VLC said so or is gone; `None` when it did not answer.
    fn playing_state(&mut self) -> Option<bool> {
        match self.query("is_playing") {
            Reply::Value(v) => Some(v == 1),
            Reply::Silent => None,
            Reply::Gone => Some(false),
        }
    }
}

/// Numeric payload of an rc reply line, ignoring `> ` prompts.
fn parse_reply(line: &str) -> Option<u64> {
    line.trim_start_matches(['>', ' ']).trim().parse().ok()
}

impl MediaBackend for VlcBackend {
    fn load_url(&mut self, url: &str) -> Result<()> {
        self.send("clear")?;
        self.send(&format!("enqueue {url}"))?;
        self.paused = false;
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.send("play")
    }

    fn pause(&mut self) -> Result<()> {
        if !self.paused {
            self.send("pause")?;
            self.paused = true;
        }
        Ok(())
    }

    fn unpause(&mut self) -> Result<()> {
        if self.paused {
            self.send("pause")?;
            self.paused = false;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.process.is_none() {
            return Ok(());
        }
        self.paused = false;
        self.send("stop")
    }

    fn is_playing(&mut self) -> bool {
        self.playing_state().unwrap_or(true)
    }

    fn duration_ms(&mut self) -> Option<u64> {
        self.query("get_length")
            .value()
            .filter(|&s| s > 0)
            .map(|s| s * 1_000)
    }

    fn position_ms(&mut self) -> Option<u64> {
        self.query("get_time").value().map(|s| s * 1_000)
    }

    fn set_position(&mut self, ms: u64) -> Result<()> {
        self.send(&format!("seek {}", ms / 1_000))?;
        if self.paused || self.playing_state() != Some(false) {
            Ok(())
        } else {
            Err(Error::Backend(format!("vlc stopped after seeking to {ms} ms")))
        }
    }
}

impl Drop for VlcBackend {
    fn drop(&mut self) {
        if let Some(mut process) = self.process.take() {
            let _ = writeln!(process.stdin, "quit");
            let _ = process.child.kill();
            let _ = process.child.wait();
        }
    }
}
