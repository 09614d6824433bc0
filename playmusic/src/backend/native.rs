//! Playback on the default audio output through rodio.
//!
//! The whole stream body is fetched and decoded from memory, so seeking
//! never touches the network.

use std::io::Cursor;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::debug;

use super::MediaBackend;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, HttpFetcher};

pub struct NativeBackend {
    // Dropping the stream silences every sink.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    fetcher: HttpFetcher,
    sink: Option<Sink>,
    duration: Option<Duration>,
}

impl NativeBackend {
    pub fn new() -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| Error::Backend(format!("no audio output: {e}")))?;
        Ok(Self {
            _stream: stream,
            handle,
            fetcher: HttpFetcher::new()?,
            sink: None,
            duration: None,
        })
    }

    fn sink(&self) -> Result<&Sink> {
        self.sink
            .as_ref()
            .ok_or_else(|| Error::Backend("nothing loaded".into()))
    }
}

impl MediaBackend for NativeBackend {
    fn load_url(&mut self, url: &str) -> Result<()> {
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        let body = self.fetcher.fetch(url)?;
        let source = Decoder::new(Cursor::new(body.bytes))
            .map_err(|e| Error::Backend(format!("cannot decode {url}: {e}")))?;
        self.duration = source.total_duration();

        let sink = Sink::try_new(&self.handle).map_err(|e| Error::Backend(e.to_string()))?;
        sink.pause();
        sink.append(source);
        debug!(duration = ?self.duration, "loaded");
        self.sink = Some(sink);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        self.sink()?.play();
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.sink()?.pause();
        Ok(())
    }

    fn unpause(&mut self) -> Result<()> {
        self.play()
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.duration = None;
        Ok(())
    }

    fn is_playing(&mut self) -> bool {
        self.sink.as_ref().is_some_and(|s| !s.empty())
    }

    fn duration_ms(&mut self) -> Option<u64> {
        self.duration.and_then(|d| u64::try_from(d.as_millis()).ok())
    }

    fn position_ms(&mut self) -> Option<u64> {
        let pos = self.sink.as_ref()?.get_pos();
        u64::try_from(pos.as_millis()).ok()
    }

    fn set_position(&mut self, ms: u64) -> Result<()> {
        self.sink()?
            .try_seek(Duration::from_millis(ms))
            .map_err(|e| Error::Backend(format!("seek to {ms} ms failed: {e}")))
    }
}
