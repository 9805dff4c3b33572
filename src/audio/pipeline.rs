// Audio pipeline - one output, one analyser, at most one scheduled source
//
// Loading is split in two because fetch/decode is async: `begin_load` tears
// the old session down and hands out a ticket, `finish_load` applies the
// result only if no newer load has started since.

use super::analyser::Analyser;
use super::decoder::DecodedAudio;
use super::output::{OutputStage, ScheduledSource};
use super::progress;
use crate::config::AudioSettings;
use crate::error::{PipelineError, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

pub type SourceId = u64;

/// What an "ended" notification turned out to mean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The playing source reached its end on its own
    Natural,
    /// Stopped by pause/seek/load, or already handled - not a track end
    Superseded,
}

/// Proof that a load was started; stale tickets are ignored by `finish_load`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    pub url: String,
}

enum Transport {
    Paused {
        offset: f64,
    },
    Playing {
        source: Box<dyn ScheduledSource>,
        id: SourceId,
        anchor: f64, // output clock time that corresponds to offset 0
    },
}

enum Session {
    Empty,
    Loaded {
        audio: Arc<DecodedAudio>,
        transport: Transport,
    },
}

pub struct AudioPipeline {
    output: Box<dyn OutputStage>,
    analyser: Analyser,
    session: Session,
    ended: mpsc::UnboundedSender<SourceId>,
    generation: u64,
    next_source_id: SourceId,
    loading: bool,
    autoplay_on_load: bool,
    closed: bool,
}

impl AudioPipeline {
    /// `ended` receives the id of every source the output reports as finished;
    /// feed them back through `handle_source_ended`.
    pub fn new(
        output: Box<dyn OutputStage>,
        settings: &AudioSettings,
        ended: mpsc::UnboundedSender<SourceId>,
    ) -> Self {
        Self {
            output,
            analyser: Analyser::new(settings),
            session: Session::Empty,
            ended,
            generation: 0,
            next_source_id: 0,
            loading: false,
            autoplay_on_load: false,
            closed: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_playing(&self) -> bool {
        matches!(
            self.session,
            Session::Loaded {
                transport: Transport::Playing { .. },
                ..
            }
        )
    }

    pub fn is_playable(&self) -> bool {
        matches!(self.session, Session::Loaded { .. })
    }

    /// Seconds, 0 when nothing is loaded
    pub fn duration(&self) -> f64 {
        match &self.session {
            Session::Loaded { audio, .. } => audio.duration(),
            Session::Empty => 0.0,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.analyser.bin_count()
    }

    /// Drop whatever is loaded or playing and start loading `url`
    pub fn begin_load(&mut self, url: Option<&str>, autoplay: bool) -> Result<LoadTicket> {
        self.reset_session();

        if self.closed {
            debug!("Load requested after close");
            return Err(PipelineError::Closed);
        }

        let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
            return Err(PipelineError::MissingPreview);
        };

        self.autoplay_on_load = autoplay;
        self.loading = true;
        debug!("Loading preview {} (autoplay: {})", url, autoplay);

        Ok(LoadTicket {
            generation: self.generation,
            url: url.to_string(),
        })
    }

    /// Apply a finished fetch+decode. Returns false when the ticket was stale.
    pub fn finish_load(&mut self, ticket: &LoadTicket, result: Result<DecodedAudio>) -> bool {
        if self.closed || ticket.generation != self.generation {
            debug!("Discarding superseded load of {}", ticket.url);
            return false;
        }

        self.loading = false;
        let autoplay = std::mem::take(&mut self.autoplay_on_load);

        match result {
            Ok(audio) => {
                info!("Loaded {} ({:.1}s)", ticket.url, audio.duration());
                self.session = Session::Loaded {
                    audio: Arc::new(audio),
                    transport: Transport::Paused { offset: 0.0 },
                };
                if autoplay {
                    if let Err(e) = self.start_at(0.0) {
                        warn!("Autoplay of {} failed: {}", ticket.url, e);
                    }
                }
            }
            Err(e) => {
                warn!("Could not load preview {}: {}", ticket.url, e);
            }
        }
        true
    }

    /// Resume from the paused offset. No-op without a buffer or while playing.
    pub fn play(&mut self) -> Result<()> {
        let offset = match &self.session {
            Session::Loaded {
                audio,
                transport: Transport::Paused { offset },
            } => {
                let duration = audio.duration();
                if duration > 0.0 {
                    (*offset).clamp(0.0, duration) % duration
                } else {
                    0.0
                }
            }
            _ => return Ok(()),
        };
        self.start_at(offset)
    }

    pub fn play_from_start(&mut self) -> Result<()> {
        if !self.is_playable() {
            return Ok(());
        }
        self.halt();
        self.set_paused_offset(0.0);
        self.start_at(0.0)
    }

    pub fn pause(&mut self) {
        self.halt();
    }

    /// Clamp into `[0, duration]`; restarts the source when playing.
    /// Dropped silently while nothing is loaded.
    pub fn seek_to(&mut self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() {
            debug!("Ignoring non-finite seek target {}", seconds);
            return Ok(());
        }
        if !self.is_playable() {
            debug!("Seek to {:.2}s dropped: nothing loaded", seconds);
            return Ok(());
        }

        let target = seconds.clamp(0.0, self.duration());
        let was_playing = self.is_playing();
        self.halt();
        self.set_paused_offset(target);
        trace!("Seek to {:.2}s", target);

        if was_playing {
            self.start_at(target)
        } else {
            Ok(())
        }
    }

    pub fn seek_by(&mut self, delta_seconds: f64) -> Result<()> {
        self.seek_to(self.current_playback_time() + delta_seconds)
    }

    pub fn seek_to_fraction(&mut self, fraction: f64) -> Result<()> {
        if !fraction.is_finite() {
            return Ok(());
        }
        self.seek_to(fraction.clamp(0.0, 1.0) * self.duration())
    }

    /// Seconds into the track
    pub fn current_playback_time(&self) -> f64 {
        match &self.session {
            Session::Empty => 0.0,
            Session::Loaded { audio, transport } => match transport {
                Transport::Paused { offset } => *offset,
                Transport::Playing { anchor, .. } => {
                    (self.output.current_time() - anchor).clamp(0.0, audio.duration())
                }
            },
        }
    }

    pub fn progress_fraction(&self) -> f64 {
        progress::completion_fraction(self.current_playback_time(), self.duration())
    }

    /// Classify an end notification. Only the currently playing source can
    /// complete naturally, and only once - after that the pipeline is parked
    /// at the end of the track.
    pub fn handle_source_ended(&mut self, id: SourceId) -> Completion {
        let Session::Loaded { audio, transport } = &mut self.session else {
            trace!("End of source {} after unload", id);
            return Completion::Superseded;
        };

        let current = matches!(transport, Transport::Playing { id: playing, .. } if *playing == id);
        if !current {
            trace!("Ignoring end of superseded source {}", id);
            return Completion::Superseded;
        }

        let finished = std::mem::replace(
            transport,
            Transport::Paused {
                offset: audio.duration(),
            },
        );
        if let Transport::Playing { mut source, .. } = finished {
            source.stop();
        }
        debug!("Source {} completed naturally", id);
        Completion::Natural
    }

    /// Analyser output at the playhead; `None` unless playing
    pub fn sample_frequencies(&mut self) -> Option<Vec<u8>> {
        let audio = match &self.session {
            Session::Loaded {
                audio,
                transport: Transport::Playing { .. },
            } => Arc::clone(audio),
            _ => return None,
        };
        let position = self.current_playback_time();
        Some(self.analyser.frequency_data(&audio, position))
    }

    /// Stop everything and release the output. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.reset_session();
        self.output.close();
        self.closed = true;
        debug!("Audio pipeline closed");
    }

    fn reset_session(&mut self) {
        self.halt();
        self.session = Session::Empty;
        self.generation += 1;
        self.loading = false;
        self.autoplay_on_load = false;
        self.analyser.reset();
    }

    /// Manual stop: release the source and remember where we were.
    /// The released source's end notification becomes `Superseded`.
    fn halt(&mut self) {
        let now = self.output.current_time();
        let Session::Loaded { audio, transport } = &mut self.session else {
            return;
        };
        let offset = match transport {
            Transport::Playing { anchor, .. } => (now - *anchor).clamp(0.0, audio.duration()),
            Transport::Paused { .. } => return,
        };
        if let Transport::Playing { mut source, id, .. } =
            std::mem::replace(transport, Transport::Paused { offset })
        {
            source.stop();
            trace!("Stopped source {} at {:.2}s", id, offset);
        }
    }

    fn set_paused_offset(&mut self, target: f64) {
        if let Session::Loaded {
            transport: Transport::Paused { offset },
            ..
        } = &mut self.session
        {
            *offset = target;
        }
    }

    /// Schedule a fresh source at `offset`. Callers halt first, so there is
    /// never more than one source alive.
    fn start_at(&mut self, offset: f64) -> Result<()> {
        let now = self.output.current_time();
        let Session::Loaded { audio, transport } = &mut self.session else {
            return Ok(());
        };
        if matches!(transport, Transport::Playing { .. }) {
            return Ok(());
        }

        let id = self.next_source_id;
        self.next_source_id += 1;
        let ended = self.ended.clone();
        let source = self
            .output
            .start(Arc::clone(audio), offset, Box::new(move || {
                let _ = ended.send(id);
            }))
            .map_err(|e| {
                warn!("Playback start failed at {:.2}s: {}", offset, e);
                e
            })?;

        *transport = Transport::Playing {
            source,
            id,
            anchor: now - offset,
        };
        trace!("Started source {} at {:.2}s", id, offset);
        Ok(())
    }
}

impl Drop for AudioPipeline {
    fn drop(&mut self) {
        self.close();
    }
}
