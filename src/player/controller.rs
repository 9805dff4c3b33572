// Playlist controller - the only thing that drives the audio pipeline
//
// Track-changing operations hand back a `LoadTicket` when there is something
// to fetch; the caller owns the actual network work and reports back through
// `finish_load`. Keeps this type synchronous and easy to test.

use crate::audio::decoder::DecodedAudio;
use crate::audio::pipeline::{AudioPipeline, Completion, LoadTicket, SourceId};
use crate::audio::playlist::Playlist;
use crate::catalog::Track;
use crate::error::{PipelineError, Result};
use crate::visualization::{VisualizationFrame, VisualizationSampler};
use tracing::{debug, info, warn};

pub struct PlaylistController {
    playlist: Playlist,
    pipeline: AudioPipeline,
    sampler: VisualizationSampler,
}

impl PlaylistController {
    pub fn new(pipeline: AudioPipeline, sampler: VisualizationSampler) -> Self {
        Self {
            playlist: Playlist::default(),
            pipeline,
            sampler,
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn pipeline(&self) -> &AudioPipeline {
        &self.pipeline
    }

    /// New list, cursor on the first track, loaded but not playing
    pub fn load_playlist(&mut self, tracks: Vec<Track>) -> Option<LoadTicket> {
        info!("Loading playlist of {} tracks", tracks.len());
        self.playlist.replace(tracks);
        self.load_current()
    }

    pub fn next(&mut self) -> Option<LoadTicket> {
        if !self.playlist.advance() {
            debug!("next() ignored, {} track(s)", self.playlist.len());
            return None;
        }
        self.load_current()
    }

    pub fn previous(&mut self) -> Option<LoadTicket> {
        if !self.playlist.retreat() {
            debug!("previous() ignored, {} track(s)", self.playlist.len());
            return None;
        }
        self.load_current()
    }

    pub fn select(&mut self, index: usize) -> Option<LoadTicket> {
        if !self.playlist.select(index) {
            debug!("select({}) out of range", index);
            return None;
        }
        self.load_current()
    }

    pub fn finish_load(&mut self, ticket: &LoadTicket, result: Result<DecodedAudio>) -> bool {
        self.pipeline.finish_load(ticket, result)
    }

    /// A source finished. Natural completion moves on to the next track
    /// (from wherever the cursor is now) with autoplay.
    pub fn handle_source_ended(&mut self, id: SourceId) -> Option<LoadTicket> {
        match self.pipeline.handle_source_ended(id) {
            Completion::Natural => {
                info!("Track {} finished", self.playlist.index());
                self.next()
            }
            Completion::Superseded => None,
        }
    }

    pub fn play(&mut self) {
        log_start(self.pipeline.play());
    }

    pub fn pause(&mut self) {
        self.pipeline.pause();
    }

    pub fn toggle_play_pause(&mut self) {
        if self.pipeline.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn play_from_start(&mut self) {
        log_start(self.pipeline.play_from_start());
    }

    pub fn seek_to(&mut self, seconds: f64) {
        log_start(self.pipeline.seek_to(seconds));
    }

    pub fn seek_by(&mut self, delta_seconds: f64) {
        log_start(self.pipeline.seek_by(delta_seconds));
    }

    pub fn seek_to_fraction(&mut self, fraction: f64) {
        log_start(self.pipeline.seek_to_fraction(fraction));
    }

    /// Bars for the current playhead, flat when nothing is playing
    pub fn frame(&mut self) -> VisualizationFrame {
        match self.pipeline.sample_frequencies() {
            Some(raw) => self.sampler.sample(&raw, true),
            None => self.flat_frame(),
        }
    }

    pub fn flat_frame(&self) -> VisualizationFrame {
        self.sampler.flat(self.pipeline.bin_count())
    }

    pub fn close(&mut self) {
        self.pipeline.close();
    }

    fn load_current(&mut self) -> Option<LoadTicket> {
        // consumed whether or not the load goes anywhere
        let autoplay = self.playlist.take_autoplay();
        let url = self.playlist.current().and_then(|t| t.preview_url.clone());

        match self.pipeline.begin_load(url.as_deref(), autoplay) {
            Ok(ticket) => Some(ticket),
            Err(PipelineError::MissingPreview) if self.playlist.is_empty() => {
                debug!("Playlist is empty, nothing to load");
                None
            }
            Err(e) => {
                let title = self.playlist.current().map(|t| t.title.as_str()).unwrap_or("?");
                warn!("Cannot load '{}': {}", title, e);
                None
            }
        }
    }
}

fn log_start(result: Result<()>) {
    if let Err(e) = result {
        warn!("Transport command failed: {}", e);
    }
}
