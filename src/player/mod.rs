// Player service - one task owns the controller, everything else talks to it
//
// The UI holds a cheap `Player` handle: commands go in over a channel,
// state comes back as `PlayerSnapshot`s on a watch channel. Fetches run on
// their own tasks and report back into the same loop, so the pipeline is
// only ever touched from one place.

pub mod controller;
pub mod ticker;

pub use controller::PlaylistController;
pub use ticker::PeriodicTask;

use crate::audio::decoder::DecodedAudio;
use crate::audio::fetch::{self, PreviewFetcher};
use crate::audio::output::OutputStage;
use crate::audio::pipeline::{AudioPipeline, LoadTicket, SourceId};
use crate::audio::progress::ProgressSample;
use crate::catalog::Track;
use crate::config::{Config, SamplingConfig};
use crate::error::Result;
use crate::visualization::{VisualizationFrame, VisualizationSampler};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Everything the UI needs to draw one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerSnapshot {
    pub loading: bool,
    pub playing: bool,
    pub playable: bool,
    pub progress: ProgressSample,
    pub index: usize,
    pub track_count: usize,
    pub track: Option<Track>,
    pub bars: VisualizationFrame,
    pub can_go_next: bool,
    pub can_go_previous: bool,
}

#[derive(Debug)]
enum Command {
    LoadPlaylist(Vec<Track>),
    Play,
    Pause,
    TogglePlayPause,
    PlayFromStart,
    Next,
    Previous,
    Select(usize),
    SeekTo(f64),
    SeekBy(f64),
    SeekToFraction(f64),
    Shutdown,
}

enum Event {
    Loaded {
        ticket: LoadTicket,
        result: Result<DecodedAudio>,
    },
    ProgressTick,
    FrameTick,
}

/// Handle to the running player service
pub struct Player {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<PlayerSnapshot>,
    task: Option<JoinHandle<()>>,
    #[cfg(test)]
    ticks: Arc<TickCounts>,
}

/// Poll events the service has handled, for checking ticker lifetimes
#[cfg(test)]
#[derive(Debug, Default)]
struct TickCounts {
    progress: std::sync::atomic::AtomicUsize,
    frames: std::sync::atomic::AtomicUsize,
}

impl Player {
    /// Start the service on the current tokio runtime
    pub fn spawn(output: Box<dyn OutputStage>, fetcher: Arc<dyn PreviewFetcher>, config: &Config) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (ended_tx, ended_rx) = mpsc::unbounded_channel();

        let pipeline = AudioPipeline::new(output, &config.audio, ended_tx);
        let controller = PlaylistController::new(pipeline, VisualizationSampler::new(&config.visualization));
        let frame = controller.flat_frame();
        let (state_tx, state_rx) = watch::channel(PlayerSnapshot {
            bars: frame.clone(),
            ..PlayerSnapshot::default()
        });

        #[cfg(test)]
        let ticks = Arc::new(TickCounts::default());

        let service = PlayerService {
            controller,
            fetcher,
            sampling: config.sampling.clone(),
            commands: command_rx,
            events_tx: event_tx,
            events: event_rx,
            ended: ended_rx,
            state: state_tx,
            load_task: None,
            progress_ticker: None,
            frame_ticker: None,
            frame,
            #[cfg(test)]
            ticks: Arc::clone(&ticks),
        };

        Self {
            commands: command_tx,
            state: state_rx,
            task: Some(tokio::spawn(service.run())),
            #[cfg(test)]
            ticks,
        }
    }

    pub fn load_playlist(&self, tracks: Vec<Track>) {
        self.send(Command::LoadPlaylist(tracks));
    }

    pub fn play(&self) {
        self.send(Command::Play);
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn toggle_play_pause(&self) {
        self.send(Command::TogglePlayPause);
    }

    pub fn play_from_start(&self) {
        self.send(Command::PlayFromStart);
    }

    pub fn next(&self) {
        self.send(Command::Next);
    }

    pub fn previous(&self) {
        self.send(Command::Previous);
    }

    pub fn select(&self, index: usize) {
        self.send(Command::Select(index));
    }

    pub fn seek_to(&self, seconds: f64) {
        self.send(Command::SeekTo(seconds));
    }

    pub fn seek_by(&self, delta_seconds: f64) {
        self.send(Command::SeekBy(delta_seconds));
    }

    pub fn seek_to_fraction(&self, fraction: f64) {
        self.send(Command::SeekToFraction(fraction));
    }

    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.state.borrow().clone()
    }

    /// Stop polling, cancel any fetch and release the audio output
    pub async fn shutdown(mut self) {
        self.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Player service ended abnormally: {}", e);
            }
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("Player service already stopped, command dropped");
        }
    }
}

struct PlayerService {
    controller: PlaylistController,
    fetcher: Arc<dyn PreviewFetcher>,
    sampling: SamplingConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<Event>,
    events: mpsc::UnboundedReceiver<Event>,
    ended: mpsc::UnboundedReceiver<SourceId>,
    state: watch::Sender<PlayerSnapshot>,
    load_task: Option<JoinHandle<()>>,
    progress_ticker: Option<PeriodicTask>,
    frame_ticker: Option<PeriodicTask>,
    frame: VisualizationFrame,
    #[cfg(test)]
    ticks: Arc<TickCounts>,
}

impl PlayerService {
    async fn run(mut self) {
        info!("Player service started");
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    // a dropped handle counts as shutdown
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(id) = self.ended.recv() => {
                    if let Some(ticket) = self.controller.handle_source_ended(id) {
                        self.replace_load(Some(ticket));
                    }
                }
                Some(event) = self.events.recv() => self.handle_event(event),
            }
            self.sync_tickers();
            self.publish();
        }
        self.stop();
    }

    fn handle_command(&mut self, command: Command) {
        debug!("Player command: {:?}", command);
        match command {
            Command::LoadPlaylist(tracks) => {
                let ticket = self.controller.load_playlist(tracks);
                self.replace_load(ticket);
            }
            Command::Next => {
                if self.controller.playlist().can_go_next() {
                    let ticket = self.controller.next();
                    self.replace_load(ticket);
                }
            }
            Command::Previous => {
                if self.controller.playlist().can_go_previous() {
                    let ticket = self.controller.previous();
                    self.replace_load(ticket);
                }
            }
            Command::Select(index) => {
                if index < self.controller.playlist().len() {
                    let ticket = self.controller.select(index);
                    self.replace_load(ticket);
                }
            }
            Command::Play => self.controller.play(),
            Command::Pause => self.controller.pause(),
            Command::TogglePlayPause => self.controller.toggle_play_pause(),
            Command::PlayFromStart => self.controller.play_from_start(),
            Command::SeekTo(seconds) => self.controller.seek_to(seconds),
            Command::SeekBy(delta) => self.controller.seek_by(delta),
            Command::SeekToFraction(fraction) => self.controller.seek_to_fraction(fraction),
            Command::Shutdown => {}
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Loaded { ticket, result } => {
                if self.controller.finish_load(&ticket, result) {
                    self.load_task = None;
                }
            }
            Event::ProgressTick => {
                #[cfg(test)]
                self.ticks.progress.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
            Event::FrameTick => {
                #[cfg(test)]
                self.ticks.frames.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                self.frame = self.controller.frame();
            }
        }
    }

    /// The track changed: whatever was in flight is no longer wanted
    fn replace_load(&mut self, ticket: Option<LoadTicket>) {
        if let Some(task) = self.load_task.take() {
            task.abort();
        }
        let Some(ticket) = ticket else {
            return;
        };

        let fetcher = Arc::clone(&self.fetcher);
        let events = self.events_tx.clone();
        self.load_task = Some(tokio::spawn(async move {
            let result = fetch::fetch_and_decode(fetcher.as_ref(), &ticket.url).await;
            let _ = events.send(Event::Loaded { ticket, result });
        }));
    }

    /// Progress polls while a buffer is loaded, frames only while playing
    fn sync_tickers(&mut self) {
        let pipeline = self.controller.pipeline();
        let playable = pipeline.is_playable();
        let playing = pipeline.is_playing();

        if playable && self.progress_ticker.is_none() {
            self.progress_ticker = Some(PeriodicTask::spawn(
                self.sampling.progress_interval(),
                self.events_tx.clone(),
                || Event::ProgressTick,
            ));
        } else if !playable {
            self.progress_ticker = None;
        }

        if playing && self.frame_ticker.is_none() {
            self.frame_ticker = Some(PeriodicTask::spawn(
                self.sampling.frame_interval(),
                self.events_tx.clone(),
                || Event::FrameTick,
            ));
        } else if !playing {
            self.frame_ticker = None;
            self.frame = self.controller.flat_frame();
        }
    }

    fn publish(&self) {
        let pipeline = self.controller.pipeline();
        let playlist = self.controller.playlist();
        self.state.send_replace(PlayerSnapshot {
            loading: pipeline.is_loading(),
            playing: pipeline.is_playing(),
            playable: pipeline.is_playable(),
            progress: ProgressSample::of(pipeline),
            index: playlist.index(),
            track_count: playlist.len(),
            track: playlist.current().cloned(),
            bars: self.frame.clone(),
            can_go_next: playlist.can_go_next(),
            can_go_previous: playlist.can_go_previous(),
        });
    }

    fn stop(&mut self) {
        if let Some(task) = self.load_task.take() {
            task.abort();
        }
        self.progress_ticker = None;
        self.frame_ticker = None;
        self.controller.close();
        self.frame = self.controller.flat_frame();
        self.publish();
        info!("Player service stopped");
    }
}
