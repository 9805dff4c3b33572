// wavepeek library - preview playback core
// Audio pipeline, playlist control and spectrum sampling; the TUI is optional.

pub mod audio; // fetch, decode, output, analyser, playlist state
pub mod catalog; // track model and catalog JSON
pub mod config; // settings and preferences
pub mod error; // pipeline error taxonomy
pub mod player; // service task the UI talks to
pub mod visualization; // bins -> bars

#[cfg(feature = "tui")]
pub mod ui; // terminal interface

pub use audio::{AudioPipeline, DecodedAudio, Playlist};
pub use catalog::Track;
pub use config::Config;
pub use error::PipelineError;
pub use player::{Player, PlayerSnapshot};
pub use visualization::{VisualizationFrame, VisualizationSampler};
