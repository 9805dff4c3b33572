// Audio side of the player: fetch -> decode -> output, with an analyser tap

pub mod analyser;
pub mod decoder;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod playlist;
pub mod progress;

pub use decoder::DecodedAudio;
pub use fetch::{HttpFetcher, PreviewFetcher};
pub use output::{OutputStage, ScheduledSource};
pub use pipeline::{AudioPipeline, Completion, LoadTicket, SourceId};
pub use playlist::Playlist;
pub use progress::ProgressSample;

#[cfg(feature = "audio")]
pub use output::RodioOutput;
