// Error taxonomy for the playback core
// None of these reach the UI - they get logged and folded into state flags

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Non-success HTTP status, transport failure or an empty body
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Bytes arrived but could not be turned into audio
    #[error("could not decode audio: {0}")]
    Decode(String),

    /// The output stage refused to start a source
    #[error("output stage rejected playback start: {0}")]
    PlaybackStart(String),

    /// Track has nothing to load
    #[error("track has no preview url")]
    MissingPreview,

    /// The pipeline was shut down; nothing more will load or play
    #[error("audio pipeline is closed")]
    Closed,
}

impl PipelineError {
    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        PipelineError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
