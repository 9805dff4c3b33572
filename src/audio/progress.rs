// Playback progress - what the 250ms poller reads off the pipeline

use super::pipeline::AudioPipeline;

/// Elapsed over total, clamped to 0..=1. Zero for empty or zero-length audio.
pub fn completion_fraction(current: f64, duration: f64) -> f64 {
    if !(duration > 0.0) || !current.is_finite() {
        return 0.0;
    }
    (current / duration).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressSample {
    pub current_time: f64,
    pub duration: f64,
    pub fraction: f64,
}

impl ProgressSample {
    pub fn of(pipeline: &AudioPipeline) -> Self {
        let current_time = pipeline.current_playback_time();
        let duration = pipeline.duration();
        Self {
            current_time,
            duration,
            fraction: completion_fraction(current_time, duration),
        }
    }
}

/// `m:ss`, the way the transport bar shows it
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
