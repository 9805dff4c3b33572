// Output stage - where decoded buffers actually become sound
// The pipeline only sees the traits; rodio lives behind the `audio` feature.

use super::decoder::DecodedAudio;
use crate::error::Result;
use std::sync::Arc;

/// Called once by the output when a source plays through to its end.
/// A stopped source may or may not call it - the pipeline decides what counts.
pub type EndNotifier = Box<dyn FnOnce() + Send>;

pub trait OutputStage: Send {
    /// Output clock in seconds. Monotonic, keeps running while nothing plays.
    fn current_time(&self) -> f64;

    /// Start playing `audio` from `offset` seconds on a fresh single-use source
    fn start(
        &mut self,
        audio: Arc<DecodedAudio>,
        offset: f64,
        on_end: EndNotifier,
    ) -> Result<Box<dyn ScheduledSource>>;

    /// Release the device. Must tolerate being called more than once.
    fn close(&mut self);
}

/// Handle to one playing source. Cannot be restarted once stopped.
pub trait ScheduledSource: Send {
    fn stop(&mut self);
}

#[cfg(feature = "audio")]
pub use self::rodio_output::RodioOutput;

#[cfg(feature = "audio")]
mod rodio_output {
    use super::{EndNotifier, OutputStage, ScheduledSource};
    use crate::audio::decoder::DecodedAudio;
    use crate::config::AudioSettings;
    use crate::error::{PipelineError, Result};
    use anyhow::Context;
    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread::JoinHandle;
    use std::time::{Duration, Instant};
    use tracing::{debug, info, warn};

    /// Device output through rodio.
    ///
    /// `OutputStream` is not `Send`, so it lives on its own thread for the
    /// whole lifetime of the output; we only keep the (sendable) handle.
    pub struct RodioOutput {
        handle: Option<OutputStreamHandle>,
        shutdown: Option<mpsc::Sender<()>>,
        thread: Option<JoinHandle<()>>,
        clock: Instant,
        volume: f32,
    }

    impl RodioOutput {
        pub fn open(settings: &AudioSettings) -> anyhow::Result<Self> {
            let (ready_tx, ready_rx) = mpsc::channel();
            let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

            let thread = std::thread::Builder::new()
                .name("wavepeek-output".to_string())
                .spawn(move || match OutputStream::try_default() {
                    Ok((stream, handle)) => {
                        let _ = ready_tx.send(Ok(handle));
                        // park until the output is closed or dropped
                        let _ = shutdown_rx.recv();
                        drop(stream);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                    }
                })
                .context("Failed to spawn audio output thread")?;

            let handle = ready_rx
                .recv()
                .context("Audio output thread exited before opening a device")?
                .map_err(|e| anyhow::anyhow!("No audio output device: {}", e))?;

            info!("Opened default audio output");
            Ok(Self {
                handle: Some(handle),
                shutdown: Some(shutdown_tx),
                thread: Some(thread),
                clock: Instant::now(),
                volume: settings.volume,
            })
        }
    }

    impl OutputStage for RodioOutput {
        fn current_time(&self) -> f64 {
            self.clock.elapsed().as_secs_f64()
        }

        fn start(
            &mut self,
            audio: Arc<DecodedAudio>,
            offset: f64,
            on_end: EndNotifier,
        ) -> Result<Box<dyn ScheduledSource>> {
            let handle = self
                .handle
                .as_ref()
                .ok_or_else(|| PipelineError::PlaybackStart("output is closed".to_string()))?;

            let sink = Sink::try_new(handle).map_err(|e| PipelineError::PlaybackStart(e.to_string()))?;
            sink.set_volume(self.volume);
            sink.append(BufferSource::new(audio, offset, on_end));

            Ok(Box::new(RodioSource { sink }))
        }

        fn close(&mut self) {
            self.handle = None;
            // dropping the sender wakes the output thread so the stream is released
            self.shutdown = None;
            if let Some(thread) = self.thread.take() {
                if thread.join().is_err() {
                    warn!("Audio output thread panicked during shutdown");
                }
                debug!("Audio output closed");
            }
        }
    }

    impl Drop for RodioOutput {
        fn drop(&mut self) {
            self.close();
        }
    }

    struct RodioSource {
        sink: Sink,
    }

    impl ScheduledSource for RodioSource {
        fn stop(&mut self) {
            self.sink.stop();
        }
    }

    impl Drop for RodioSource {
        fn drop(&mut self) {
            self.sink.stop();
        }
    }

    /// Plays a shared decoded buffer from a frame offset, no copying
    struct BufferSource {
        audio: Arc<DecodedAudio>,
        position: usize,
        on_end: Option<EndNotifier>,
    }

    impl BufferSource {
        fn new(audio: Arc<DecodedAudio>, offset: f64, on_end: EndNotifier) -> Self {
            let position = audio.frame_at(offset) * audio.channels() as usize;
            Self {
                audio,
                position,
                on_end: Some(on_end),
            }
        }
    }

    impl Iterator for BufferSource {
        type Item = f32;

        fn next(&mut self) -> Option<f32> {
            match self.audio.samples().get(self.position) {
                Some(sample) => {
                    self.position += 1;
                    Some(*sample)
                }
                None => {
                    if let Some(notify) = self.on_end.take() {
                        notify();
                    }
                    None
                }
            }
        }
    }

    impl Source for BufferSource {
        fn current_frame_len(&self) -> Option<usize> {
            None
        }

        fn channels(&self) -> u16 {
            self.audio.channels()
        }

        fn sample_rate(&self) -> u32 {
            self.audio.sample_rate()
        }

        fn total_duration(&self) -> Option<Duration> {
            let remaining = self.audio.samples().len().saturating_sub(self.position);
            let frames = remaining / self.audio.channels() as usize;
            Some(Duration::from_secs_f64(frames as f64 / self.audio.sample_rate() as f64))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::sync::atomic::{AtomicUsize, Ordering};

        fn counting_notifier() -> (Arc<AtomicUsize>, EndNotifier) {
            let calls = Arc::new(AtomicUsize::new(0));
            let seen = Arc::clone(&calls);
            let notify: EndNotifier = Box::new(move || {
                seen.fetch_add(1, Ordering::SeqCst);
            });
            (calls, notify)
        }

        // four stereo frames at 2 Hz = 2 seconds
        fn stereo_clip() -> Arc<DecodedAudio> {
            Arc::new(DecodedAudio::new(vec![0.0, 0.1, 1.0, 1.1, 2.0, 2.1, 3.0, 3.1], 2, 2))
        }

        #[test]
        fn notifies_once_when_the_buffer_runs_out() {
            let (calls, on_end) = counting_notifier();
            let mut source = BufferSource::new(stereo_clip(), 0.0, on_end);

            for _ in 0..7 {
                assert!(source.next().is_some());
            }
            assert_eq!(calls.load(Ordering::SeqCst), 0);

            assert_eq!(source.next(), Some(3.1));
            assert_eq!(source.next(), None);
            assert_eq!(calls.load(Ordering::SeqCst), 1);

            // the sink keeps polling an exhausted source
            assert_eq!(source.next(), None);
            assert_eq!(source.next(), None);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }

        #[test]
        fn offset_starts_on_a_frame_boundary() {
            let (_calls, on_end) = counting_notifier();
            let mut source = BufferSource::new(stereo_clip(), 1.0, on_end);

            assert_eq!(Source::channels(&source), 2);
            assert_eq!(source.total_duration(), Some(Duration::from_secs(1)));
            let rest: Vec<f32> = Iterator::by_ref(&mut source).collect();
            assert_eq!(rest, vec![2.0, 2.1, 3.0, 3.1]);
        }

        #[test]
        fn offset_at_or_past_the_end_finishes_immediately() {
            for offset in [2.0, 99.0] {
                let (calls, on_end) = counting_notifier();
                let mut source = BufferSource::new(stereo_clip(), offset, on_end);

                assert_eq!(source.total_duration(), Some(Duration::ZERO));
                assert_eq!(source.next(), None);
                assert_eq!(calls.load(Ordering::SeqCst), 1, "offset {}", offset);
            }
        }
    }
}
