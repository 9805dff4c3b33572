// Full-buffer decoding of preview bytes
// Previews are ~30s so we decode everything up front into interleaved f32 -
// seeking is then just an index into the buffer.

use crate::error::{PipelineError, Result};
use std::io::Cursor;
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

// A corrupt packet is skipped; this many in a row means the stream is junk.
const MAX_CONSECUTIVE_DECODE_ERRORS: usize = 3;

/// Decoded, immutable audio. Cheap to share between the output stage and the analyser.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    samples: Arc<[f32]>,
    channels: u16,
    sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            channels: channels.max(1),
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Frame index for a position in seconds, clamped to the buffer
    pub fn frame_at(&self, seconds: f64) -> usize {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        ((seconds * self.sample_rate as f64) as usize).min(self.frames())
    }

    /// Fill `out` with the mono downmix of the frames ending (exclusive) at `end_frame`.
    /// Anything before the start of the buffer is silence.
    pub fn mono_window(&self, end_frame: usize, out: &mut [f32]) {
        let channels = self.channels as usize;
        let end_frame = end_frame.min(self.frames());
        let len = out.len();

        for (i, slot) in out.iter_mut().enumerate() {
            // frame for slot i is end_frame - len + i, which may be negative
            let offset = len - i;
            *slot = if offset > end_frame {
                0.0
            } else {
                let frame = end_frame - offset;
                let start = frame * channels;
                let sum: f32 = self.samples[start..start + channels].iter().sum();
                sum / channels as f32
            };
        }
    }
}

/// Decode a complete encoded file held in memory.
/// `extension` is only a probe hint (e.g. "mp3"), detection still sniffs the bytes.
pub fn decode(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| PipelineError::Decode(format!("unrecognized format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PipelineError::Decode("no decodable audio track".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PipelineError::Decode(format!("unsupported codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut channels = 0u16;
    let mut sample_rate = 0u32;
    let mut consecutive_errors = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(PipelineError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                consecutive_errors = 0;
                if sample_buf.is_none() {
                    let spec = *decoded.spec();
                    channels = spec.channels.count() as u16;
                    sample_rate = spec.rate;
                    sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
                }
                if let Some(buf) = sample_buf.as_mut() {
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
            }
            Err(SymphoniaError::DecodeError(e)) => {
                consecutive_errors += 1;
                warn!("Skipping corrupt packet ({}/{}): {}", consecutive_errors, MAX_CONSECUTIVE_DECODE_ERRORS, e);
                if consecutive_errors >= MAX_CONSECUTIVE_DECODE_ERRORS {
                    return Err(PipelineError::Decode(format!("too many corrupt packets: {}", e)));
                }
            }
            Err(e) => return Err(PipelineError::Decode(e.to_string())),
        }
    }

    if samples.is_empty() || channels == 0 {
        return Err(PipelineError::Decode("stream contained no audio frames".to_string()));
    }

    let audio = DecodedAudio::new(samples, channels, sample_rate);
    debug!(
        "Decoded {:.2}s of audio ({} ch @ {} Hz)",
        audio.duration(),
        audio.channels(),
        audio.sample_rate()
    );
    Ok(audio)
}

/// Pull a lowercase file extension out of a URL path, ignoring query/fragment
pub fn extension_hint(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 16-bit PCM WAV bytes for a sine tone
    pub(crate) fn sine_wav(freq: f32, seconds: f32, sample_rate: u32, channels: u16) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            let frames = (seconds * sample_rate as f32) as usize;
            for n in 0..frames {
                let t = n as f32 / sample_rate as f32;
                let value = (t * freq * std::f32::consts::TAU).sin() * 0.5;
                for _ in 0..channels {
                    writer.write_sample((value * i16::MAX as f32) as i16).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        bytes
    }

    #[test]
    fn decodes_wav_into_interleaved_buffer() {
        let bytes = sine_wav(440.0, 1.0, 8000, 2);
        let audio = decode(bytes, Some("wav")).unwrap();

        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.sample_rate(), 8000);
        assert_eq!(audio.frames(), 8000);
        assert!((audio.duration() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = decode(b"definitely not audio".to_vec(), None).unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn mono_window_pads_before_buffer_start() {
        let audio = DecodedAudio::new(vec![1.0, 3.0, 2.0, 2.0], 2, 10);
        let mut out = [9.0f32; 4];
        audio.mono_window(2, &mut out);
        assert_eq!(out, [0.0, 0.0, 2.0, 2.0]);
    }

    #[test]
    fn frame_at_clamps_to_buffer() {
        let audio = DecodedAudio::new(vec![0.0; 20], 1, 10);
        assert_eq!(audio.frame_at(-1.0), 0);
        assert_eq!(audio.frame_at(0.5), 5);
        assert_eq!(audio.frame_at(99.0), 20);
    }

    #[test]
    fn extension_hint_ignores_query_strings() {
        assert_eq!(extension_hint("https://cdn/x/preview.MP3?hdnea=exp=1~acl=/*"), Some("mp3".to_string()));
        assert_eq!(extension_hint("https://cdn/x/preview"), None);
    }
}
