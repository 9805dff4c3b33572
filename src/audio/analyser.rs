// Analysis stage: byte-scaled frequency magnitudes at the playhead
//
// Mirrors what a Web Audio AnalyserNode reports so bar heights look the same
// as on the phone: Blackman window, |X|/N, exponential smoothing over time,
// then decibels mapped onto 0..=255. It reads the decoded buffer directly, so
// the audible signal is never touched.

use super::decoder::DecodedAudio;
use crate::config::AudioSettings;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

pub struct Analyser {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
    input: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl Analyser {
    pub fn new(settings: &AudioSettings) -> Self {
        let fft_size = settings.fft_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            fft,
            fft_size,
            window: blackman(fft_size),
            smoothing: settings.smoothing,
            min_db: settings.min_db,
            max_db: settings.max_db,
            input: vec![0.0; fft_size],
            spectrum: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
        }
    }

    /// Number of frequency bins reported (half the transform size)
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Forget smoothing history - a new track must not inherit the old one's tail
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Byte frequency data for the `fft_size` frames ending at `position` seconds
    pub fn frequency_data(&mut self, audio: &DecodedAudio, position: f64) -> Vec<u8> {
        audio.mono_window(audio.frame_at(position), &mut self.input);

        for ((slot, sample), w) in self.spectrum.iter_mut().zip(&self.input).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.spectrum);

        let norm = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        let min_db = self.min_db;
        let range = self.max_db - min_db;

        self.smoothed
            .iter_mut()
            .zip(&self.spectrum)
            .map(|(smoothed, bin)| {
                let magnitude = bin.norm() * norm;
                *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
                to_byte(*smoothed, min_db, range)
            })
            .collect()
    }
}

fn to_byte(magnitude: f32, min_db: f32, range: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = (255.0 / range) * (db - min_db);
    scaled.clamp(0.0, 255.0) as u8
}

fn blackman(size: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    let n = size as f32;
    (0..size)
        .map(|i| {
            let x = std::f32::consts::TAU * i as f32 / n;
            A0 - A1 * x.cos() + A2 * (2.0 * x).cos()
        })
        .collect()
}
