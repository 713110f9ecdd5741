use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::decode::AudioData;
use crate::config::AudioConfig;

/// Anything that can hand out one frequency snapshot per frame.
///
/// Implementations never fail: before any audio is attached they report
/// silence, which renderers draw as the idle frame.
pub trait SpectralSource {
    fn bin_count(&self) -> usize;

    /// Fill `out` with the magnitudes (0-255) for playback time `time`.
    /// `out` is resized to [`bin_count`](Self::bin_count).
    fn snapshot(&mut self, time: f64, out: &mut Vec<u8>);
}

/// Placeholder source: every bin is zero.
pub struct SilentSource {
    bins: usize,
}

impl SilentSource {
    pub fn new(bins: usize) -> Self {
        Self { bins }
    }
}

impl SpectralSource for SilentSource {
    fn bin_count(&self) -> usize {
        self.bins
    }

    fn snapshot(&mut self, _time: f64, out: &mut Vec<u8>) {
        out.clear();
        out.resize(self.bins, 0);
    }
}

/// Byte-frequency analyser over decoded mono samples, modelled on the
/// browser analyser node: Blackman window, magnitude smoothing across
/// calls, dB scaling into the byte range.
pub struct Analyser {
    samples: Vec<f32>,
    sample_rate: u32,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
}

impl Analyser {
    pub fn new(audio: AudioData, config: &AudioConfig) -> Self {
        let bins = config.bins.max(1);
        let fft_size = bins * 2;

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);

        log::info!(
            "Analyser: fft_size={}, bins={}, smoothing={:.2}, range={}..{} dB",
            fft_size,
            bins,
            config.smoothing_time_constant,
            config.min_decibels,
            config.max_decibels
        );

        Self {
            samples: audio.samples,
            sample_rate: audio.sample_rate,
            fft,
            window: blackman_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; bins],
            smoothing: config.smoothing_time_constant.clamp(0.0, 1.0),
            min_db: config.min_decibels,
            max_db: config.max_decibels.max(config.min_decibels + 1.0),
        }
    }

    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate.max(1) as f64
    }

    fn fft_size(&self) -> usize {
        self.window.len()
    }
}

impl SpectralSource for Analyser {
    fn bin_count(&self) -> usize {
        self.smoothed.len()
    }

    fn snapshot(&mut self, time: f64, out: &mut Vec<u8>) {
        let fft_size = self.fft_size();
        let end = (time.max(0.0) * self.sample_rate as f64) as usize;

        // The window ends at `end`; anything before the first sample is silence.
        for i in 0..fft_size {
            let sample = (end + i)
                .checked_sub(fft_size)
                .and_then(|idx| self.samples.get(idx))
                .copied()
                .unwrap_or(0.0);
            self.buffer[i] = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let scale = 255.0 / (self.max_db - self.min_db);
        out.clear();
        out.reserve(self.smoothed.len());

        for (k, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.buffer[k].norm() / fft_size as f32;
            *smoothed = self.smoothing * *smoothed + (1.0 - self.smoothing) * magnitude;

            let db = if *smoothed > 0.0 {
                20.0 * smoothed.log10()
            } else {
                f32::NEG_INFINITY
            };
            let byte = (scale * (db - self.min_db)).floor();
            out.push(if byte.is_nan() { 0 } else { byte.clamp(0.0, 255.0) as u8 });
        }
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    const A0: f32 = 0.42;
    const A1: f32 = 0.5;
    const A2: f32 = 0.08;
    let n = size as f32;
    (0..size)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / n;
            A0 - A1 * x.cos() + A2 * (2.0 * x).cos()
        })
        .collect()
}
