//! Scalar and array features derived from a single frequency snapshot.
//!
//! A snapshot is one analyser frame: `len` bytes, one per frequency bin,
//! each in 0..=255. Everything here is cheap enough to run several times
//! per frame.

/// Floor applied to the percentile reference so quiet passages don't blow up
/// the normalized response.
pub const MIN_PERCENTILE_REF: f32 = 0.05;

/// Normalized amplitudes below this are not worth a stroke.
pub const SKIP_EPSILON: f32 = 0.02;

pub const MIN_GAMMA: f32 = 0.3;
pub const MAX_GAMMA: f32 = 3.0;
pub const MIN_PERCENTILE: f32 = 0.5;
pub const MAX_PERCENTILE: f32 = 0.99;

const BEAT_BASELINE_ALPHA: f32 = 0.15;
const BEAT_THRESHOLD: f32 = 0.08;
const BEAT_COOLDOWN: f64 = 0.22;
const BEAT_DECAY_RATE: f32 = 6.0;
const ACTIVITY_ALPHA: f32 = 0.06;
const ACTIVITY_GAIN: f32 = 6.0;

const PEAK_SMOOTHING: f32 = 0.25;

pub fn clamp01(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Mean of `snapshot[start..end]` scaled to 0..1. Out-of-range bounds are
/// clipped and an empty range averages to zero.
pub fn range_energy(snapshot: &[u8], start: usize, end: usize) -> f32 {
    let end = end.min(snapshot.len());
    let start = start.min(end);
    let sum: u32 = snapshot[start..end].iter().map(|&v| v as u32).sum();
    sum as f32 / (end - start).max(1) as f32 / 255.0
}

/// Mean magnitude of the whole snapshot, 0..1.
pub fn mean_energy(snapshot: &[u8]) -> f32 {
    range_energy(snapshot, 0, snapshot.len())
}

/// Mean magnitude of the lowest tenth of the spectrum (at least one bin).
pub fn bass_energy(snapshot: &[u8]) -> f32 {
    let bass = (snapshot.len() / 10).max(1);
    range_energy(snapshot, 0, bass)
}

/// Normalized amplitude of bin `index`, clamped into the snapshot.
pub fn amplitude_at(snapshot: &[u8], index: usize) -> f32 {
    match snapshot.len() {
        0 => 0.0,
        len => snapshot[index.min(len - 1)] as f32 / 255.0,
    }
}

/// Low/mid/high thirds of a snapshot, each averaged to 0..1.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandEnergy {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

impl BandEnergy {
    /// Partition into three contiguous ranges of `len / 3` bins, the
    /// remainder going to the high band.
    pub fn of(snapshot: &[u8]) -> Self {
        let len = snapshot.len();
        let third = len / 3;
        Self {
            low: range_energy(snapshot, 0, third),
            mid: range_energy(snapshot, third, 2 * third),
            high: range_energy(snapshot, 2 * third, len),
        }
    }

    /// Weighted "frequency factor" shared by the band-driven color models.
    pub fn factor(&self) -> f32 {
        self.low * 0.3 + self.mid * 0.4 + self.high * 0.3
    }
}

/// Adaptive normalization denominator: the normalized magnitude at rank
/// `floor(percentile * len)` of the ascending snapshot, floored to
/// [`MIN_PERCENTILE_REF`].
///
/// Bytes only take 256 values, so this ranks through a histogram instead of
/// sorting a copy.
pub fn percentile_reference(snapshot: &[u8], percentile: f32) -> f32 {
    let len = snapshot.len();
    if len == 0 {
        return MIN_PERCENTILE_REF;
    }

    let p = if percentile.is_nan() {
        MIN_PERCENTILE
    } else {
        percentile.clamp(MIN_PERCENTILE, MAX_PERCENTILE)
    };
    let rank = ((p * len as f32).floor() as usize).min(len - 1);

    let mut histogram = [0usize; 256];
    for &v in snapshot {
        histogram[v as usize] += 1;
    }

    let mut seen = 0;
    let mut value = 255u8;
    for (level, &count) in histogram.iter().enumerate() {
        seen += count;
        if seen > rank {
            value = level as u8;
            break;
        }
    }

    (value as f32 / 255.0).max(MIN_PERCENTILE_REF)
}

/// `clamp01(raw / reference * gain) ^ gamma`, the standard path from raw
/// energy to a color or size driver. Always lands in [0, 1].
pub fn gamma_response(raw: f32, reference: f32, gain: f32, gamma: f32) -> f32 {
    let reference = reference.max(MIN_PERCENTILE_REF);
    let gamma = if gamma.is_nan() {
        1.0
    } else {
        gamma.clamp(MIN_GAMMA, MAX_GAMMA)
    };
    let normalized = clamp01(raw / reference * gain);
    clamp01(normalized.powf(gamma))
}

/// One step of an exponential moving average.
pub fn ema(prev: f32, value: f32, alpha: f32) -> f32 {
    prev + (value - prev) * alpha
}

/// Pulse values produced by [`BeatDetector::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pulse {
    /// An onset fired on this update.
    pub onset: bool,
    /// 1.0 at onset, decaying exponentially.
    pub beat: f32,
    /// Sustained above-average loudness.
    pub activity: f32,
}

impl Pulse {
    /// The effective scene-wide pulse.
    pub fn global(&self) -> f32 {
        self.beat.max(self.activity)
    }
}

/// Bass onset detector with a cooldown, plus a slower overall-activity
/// tracker.
#[derive(Clone, Debug, Default)]
pub struct BeatDetector {
    bass_baseline: f32,
    energy_baseline: f32,
    last_onset: Option<f64>,
    pulse: f32,
}

impl BeatDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one snapshot taken at `now` seconds, `dt` seconds after the
    /// previous update.
    pub fn update(&mut self, snapshot: &[u8], now: f64, dt: f32) -> Pulse {
        let bass = bass_energy(snapshot);
        let energy = mean_energy(snapshot);

        self.pulse *= (-dt.max(0.0) * BEAT_DECAY_RATE).exp();

        let cooled = self
            .last_onset
            .map_or(true, |last| now - last >= BEAT_COOLDOWN);
        let onset = bass - self.bass_baseline > BEAT_THRESHOLD && cooled;
        if onset {
            self.pulse = 1.0;
            self.last_onset = Some(now);
        }
        self.bass_baseline = ema(self.bass_baseline, bass, BEAT_BASELINE_ALPHA);

        let activity = clamp01((energy - self.energy_baseline) * ACTIVITY_GAIN);
        self.energy_baseline = ema(self.energy_baseline, energy, ACTIVITY_ALPHA);

        Pulse {
            onset,
            beat: self.pulse,
            activity,
        }
    }

    pub fn last_onset(&self) -> Option<f64> {
        self.last_onset
    }
}

/// Frame-to-frame smoothing of a decimated copy of the snapshot.
#[derive(Clone, Debug)]
pub struct PeakSmoother {
    step: usize,
    values: Vec<f32>,
}

impl PeakSmoother {
    pub fn new(step: usize) -> Self {
        Self {
            step: step.max(1),
            values: Vec::new(),
        }
    }

    /// Take every `step`-th bin, normalize, and smooth toward it. The
    /// smoothed array is re-seeded whenever its length no longer matches.
    pub fn update(&mut self, snapshot: &[u8]) -> &[f32] {
        let decimated = snapshot.iter().step_by(self.step).map(|&v| v as f32 / 255.0);
        let len = snapshot.len().div_ceil(self.step);

        if self.values.len() != len {
            self.values.clear();
            self.values.extend(decimated);
        } else {
            for (smoothed, raw) in self.values.iter_mut().zip(decimated) {
                *smoothed += (raw - *smoothed) * PEAK_SMOOTHING;
            }
        }
        &self.values
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }
}
