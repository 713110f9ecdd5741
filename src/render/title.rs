//! Beat-reactive title animation.
//!
//! Consumes the same snapshots as the renderers and turns them into a scale,
//! a small tilt, a two-stop gradient and a glow strength for the title text.

use crate::audio::features::{bass_energy, clamp01, ema, mean_energy, range_energy};
use crate::color::Rgb;

const FRAME_INTERVAL: f64 = 0.033;
const PHASE_STEP: f32 = 0.033;

const FAST_SMOOTHING: f32 = 0.45;
const IMPULSE_ATTACK: f32 = 0.9;
const IMPULSE_DECAY: f32 = 0.82;
const ENERGY_SMOOTHING: f32 = 0.15;
const COLOR_SMOOTHING: f32 = 0.3;

/// Seconds of playback after which an auto-hiding player header fades out.
pub const AUTOHIDE_AFTER: f64 = 5.0;

const MIN_BASS: f32 = 0.12;
const MIN_GLOW: f32 = 0.25;
const MAX_SCALE: f32 = 1.45;

/// How the title should look this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TitleStyle {
    pub scale: f32,
    pub tilt_deg: f32,
    pub gradient_start: Rgb,
    pub gradient_end: Rgb,
    /// 0.25..=1, drives glow radius and opacity.
    pub glow: f32,
}

impl TitleStyle {
    /// Resting look while nothing plays.
    pub fn idle() -> Self {
        Self {
            scale: 1.0,
            tilt_deg: 0.0,
            gradient_start: Rgb::WHITE,
            gradient_end: Rgb::WHITE,
            glow: 0.0,
        }
    }
}

/// Whether the title is shown `now` seconds into playback. Nothing moves the
/// pointer during a render, so an auto-hiding header stays hidden once the
/// first inactivity check has passed.
pub fn header_visible(auto_hide: bool, now: f64) -> bool {
    !auto_hide || now < AUTOHIDE_AFTER
}

#[derive(Clone, Debug, Default)]
pub struct TitlePulse {
    last_update: Option<f64>,
    phase: f32,
    bass_fast: f32,
    impulse: f32,
    bass: f32,
    total: f32,
    mid: Option<f32>,
    high: Option<f32>,
    current: Option<TitleStyle>,
}

impl TitlePulse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The last computed style, or [`TitleStyle::idle`] before the first
    /// update.
    pub fn current(&self) -> TitleStyle {
        self.current.unwrap_or_else(TitleStyle::idle)
    }

    /// Advance with the snapshot taken at `now` seconds. Calls closer than
    /// the 30 FPS interval keep the previous style.
    pub fn update(&mut self, snapshot: &[u8], now: f64) -> TitleStyle {
        if let Some(last) = self.last_update {
            if now - last < FRAME_INTERVAL {
                return self.current();
            }
        }
        self.last_update = Some(now);
        self.phase += PHASE_STEP;

        let len = snapshot.len();
        if len == 0 {
            return self.current();
        }

        let bass = bass_energy(snapshot);
        let total = mean_energy(snapshot);
        let mid = range_energy(snapshot, len * 15 / 100, len * 60 / 100);
        let high = range_energy(snapshot, len / 2, len);
        let peak = snapshot.iter().copied().max().unwrap_or(0) as f32 / 255.0;

        let prev_fast = self.bass_fast;
        self.bass_fast = ema(prev_fast, bass, FAST_SMOOTHING);
        let onset = (bass - prev_fast).max(0.0);
        self.impulse = (self.impulse * IMPULSE_DECAY).max(onset * IMPULSE_ATTACK);
        let beat = (self.impulse * 1.5).min(1.0);

        self.bass = ema(self.bass, bass, ENERGY_SMOOTHING);
        self.total = ema(self.total, total, ENERGY_SMOOTHING);
        let smoothed_mid = ema(self.mid.unwrap_or(mid), mid, COLOR_SMOOTHING);
        let smoothed_high = ema(self.high.unwrap_or(high), high, COLOR_SMOOTHING);
        self.mid = Some(smoothed_mid);
        self.high = Some(smoothed_high);

        let final_bass = self.bass.max(MIN_BASS);
        let glow = self.total.max(MIN_GLOW);

        let compressed = final_bass / (1.0 + 1.6 * final_bass);
        let scale = (1.0 + compressed.powf(0.85) * 0.25 + beat * 0.3).min(MAX_SCALE);

        let bass_i = bass * 0.7 + self.bass * 0.3;
        let mid_i = mid * 0.8 + smoothed_mid * 0.2;
        let high_i = high * 0.8 + smoothed_high * 0.2;
        let boost = 1.0 + peak * 0.5;
        let channel = |v: f32| (v * boost).min(255.0).floor() as u8;

        let gradient_start = Rgb::new(
            channel(100.0 + bass_i * 120.0 + mid_i * 35.0),
            channel(mid_i * 180.0 + high_i * 40.0),
            channel(80.0 + high_i * 140.0 + bass_i * 35.0),
        );
        let gradient_end = Rgb::new(
            channel(150.0 + self.total * 80.0 + mid_i * 25.0),
            channel(50.0 + self.total * 150.0 + high_i * 55.0),
            channel(high_i * 200.0 + mid_i * 55.0),
        );

        let sway_speed = 1.2 + mid * 1.5;
        let sway_amplitude = 0.2 + beat * 0.6;

        let style = TitleStyle {
            scale,
            tilt_deg: (self.phase * sway_speed).sin() * sway_amplitude,
            gradient_start,
            gradient_end,
            glow: clamp01(glow),
        };
        self.current = Some(style);
        style
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn silence_rests_near_unit_scale() {
        let mut pulse = TitlePulse::new();
        let style = pulse.update(&[0u8; 64], 0.0);
        // Floor bass 0.12 compresses to ~0.1007, ^0.85 * 0.25 ~ 0.0355.
        assert_abs_diff_eq!(style.scale, 1.0355, epsilon = 1e-3);
        assert_eq!(style.glow, MIN_GLOW);
        assert_eq!(style.gradient_start, Rgb::new(100, 0, 80));
        assert_eq!(style.gradient_end, Rgb::new(150, 50, 0));
    }

    #[test]
    fn updates_are_capped_at_thirty_fps() {
        let mut pulse = TitlePulse::new();
        let first = pulse.update(&[0u8; 64], 1.0);
        let skipped = pulse.update(&[255u8; 64], 1.01);
        assert_eq!(first, skipped);
        let next = pulse.update(&[255u8; 64], 1.05);
        assert!(next.scale > first.scale);
    }

    #[test]
    fn scale_never_exceeds_cap() {
        let mut pulse = TitlePulse::new();
        let mut now = 0.0;
        for n in 0..200 {
            let level: u8 = if n % 3 == 0 { 255 } else { 0 };
            let style = pulse.update(&[level; 128], now);
            assert!(style.scale <= MAX_SCALE);
            assert!(style.tilt_deg.abs() <= 0.8 + 1e-6);
            now += 0.04;
        }
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut pulse = TitlePulse::new();
        pulse.update(&[200u8; 32], 0.0);
        pulse.reset();
        assert_eq!(pulse.current(), TitleStyle::idle());
    }

    #[test]
    fn autohide_hides_header_after_first_check() {
        assert!(header_visible(true, 0.0));
        assert!(header_visible(true, 4.99));
        assert!(!header_visible(true, AUTOHIDE_AFTER));
        assert!(!header_visible(true, 60.0));
        assert!(header_visible(false, 60.0));
    }
}
