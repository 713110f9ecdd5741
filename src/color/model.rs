use serde::{Deserialize, Serialize};

use super::{Palette, Rgb};
use crate::audio::features::{
    amplitude_at, gamma_response, mean_energy, percentile_reference, BandEnergy,
};

/// Options a color model is built from. `None` means "use the model's own
/// default".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    pub colors: Vec<String>,
    pub gamma: Option<f32>,
    pub percentile: Option<f32>,
    pub speed: Option<f32>,
}

/// How a model derives its normalized 0..1 factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    /// Weighted band energy (polar, dominant frequency).
    Polar,
    /// Mean snapshot energy.
    EnergyBars,
    /// Amplitude of the bin under the x position.
    SpectrumWaves,
    /// Amplitude of the bin under the angle from center, no gamma.
    PulseCircles,
    /// Amplitude of the bin under the distance from center, high gain.
    Adaptive,
    /// Band energy with the petal constants.
    RadialPetals,
}

struct KindDefaults {
    gain: f32,
    gamma: f32,
    percentile: f32,
}

impl ModelKind {
    fn defaults(self) -> KindDefaults {
        let (gain, gamma) = match self {
            ModelKind::Polar => (1.7, 1.6),
            ModelKind::EnergyBars => (1.6, 1.7),
            ModelKind::SpectrumWaves => (1.6, 1.7),
            ModelKind::PulseCircles => (1.0, 1.0),
            ModelKind::Adaptive => (2.0, 1.7),
            ModelKind::RadialPetals => (1.6, 1.8),
        };
        KindDefaults {
            gain,
            gamma,
            percentile: 0.75,
        }
    }
}

/// Animation speed hint a model assumes when none is given.
pub const DEFAULT_SPEED: f32 = 0.2;

/// A palette plus the rule that picks a point on it for a given pixel and
/// snapshot.
#[derive(Clone, Debug)]
pub struct ColorModel {
    kind: ModelKind,
    palette: Palette,
    gain: f32,
    gamma: f32,
    percentile: f32,
    speed: f32,
}

impl ColorModel {
    pub fn new(kind: ModelKind, options: &ModelOptions) -> Self {
        let defaults = kind.defaults();
        // Petals keep their own response curve whatever the listener picked.
        let (gamma, percentile) = match kind {
            ModelKind::RadialPetals => (defaults.gamma, defaults.percentile),
            _ => (
                options.gamma.unwrap_or(defaults.gamma),
                options.percentile.unwrap_or(defaults.percentile),
            ),
        };
        Self {
            kind,
            palette: Palette::from_css(&options.colors),
            gain: defaults.gain,
            gamma,
            percentile,
            speed: options.speed.filter(|s| s.is_finite() && *s > 0.0).unwrap_or(DEFAULT_SPEED),
        }
    }

    /// Precompute the per-frame statistics so per-pixel lookups stay cheap.
    pub fn frame<'a>(&'a self, snapshot: &'a [u8]) -> FrameColors<'a> {
        let needs_reference = self.kind != ModelKind::PulseCircles;
        FrameColors {
            model: self,
            snapshot,
            reference: if needs_reference {
                percentile_reference(snapshot, self.percentile)
            } else {
                1.0
            },
            band_factor: BandEnergy::of(snapshot).factor(),
            mean: mean_energy(snapshot),
        }
    }

    /// `(x, y, width, height, snapshot) -> RGB`.
    pub fn sample(&self, x: f32, y: f32, width: f32, height: f32, snapshot: &[u8]) -> Rgb {
        self.frame(snapshot).at(x, y, width, height)
    }
}

/// A [`ColorModel`] bound to one snapshot.
pub struct FrameColors<'a> {
    model: &'a ColorModel,
    snapshot: &'a [u8],
    reference: f32,
    band_factor: f32,
    mean: f32,
}

impl<'a> FrameColors<'a> {
    pub fn reference(&self) -> f32 {
        self.reference
    }

    /// Animation time multiplier: the speed hint relative to the default.
    pub fn time_scale(&self) -> f32 {
        self.model.speed / DEFAULT_SPEED
    }

    fn respond(&self, raw: f32) -> f32 {
        gamma_response(raw, self.reference, self.model.gain, self.model.gamma)
    }

    fn bin_under(&self, t: f32) -> usize {
        let len = self.snapshot.len();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        ((t * len as f32).floor() as usize).min(len.saturating_sub(1))
    }

    /// The normalized factor for a position on a `width` x `height` surface.
    pub fn factor(&self, x: f32, y: f32, width: f32, height: f32) -> f32 {
        let width = width.max(1.0);
        let height = height.max(1.0);
        match self.model.kind {
            ModelKind::Polar | ModelKind::RadialPetals => self.respond(self.band_factor),
            ModelKind::EnergyBars => self.respond(self.mean),
            ModelKind::SpectrumWaves => {
                let idx = self.bin_under(x / width);
                self.respond(amplitude_at(self.snapshot, idx))
            }
            ModelKind::PulseCircles => {
                let angle = (y - height / 2.0).atan2(x - width / 2.0);
                let t = (angle + std::f32::consts::PI) / std::f32::consts::TAU;
                amplitude_at(self.snapshot, self.bin_under(t))
            }
            ModelKind::Adaptive => {
                let dx = x - width / 2.0;
                let dy = y - height / 2.0;
                let max = (width * width + height * height).sqrt() / 2.0;
                let idx = self.bin_under((dx * dx + dy * dy).sqrt() / max);
                self.respond(amplitude_at(self.snapshot, idx))
            }
        }
    }

    pub fn at(&self, x: f32, y: f32, width: f32, height: f32) -> Rgb {
        self.model.palette.at(self.factor(x, y, width, height))
    }

    /// Color for a palette position chosen by the caller, bypassing the
    /// model's spatial rule.
    pub fn palette_at(&self, factor: f32) -> Rgb {
        self.model.palette.at(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(colors: &[&str], gamma: f32, percentile: f32) -> ModelOptions {
        ModelOptions {
            colors: colors.iter().map(|c| c.to_string()).collect(),
            gamma: Some(gamma),
            percentile: Some(percentile),
            speed: None,
        }
    }

    #[test]
    fn uniform_snapshot_saturates_polar_model() {
        // factor == percentile reference, so the ratio is 1 and the gain
        // pushes the response to the top of the palette.
        let snapshot = vec![64u8; 128];
        let model = ColorModel::new(ModelKind::Polar, &options(&["#000000", "#FFFFFF"], 1.0, 0.75));
        let frame = model.frame(&snapshot);
        assert!((frame.reference() - 64.0 / 255.0).abs() < 1e-6);
        assert_eq!(frame.factor(0.0, 0.0, 100.0, 100.0), 1.0);
        assert_eq!(model.sample(10.0, 10.0, 100.0, 100.0, &snapshot), Rgb::WHITE);
    }

    #[test]
    fn quiet_snapshot_is_first_color() {
        let snapshot = vec![0u8; 128];
        for kind in [
            ModelKind::Polar,
            ModelKind::EnergyBars,
            ModelKind::SpectrumWaves,
            ModelKind::PulseCircles,
            ModelKind::Adaptive,
            ModelKind::RadialPetals,
        ] {
            let model = ColorModel::new(kind, &options(&["#102030", "#FFFFFF"], 1.6, 0.75));
            assert_eq!(model.sample(5.0, 5.0, 10.0, 10.0, &snapshot), Rgb::new(0x10, 0x20, 0x30));
        }
    }

    #[test]
    fn spectrum_waves_follow_x() {
        let mut snapshot = vec![0u8; 100];
        snapshot[99] = 255;
        let model = ColorModel::new(ModelKind::SpectrumWaves, &options(&["#000", "#fff"], 1.0, 0.5));
        assert_eq!(model.sample(0.0, 0.0, 100.0, 10.0, &snapshot), Rgb::BLACK);
        assert_eq!(model.sample(100.0, 0.0, 100.0, 10.0, &snapshot), Rgb::WHITE);
    }

    #[test]
    fn pulse_circles_follow_angle_without_gamma() {
        // Angle -> bin: directly left of center is angle pi -> t = 1 -> last bin.
        let mut snapshot = vec![0u8; 8];
        snapshot[7] = 51; // 0.2
        let model = ColorModel::new(ModelKind::PulseCircles, &options(&["#000", "#fff"], 3.0, 0.9));
        let frame = model.frame(&snapshot);
        let f = frame.factor(0.0, 50.0, 100.0, 100.0);
        assert!((f - 0.2).abs() < 1e-6);
    }

    #[test]
    fn radial_petals_ignore_response_overrides() {
        let mut snapshot = vec![0u8; 90];
        for (i, v) in snapshot[..30].iter_mut().enumerate() {
            *v = 20 + 2 * i as u8;
        }
        let tuned = ColorModel::new(ModelKind::RadialPetals, &options(&["#000", "#fff"], 0.3, 0.99));
        let stock = ColorModel::new(ModelKind::RadialPetals, &ModelOptions {
            colors: vec!["#000".into(), "#fff".into()],
            ..ModelOptions::default()
        });
        let a = tuned.frame(&snapshot);
        let b = stock.frame(&snapshot);
        assert_eq!(a.reference(), b.reference());
        assert_eq!(a.factor(1.0, 1.0, 10.0, 10.0), b.factor(1.0, 1.0, 10.0, 10.0));

        // Other models still honour them.
        let polar_low = ColorModel::new(ModelKind::Polar, &options(&["#000", "#fff"], 0.3, 0.75));
        let polar_high = ColorModel::new(ModelKind::Polar, &options(&["#000", "#fff"], 3.0, 0.75));
        assert_ne!(
            polar_low.frame(&snapshot).factor(1.0, 1.0, 10.0, 10.0),
            polar_high.frame(&snapshot).factor(1.0, 1.0, 10.0, 10.0)
        );
    }

    #[test]
    fn speed_hint_scales_time() {
        let snapshot = [0u8; 4];
        let stock = ColorModel::new(ModelKind::SpectrumWaves, &ModelOptions::default());
        assert_eq!(stock.frame(&snapshot).time_scale(), 1.0);
        let fast = ColorModel::new(ModelKind::SpectrumWaves, &ModelOptions { speed: Some(0.8), ..ModelOptions::default() });
        assert!((fast.frame(&snapshot).time_scale() - 4.0).abs() < 1e-6);
        let bogus = ColorModel::new(ModelKind::SpectrumWaves, &ModelOptions { speed: Some(-1.0), ..ModelOptions::default() });
        assert_eq!(bogus.frame(&snapshot).time_scale(), 1.0);
    }

    #[test]
    fn empty_snapshot_is_safe() {
        for kind in [ModelKind::SpectrumWaves, ModelKind::PulseCircles, ModelKind::Adaptive] {
            let model = ColorModel::new(kind, &ModelOptions::default());
            let _ = model.sample(3.0, 4.0, 0.0, 0.0, &[]);
        }
    }
}
