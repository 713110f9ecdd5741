use std::fmt;

use crate::color::ModelKind;

/// Visualization styles. Tags that don't name a known style are kept as
/// [`Style::Unknown`] so the loop can report them instead of guessing.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Style {
    Polar,
    DominantFrequency,
    EnergyBars,
    SpectrumWaves,
    PulseCircles,
    RadialPetals,
    WarpGrid,
    Unknown(String),
}

impl Style {
    pub fn all() -> [Style; 7] {
        [
            Style::Polar,
            Style::DominantFrequency,
            Style::EnergyBars,
            Style::SpectrumWaves,
            Style::PulseCircles,
            Style::RadialPetals,
            Style::WarpGrid,
        ]
    }

    pub fn parse(tag: &str) -> Style {
        let tag = tag.trim();
        Style::all()
            .into_iter()
            .find(|s| s.tag().eq_ignore_ascii_case(tag))
            .unwrap_or_else(|| Style::Unknown(tag.to_string()))
    }

    pub fn tag(&self) -> &str {
        match self {
            Style::Polar => "polar",
            Style::DominantFrequency => "dominantFrequency",
            Style::EnergyBars => "energyBars",
            Style::SpectrumWaves => "spectrumWaves",
            Style::PulseCircles => "pulseCircles",
            Style::RadialPetals => "radialPetals",
            Style::WarpGrid => "warpGrid",
            Style::Unknown(tag) => tag,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Style::Polar => "Polar",
            Style::DominantFrequency => "Dominant frequency",
            Style::EnergyBars => "Energy bars",
            Style::SpectrumWaves => "Spectrum waves",
            Style::PulseCircles => "Pulse circles",
            Style::RadialPetals => "Radial petals",
            Style::WarpGrid => "Warp grid",
            Style::Unknown(tag) => tag,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Style::Unknown(_))
    }

    /// Frame-rate cap. Heavier styles get less.
    pub fn target_fps(&self) -> u32 {
        match self {
            Style::RadialPetals => 24,
            Style::WarpGrid => 20,
            _ => 30,
        }
    }

    pub fn color_kind(&self) -> ModelKind {
        match self {
            Style::Polar | Style::DominantFrequency | Style::Unknown(_) => ModelKind::Polar,
            Style::EnergyBars => ModelKind::EnergyBars,
            Style::SpectrumWaves => ModelKind::SpectrumWaves,
            Style::PulseCircles => ModelKind::PulseCircles,
            Style::RadialPetals => ModelKind::RadialPetals,
            Style::WarpGrid => ModelKind::Adaptive,
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
