mod dominant;
mod energy_bars;
mod polar;
mod pulse_circles;
mod radial_petals;
mod spectrum_waves;
mod warp_grid;

pub use dominant::DominantFrequency;
pub use energy_bars::EnergyBars;
pub use polar::Polar;
pub use pulse_circles::PulseCircles;
pub use radial_petals::RadialPetals;
pub use spectrum_waves::SpectrumWaves;
pub use warp_grid::WarpGrid;

use super::canvas::Canvas;
use super::session::SessionState;
use super::style::Style;
use crate::color::FrameColors;

/// Inputs for one drawn frame.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pub snapshot: &'a [u8],
    /// Seconds since the loop started.
    pub time: f64,
    /// Seconds since the previous drawn frame, clamped.
    pub dt: f32,
}

impl Frame<'_> {
    pub fn t(&self) -> f32 {
        self.time as f32
    }
}

pub trait Renderer {
    /// Redraw the whole canvas for one frame.
    fn draw(
        &self,
        canvas: &mut Canvas,
        frame: &Frame<'_>,
        colors: &FrameColors<'_>,
        session: &mut SessionState,
    );
}

/// Dispatch one frame to the renderer for `style`. Unknown styles warn once
/// per selection and leave the canvas untouched.
pub fn draw_style(
    style: &Style,
    canvas: &mut Canvas,
    frame: &Frame<'_>,
    colors: &FrameColors<'_>,
    session: &mut SessionState,
) {
    let renderer: &dyn Renderer = match style {
        Style::Polar => &Polar,
        Style::DominantFrequency => &DominantFrequency,
        Style::EnergyBars => &EnergyBars,
        Style::SpectrumWaves => &SpectrumWaves,
        Style::PulseCircles => &PulseCircles,
        Style::RadialPetals => &RadialPetals,
        Style::WarpGrid => &WarpGrid,
        Style::Unknown(tag) => {
            if session.take_unknown_warning() {
                log::warn!("Unknown visualization style '{}', nothing will be drawn", tag);
            }
            return;
        }
    };
    renderer.draw(canvas, frame, colors, session);
}

/// Shortest canvas side as f32, never below 1.
pub(crate) fn min_side(canvas: &Canvas) -> f32 {
    (canvas.width().min(canvas.height()) as f32).max(1.0)
}

/// Index of the bin that `i` of `count` evenly spaced samples lands on.
pub(crate) fn bin_for(i: usize, count: usize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (i * len / count.max(1)).min(len - 1)
}
