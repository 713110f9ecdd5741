use super::{Frame, Renderer};
use crate::audio::features::range_energy;
use crate::color::{FrameColors, Rgb};
use crate::render::canvas::{Canvas, Gradient, Paint, Stop};
use crate::render::geometry::Point;
use crate::render::session::SessionState;

const MIN_BARS: usize = 64;
const MAX_BARS: usize = 128;

fn bar_count(len: usize) -> usize {
    (len / 4).clamp(MIN_BARS, MAX_BARS)
}

/// Vertical bars, one per group of bins, each a gradient from its full
/// color at the top to half brightness at the floor.
pub struct EnergyBars;

impl Renderer for EnergyBars {
    fn draw(
        &self,
        canvas: &mut Canvas,
        frame: &Frame<'_>,
        colors: &FrameColors<'_>,
        _session: &mut SessionState,
    ) {
        canvas.clear(Rgb::BLACK);
        let len = frame.snapshot.len();
        if len == 0 {
            return;
        }

        let (w, h) = (canvas.width() as f32, canvas.height() as f32);
        let count = bar_count(len);
        let slot = w / count as f32;
        let gap = if slot > 3.0 { 1.0 } else { 0.0 };

        for i in 0..count {
            let start = i * len / count;
            let end = ((i + 1) * len / count).max(start + 1);
            let amp = range_energy(frame.snapshot, start, end);
            let bar_h = amp * h * 0.9;
            if bar_h < 0.5 {
                continue;
            }
            let x = i as f32 * slot;
            let top = h - bar_h;
            let full = colors.at(x + slot / 2.0, top, w, h);
            let gradient = Gradient::new(
                Point::new(0.0, top),
                Point::new(0.0, h),
                vec![Stop::new(0.0, full, 1.0), Stop::new(1.0, full.scale(0.5), 1.0)],
            );
            canvas.fill_rect(x, top, slot - gap, bar_h, &Paint::Linear(gradient));
        }
    }
}
