use std::f32::consts::TAU;

use super::{min_side, Frame, Renderer};
use crate::audio::features::mean_energy;
use crate::color::{FrameColors, Rgb};
use crate::render::canvas::Canvas;
use crate::render::geometry::Point;
use crate::render::session::SessionState;

const MAX_POINTS: usize = 96;

/// A rotating ring of points. The ring breathes with the global pulse while
/// each point follows its own smoothed bin.
pub struct PulseCircles;

impl Renderer for PulseCircles {
    fn draw(
        &self,
        canvas: &mut Canvas,
        frame: &Frame<'_>,
        colors: &FrameColors<'_>,
        session: &mut SessionState,
    ) {
        canvas.clear(Rgb::BLACK);
        let pulse = session.beat.update(frame.snapshot, frame.time, frame.dt);
        let global = pulse.global();
        let energy = mean_energy(frame.snapshot);
        session.rotation = (session.rotation + frame.dt * (0.25 + energy * 1.5 + global * 2.0)) % TAU;

        let peaks = session.peaks.update(frame.snapshot);
        if peaks.is_empty() {
            return;
        }
        let stride = peaks.len().div_ceil(MAX_POINTS).max(1);
        let count = peaks.len().div_ceil(stride);

        let (w, h) = (canvas.width() as f32, canvas.height() as f32);
        let center = canvas.center();
        let side = min_side(canvas);
        let ring = side * (0.26 + 0.08 * global);

        let ring_color = colors.palette_at(global);
        canvas.stroke_arc(center, ring, 0.0, TAU, 1.0 + 2.0 * global, ring_color, 0.12 + 0.3 * global);

        for (n, &local) in peaks.iter().step_by(stride).enumerate() {
            let angle = n as f32 / count as f32 * TAU + session.rotation;
            let pos = center + Point::polar(angle, ring + local * side * 0.1);
            let size = 1.5 + local * side * 0.025 + global * side * 0.012;
            let alpha = (0.25 + local * 0.5 + global * 0.25).min(1.0);
            canvas.fill_circle(pos, size, colors.at(pos.x, pos.y, w, h), alpha);
        }
    }
}
