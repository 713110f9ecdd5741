use std::f32::consts::TAU;

use super::{bin_for, Frame, Renderer};
use crate::audio::features::amplitude_at;
use crate::color::{FrameColors, Rgb};
use crate::render::canvas::{Canvas, Gradient, Paint, Stop};
use crate::render::geometry::Point;
use crate::render::session::SessionState;

const LAYERS: usize = 4;
const SEGMENTS: usize = 96;
const COLOR_STOPS: usize = 8;

/// Line width and alpha per pass. Wide and faint first, thin and bright
/// last, which reads as depth.
const PASSES: [(f32, f32); 3] = [(10.0, 0.12), (5.0, 0.3), (3.0, 0.85)];

/// Stacked horizontal waves displaced by the spectrum.
pub struct SpectrumWaves;

impl Renderer for SpectrumWaves {
    fn draw(
        &self,
        canvas: &mut Canvas,
        frame: &Frame<'_>,
        colors: &FrameColors<'_>,
        _session: &mut SessionState,
    ) {
        canvas.clear(Rgb::BLACK);
        let (w, h) = (canvas.width() as f32, canvas.height() as f32);
        if w < 1.0 || h < 1.0 {
            return;
        }
        let len = frame.snapshot.len();
        let t = frame.t() * colors.time_scale();
        let mut points = Vec::with_capacity(SEGMENTS + 1);

        for layer in 0..LAYERS {
            let base_y = h * (layer + 1) as f32 / (LAYERS + 1) as f32;
            let phase = layer as f32 * 1.3;
            let direction = if layer % 2 == 0 { -1.0 } else { 1.0 };

            let samples: Vec<(f32, Rgb)> = (0..COLOR_STOPS)
                .map(|k| {
                    let offset = k as f32 / (COLOR_STOPS - 1) as f32;
                    (offset, colors.at(offset * w, base_y, w, h))
                })
                .collect();

            for (pass, &(width, alpha)) in PASSES.iter().enumerate() {
                points.clear();
                for s in 0..=SEGMENTS {
                    let u = s as f32 / SEGMENTS as f32;
                    let amp = amplitude_at(frame.snapshot, bin_for(s, SEGMENTS + 1, len));
                    let wave = (u * TAU * 2.0 + t * 1.4 + phase + pass as f32 * 0.4).sin() * 0.6
                        + (u * TAU * 3.0 - t * 0.9 + phase).cos() * 0.4;
                    let y = base_y + wave * h * 0.025 + direction * amp * h * 0.12 * (1.0 + wave * 0.3);
                    points.push(Point::new(u * w, y));
                }
                let stops = samples
                    .iter()
                    .map(|&(offset, color)| Stop::new(offset, color, alpha))
                    .collect();
                let paint = Paint::Linear(Gradient::new(
                    Point::new(0.0, base_y),
                    Point::new(w, base_y),
                    stops,
                ));
                canvas.stroke_polyline(&points, width, &paint);
            }
        }
    }
}
