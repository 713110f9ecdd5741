use std::f32::consts::{FRAC_PI_2, TAU};

use super::{bin_for, min_side, Frame, Renderer};
use crate::audio::features::{amplitude_at, SKIP_EPSILON};
use crate::color::{FrameColors, Rgb};
use crate::render::canvas::Canvas;
use crate::render::session::SessionState;

const ARC_COUNT: usize = 128;

/// Concentric arcs, one per sampled bin. Arc sweep, stroke width and alpha
/// follow the bin amplitude.
pub struct Polar;

impl Renderer for Polar {
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
        let center = canvas.center();
        let inner = min_side(canvas) * 0.06;
        let spacing = (min_side(canvas) * 0.46 - inner) / ARC_COUNT as f32;
        let t = frame.t();
        let base = colors.at(center.x, center.y, w, h);

        for i in 0..ARC_COUNT {
            let amp = amplitude_at(frame.snapshot, bin_for(i, ARC_COUNT, len));
            if amp < SKIP_EPSILON {
                continue;
            }
            let wobble = (t * 2.0 + i as f32 * 0.15).sin() * 1.5;
            let radius = inner + spacing * i as f32 + wobble;
            let start = -FRAC_PI_2 + t * 0.2 + i as f32 * 0.05;
            canvas.stroke_arc(
                center,
                radius,
                start,
                amp * TAU,
                1.0 + amp * 3.0,
                base.scale(0.6 + 0.4 * amp),
                0.15 + amp * 0.85,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{ColorModel, ModelKind, ModelOptions};

    #[test]
    fn near_silent_bins_are_skipped() {
        // 4/255 is below the stroke epsilon.
        let snapshot = vec![4u8; 128];
        let model = ColorModel::new(ModelKind::Polar, &ModelOptions::default());
        let mut canvas = Canvas::new(64, 64);
        let mut session = SessionState::new(0);
        let frame = Frame {
            snapshot: &snapshot,
            time: 1.0,
            dt: 0.03,
        };
        Polar.draw(&mut canvas, &frame, &model.frame(&snapshot), &mut session);
        assert!(canvas.pixels().chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
    }
}
