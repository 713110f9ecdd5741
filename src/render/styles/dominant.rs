use std::f32::consts::{FRAC_PI_2, TAU};

use super::{min_side, Frame, Renderer};
use crate::audio::features::{amplitude_at, SKIP_EPSILON};
use crate::color::{FrameColors, Rgb};
use crate::render::canvas::{Canvas, Paint};
use crate::render::geometry::Point;
use crate::render::session::SessionState;

const MAX_SPOKES: usize = 128;
const FIELD_INTENSITY: f32 = 0.18;

/// The loudest bin as a glowing disc, every audible bin as a spoke, over a
/// faint color field.
pub struct DominantFrequency;

fn dominant_bin(snapshot: &[u8]) -> Option<(usize, f32)> {
    snapshot
        .iter()
        .enumerate()
        .max_by_key(|&(i, &v)| (v, std::cmp::Reverse(i)))
        .map(|(i, &v)| (i, v as f32 / 255.0))
}

impl Renderer for DominantFrequency {
    fn draw(
        &self,
        canvas: &mut Canvas,
        frame: &Frame<'_>,
        colors: &FrameColors<'_>,
        _session: &mut SessionState,
    ) {
        canvas.clear(Rgb::BLACK);
        let Some((peak_bin, peak)) = dominant_bin(frame.snapshot) else {
            return;
        };
        let len = frame.snapshot.len();
        let (w, h) = (canvas.width() as f32, canvas.height() as f32);
        let center = canvas.center();
        let side = min_side(canvas);
        let base = colors.at(center.x, center.y, w, h);

        let max_dist = (w * w + h * h).sqrt() / 2.0;
        let dominant_pos = peak_bin as f32 / len as f32;
        let level = FIELD_INTENSITY * peak;
        if level > 0.0 {
            canvas.fill_field(|x, y| {
                let d = (Point::new(x, y) - center).length() / max_dist.max(1.0);
                let color = colors.palette_at((dominant_pos + d * 0.5).fract());
                (color, level * (1.0 - d).max(0.0))
            });
        }

        let disc = side * (0.06 + 0.14 * peak);
        let step = len.div_ceil(MAX_SPOKES).max(1);
        for i in (0..len).step_by(step) {
            let amp = amplitude_at(frame.snapshot, i);
            if amp < SKIP_EPSILON {
                continue;
            }
            let angle = i as f32 / len as f32 * TAU - FRAC_PI_2;
            let from = center + Point::polar(angle, disc);
            let to = center + Point::polar(angle, disc + amp * side * 0.38);
            let color = colors.palette_at(i as f32 / len as f32).lerp(base, 0.5);
            canvas.stroke_line(from, to, 1.5, &Paint::Solid(color, 0.2 + amp * 0.6));
        }

        if peak >= SKIP_EPSILON {
            canvas.fill_radial(center, disc * 2.4, base, 0.5 * peak);
            canvas.fill_circle(center, disc, base, 0.6 + 0.4 * peak);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominant_picks_loudest_first_bin() {
        assert_eq!(dominant_bin(&[3, 9, 1, 9]), Some((1, 9.0 / 255.0)));
        assert_eq!(dominant_bin(&[]), None);
    }
}
