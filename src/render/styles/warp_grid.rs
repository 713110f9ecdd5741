use super::{min_side, Frame, Renderer};
use crate::audio::features::BandEnergy;
use crate::color::{FrameColors, Rgb};
use crate::render::canvas::{Canvas, Paint, Stop};
use crate::render::geometry::{rounded_square, Point};
use crate::render::session::SessionState;

const LAYERS: usize = 9;
const GRID_LINES: usize = 3;

/// Scale of a layer at normalized depth `z` (0 near, 1 far). Inverse in
/// depth so layers rush outward as they approach.
fn layer_scale(z: f32) -> f32 {
    0.15 / (z + 0.05)
}

/// Flight through nested rounded squares. Low band boosts scale, mid band
/// bends the sides, high band adds a deterministic jitter.
pub struct WarpGrid;

impl Renderer for WarpGrid {
    fn draw(
        &self,
        canvas: &mut Canvas,
        frame: &Frame<'_>,
        colors: &FrameColors<'_>,
        session: &mut SessionState,
    ) {
        canvas.clear(Rgb::BLACK);
        let (w, h) = (canvas.width() as f32, canvas.height() as f32);
        let center = canvas.center();
        let side = min_side(canvas);
        let t = frame.t();
        let bands = BandEnergy::of(frame.snapshot);

        session.warp_depth = (session.warp_depth + frame.dt * (0.2 + bands.low * 0.8)).fract();

        // Far to near so closer layers paint over.
        for k in (0..LAYERS).rev() {
            let z = 1.0 - ((k as f32 + session.warp_depth) / LAYERS as f32);
            let half = side * 0.5 * layer_scale(z) * (1.0 + bands.low * 0.25);
            if half > side * 2.5 {
                continue;
            }
            let seed = k as f32;
            let bend = (t * 2.0 + seed).sin() * bands.mid * half * 0.08;
            let jitter = Point::new(
                (seed * 12.9898 + t * 7.0).sin(),
                (seed * 78.233 + t * 5.0).cos(),
            ) * (bands.high * half * 0.04);
            let origin = center + Point::new(bend, 0.0) + jitter;
            let angle = t * 0.15 + z * 0.6;
            let nearness = 1.0 - z;
            let alpha = 0.1 + nearness * 0.8;

            let edge = origin + Point::polar(angle, half);
            let outline_color = colors.at(edge.x, edge.y, w, h);
            let outline = rounded_square(origin, half, half * 0.18, angle);
            canvas.stroke_polyline(&outline, 1.0 + nearness * 2.5, &Paint::Solid(outline_color, alpha));

            let step = 2.0 * half / (GRID_LINES + 1) as f32;
            for j in 1..=GRID_LINES {
                let offset = -half + step * j as f32;
                for (a, b) in [
                    (Point::new(offset, -half), Point::new(offset, half)),
                    (Point::new(-half, offset), Point::new(half, offset)),
                ] {
                    let a = origin + a.rotate(angle);
                    let b = origin + b.rotate(angle);
                    let mid = (a + b) * 0.5;
                    let stops = vec![
                        Stop::new(0.0, colors.at(a.x, a.y, w, h), alpha * 0.15),
                        Stop::new(0.5, colors.at(mid.x, mid.y, w, h), alpha * 0.5),
                        Stop::new(1.0, colors.at(b.x, b.y, w, h), alpha * 0.15),
                    ];
                    canvas.stroke_gradient_line(a, b, 0.5 + nearness, stops);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearer_layers_are_larger() {
        assert!(layer_scale(0.1) > layer_scale(0.5));
        assert!(layer_scale(0.5) > layer_scale(1.0));
        assert!(layer_scale(0.0).is_finite());
    }

    #[test]
    fn depth_stays_in_unit_range() {
        use crate::color::{ColorModel, ModelKind, ModelOptions};
        let model = ColorModel::new(ModelKind::Adaptive, &ModelOptions::default());
        let snapshot = vec![255u8; 64];
        let mut canvas = Canvas::new(48, 48);
        let mut session = SessionState::new(0);
        for n in 0..50 {
            let frame = Frame {
                snapshot: &snapshot,
                time: n as f64 * 0.25,
                dt: 0.25,
            };
            WarpGrid.draw(&mut canvas, &frame, &model.frame(&snapshot), &mut session);
            assert!((0.0..1.0).contains(&session.warp_depth));
        }
    }
}
