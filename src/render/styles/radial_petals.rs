use std::f32::consts::{FRAC_PI_2, TAU};

use super::{bin_for, min_side, Frame, Renderer};
use crate::audio::features::{amplitude_at, mean_energy, BandEnergy};
use crate::color::{FrameColors, Rgb};
use crate::render::canvas::{Canvas, Paint};
use crate::render::geometry::{Path, Point};
use crate::render::session::{SessionState, Spark};

/// (petal count, length scale, angular offset, alpha) per layer, back first.
const LAYERS: [(usize, f32, f32, f32); 2] = [(24, 1.0, 0.0, 0.45), (16, 0.65, 0.5, 0.8)];
const ORBIT_DOTS: usize = 12;
const SPAWN_ATTEMPTS: usize = 3;
const SPARK_GRAVITY: f32 = 40.0;

/// Two layers of curved petals, a ring of orbiting dots and a spark pool
/// fed by ambient energy.
pub struct RadialPetals;

fn petal(center: Point, angle: f32, inner: f32, length: f32, width: f32) -> Vec<Point> {
    let base = center + Point::polar(angle, inner);
    let tip = center + Point::polar(angle, inner + length);
    let mid = center + Point::polar(angle, inner + length * 0.5);
    let side = Point::polar(angle + FRAC_PI_2, width);
    let mut path = Path::new();
    path.move_to(base)
        .quad_to(mid + side, tip, 8)
        .quad_to(mid - side, base, 8);
    path.points().to_vec()
}

impl RadialPetals {
    fn spawn_sparks(session: &mut SessionState, energy: f32, side: f32, hue: f32) {
        for _ in 0..SPAWN_ATTEMPTS {
            if !session.chance(energy * 0.8) {
                continue;
            }
            let angle = session.random_in(0.0, TAU);
            let speed = session.random_in(40.0, 160.0) * (0.5 + energy) * side / 400.0;
            let spark = Spark {
                pos: Point::polar(angle, side * 0.1),
                vel: Point::polar(angle, speed),
                age: 0.0,
                life: session.random_in(0.6, 1.6),
                size: session.random_in(1.0, 2.5) * side / 400.0 + 0.5,
                hue: (hue + session.random_in(-0.15, 0.15)).rem_euclid(1.0),
            };
            if !session.sparks.spawn(spark) {
                break;
            }
        }
    }
}

impl Renderer for RadialPetals {
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
        let len = frame.snapshot.len();
        let t = frame.t();
        let energy = mean_energy(frame.snapshot);
        let factor = colors.factor(center.x, center.y, w, h);

        for (layer, &(count, scale, offset, alpha)) in LAYERS.iter().enumerate() {
            for i in 0..count {
                let amp = amplitude_at(frame.snapshot, bin_for(i, count, len));
                let angle = (i as f32 + offset) / count as f32 * TAU + t * 0.1 * (layer as f32 * 2.0 - 1.0);
                let length = side * (0.08 + 0.3 * amp) * scale;
                let outline = petal(center, angle, side * 0.04, length, length * 0.22);
                let color = colors.palette_at((factor + i as f32 / count as f32 * 0.35).fract());
                canvas.fill_polygon(&outline, &Paint::Solid(color, alpha * (0.4 + 0.6 * amp)));
            }
        }

        let bands = BandEnergy::of(frame.snapshot);
        session.orbit = (session.orbit + frame.dt * (0.4 + energy * 1.2)) % TAU;
        let orbit_radius = side * (0.38 + 0.04 * bands.low);
        for i in 0..ORBIT_DOTS {
            let amp = amplitude_at(frame.snapshot, bin_for(i, ORBIT_DOTS, len));
            let pos = center + Point::polar(session.orbit + i as f32 / ORBIT_DOTS as f32 * TAU, orbit_radius);
            canvas.fill_circle(pos, 1.5 + amp * side * 0.012, colors.at(pos.x, pos.y, w, h), 0.5 + 0.5 * amp);
        }

        Self::spawn_sparks(session, energy, side, factor);
        session.sparks.step(frame.dt, SPARK_GRAVITY * side / 400.0, w, h);
        for spark in session.sparks.iter() {
            let life = spark.remaining();
            canvas.fill_circle(center + spark.pos, spark.size * (0.5 + life), colors.palette_at(spark.hue), life * 0.85);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn petal_outline_is_closed() {
        let pts = petal(Point::new(10.0, 10.0), 0.0, 2.0, 20.0, 4.0);
        assert_eq!(pts.len(), 17);
        let first = pts[0];
        let last = pts[pts.len() - 1];
        assert!((first - last).length() < 1e-4);
        // Tip lies on the petal axis.
        assert!((pts[8] - Point::new(32.0, 10.0)).length() < 1e-4);
    }
}
