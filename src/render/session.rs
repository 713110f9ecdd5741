//! Per-session mutable state shared across ticks.
//!
//! Owned by the render loop and lent to whichever renderer is active. Any
//! field a style relies on for continuity is reset when the style changes,
//! so one style never inherits another's leftovers.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::geometry::Point;
use super::style::Style;
use crate::audio::features::{BeatDetector, PeakSmoother};

pub const SPARK_CAP: usize = 120;

/// Fraction of the canvas a spark may drift past an edge before culling.
const SPARK_MARGIN: f32 = 0.2;

/// Longest step fed to the animation state. Larger gaps (a stalled
/// display, a paused session) are treated as this.
const MAX_DT: f32 = 0.25;

const PEAK_STEP: usize = 4;

/// A short-lived particle. Position is relative to the canvas center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spark {
    pub pos: Point,
    pub vel: Point,
    pub age: f32,
    pub life: f32,
    pub size: f32,
    /// Palette position the spark was born with.
    pub hue: f32,
}

impl Spark {
    pub fn remaining(&self) -> f32 {
        if self.life > 0.0 {
            (1.0 - self.age / self.life).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Spark pool that refuses to grow past [`SPARK_CAP`].
#[derive(Clone, Debug, Default)]
pub struct SparkPool {
    sparks: Vec<Spark>,
}

impl SparkPool {
    pub fn new() -> Self {
        Self {
            sparks: Vec::with_capacity(SPARK_CAP),
        }
    }

    pub fn len(&self) -> usize {
        self.sparks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sparks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Spark> {
        self.sparks.iter()
    }

    /// Returns false when the pool is full.
    pub fn spawn(&mut self, spark: Spark) -> bool {
        if self.sparks.len() >= SPARK_CAP {
            return false;
        }
        self.sparks.push(spark);
        true
    }

    /// Age and move every spark, then drop the expired ones and those
    /// outside the canvas grown by [`SPARK_MARGIN`] on each side.
    pub fn step(&mut self, dt: f32, gravity: f32, width: f32, height: f32) {
        let max_x = width * (0.5 + SPARK_MARGIN);
        let max_y = height * (0.5 + SPARK_MARGIN);
        for spark in &mut self.sparks {
            spark.age += dt;
            spark.vel.y += gravity * dt;
            spark.pos = spark.pos + spark.vel * dt;
        }
        self.sparks.retain(|s| {
            s.age < s.life && s.pos.is_finite() && s.pos.x.abs() <= max_x && s.pos.y.abs() <= max_y
        });
    }

    pub fn clear(&mut self) {
        self.sparks.clear();
    }
}

pub struct SessionState {
    pub rotation: f32,
    pub orbit: f32,
    pub warp_depth: f32,
    pub peaks: PeakSmoother,
    pub beat: BeatDetector,
    pub sparks: SparkPool,
    pub rng: ChaCha8Rng,
    style: Option<Style>,
    last_time: Option<f64>,
    warned_unknown: bool,
}

impl SessionState {
    pub fn new(seed: u64) -> Self {
        Self {
            rotation: 0.0,
            orbit: 0.0,
            warp_depth: 0.0,
            peaks: PeakSmoother::new(PEAK_STEP),
            beat: BeatDetector::new(),
            sparks: SparkPool::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            style: None,
            last_time: None,
            warned_unknown: false,
        }
    }

    pub fn style(&self) -> Option<&Style> {
        self.style.as_ref()
    }

    /// Start a frame for `style` at `now` seconds and return the step since
    /// the previous frame. Switching style resets the continuity fields.
    pub fn prepare(&mut self, style: &Style, now: f64) -> f32 {
        if self.style.as_ref() != Some(style) {
            if let Some(prev) = &self.style {
                log::debug!("Session style {} -> {}, resetting state", prev, style);
            }
            self.reset_continuity();
            self.style = Some(style.clone());
            self.warned_unknown = false;
        }

        let dt = match self.last_time {
            Some(last) => ((now - last) as f32).clamp(0.0, MAX_DT),
            None => 0.0,
        };
        self.last_time = Some(now);
        dt
    }

    /// True the first time it is called for the current unknown style.
    pub fn take_unknown_warning(&mut self) -> bool {
        !std::mem::replace(&mut self.warned_unknown, true)
    }

    fn reset_continuity(&mut self) {
        self.rotation = 0.0;
        self.orbit = 0.0;
        self.warp_depth = 0.0;
        self.peaks.reset();
        self.beat = BeatDetector::new();
        self.sparks.clear();
    }

    /// Uniform sample in `[lo, hi)`; degenerate ranges return `lo`.
    pub fn random_in(&mut self, lo: f32, hi: f32) -> f32 {
        if hi > lo {
            self.rng.random_range(lo..hi)
        } else {
            lo
        }
    }

    pub fn chance(&mut self, p: f32) -> bool {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        self.rng.random_bool(p as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn spark(pos: Point, life: f32) -> Spark {
        Spark {
            pos,
            vel: Point::default(),
            age: 0.0,
            life,
            size: 1.0,
            hue: 0.0,
        }
    }

    #[test]
    fn first_frame_has_zero_dt() {
        let mut session = SessionState::new(1);
        assert_eq!(session.prepare(&Style::Polar, 10.0), 0.0);
        let dt = session.prepare(&Style::Polar, 10.1);
        assert!((dt - 0.1).abs() < 1e-5);
    }

    #[test]
    fn long_gaps_are_clamped() {
        let mut session = SessionState::new(1);
        session.prepare(&Style::Polar, 0.0);
        assert_eq!(session.prepare(&Style::Polar, 30.0), MAX_DT);
        // Clock going backwards is a zero step, not a negative one.
        assert_eq!(session.prepare(&Style::Polar, 29.0), 0.0);
    }

    #[test]
    fn style_switch_resets_continuity() {
        let mut session = SessionState::new(7);
        session.prepare(&Style::PulseCircles, 0.0);
        session.rotation = 3.0;
        session.warp_depth = 0.8;
        session.peaks.update(&[200; 64]);
        session.sparks.spawn(spark(Point::default(), 1.0));

        session.prepare(&Style::WarpGrid, 0.05);
        assert_eq!(session.rotation, 0.0);
        assert_eq!(session.warp_depth, 0.0);
        assert!(session.peaks.values().is_empty());
        assert!(session.sparks.is_empty());
        assert_eq!(session.style(), Some(&Style::WarpGrid));
    }

    #[test]
    fn unknown_warning_fires_once_per_selection() {
        let mut session = SessionState::new(0);
        let lasers = Style::parse("lasers");
        session.prepare(&lasers, 0.0);
        assert!(session.take_unknown_warning());
        session.prepare(&lasers, 0.1);
        assert!(!session.take_unknown_warning());
        session.prepare(&Style::Polar, 0.2);
        session.prepare(&lasers, 0.3);
        assert!(session.take_unknown_warning());
    }

    #[test]
    fn sparks_cull_outside_expanded_bounds() {
        let mut pool = SparkPool::new();
        pool.spawn(spark(Point::new(0.0, 0.0), 5.0));
        pool.spawn(spark(Point::new(65.0, 0.0), 5.0)); // inside 100 * 0.7
        pool.spawn(spark(Point::new(75.0, 0.0), 5.0));
        pool.spawn(spark(Point::new(0.0, 0.0), 0.01));
        pool.step(0.02, 0.0, 100.0, 100.0);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = SessionState::new(42);
        let mut b = SessionState::new(42);
        for _ in 0..16 {
            assert_eq!(a.random_in(0.0, 1.0), b.random_in(0.0, 1.0));
        }
        assert_eq!(a.random_in(2.0, 2.0), 2.0);
    }

    proptest! {
        #[test]
        fn pool_never_exceeds_cap(attempts in 0usize..600, steps in 0usize..5) {
            let mut pool = SparkPool::new();
            for i in 0..attempts {
                pool.spawn(spark(Point::new(0.0, 0.0), 10.0));
                if steps > 0 && i % 50 == 0 {
                    pool.step(0.01, 9.8, 200.0, 200.0);
                }
                prop_assert!(pool.len() <= SPARK_CAP);
            }
        }
    }
}
