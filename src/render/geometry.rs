use std::ops::{Add, Mul, Sub};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector at `angle` radians, scaled by `radius`.
    pub fn polar(angle: f32, radius: f32) -> Self {
        Self::new(angle.cos() * radius, angle.sin() * radius)
    }

    pub fn rotate(self, angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn dot(self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;
    fn mul(self, k: f32) -> Point {
        Point::new(self.x * k, self.y * k)
    }
}

/// Polyline builder with quadratic curves flattened as they are added.
#[derive(Clone, Debug, Default)]
pub struct Path {
    points: Vec<Point>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, p: Point) -> &mut Self {
        self.points.clear();
        self.points.push(p);
        self
    }

    pub fn quad_to(&mut self, ctrl: Point, to: Point, segments: usize) -> &mut Self {
        let Some(&from) = self.points.last() else {
            self.points.push(to);
            return self;
        };
        let segments = segments.max(1);
        for i in 1..=segments {
            let t = i as f32 / segments as f32;
            let u = 1.0 - t;
            self.points.push(from * (u * u) + ctrl * (2.0 * u * t) + to * (t * t));
        }
        self
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

/// Outline of a square of half-size `half` with corner radius `radius`,
/// centered on the origin, rotated by `angle`, then moved to `center`.
pub fn rounded_square(center: Point, half: f32, radius: f32, angle: f32) -> Vec<Point> {
    const CORNER_SEGMENTS: usize = 6;
    let radius = radius.clamp(0.0, half.max(0.0));
    let inner = half - radius;
    let corners = [
        (Point::new(inner, inner), 0.0f32),
        (Point::new(-inner, inner), 0.5),
        (Point::new(-inner, -inner), 1.0),
        (Point::new(inner, -inner), 1.5),
    ];

    let mut points = Vec::with_capacity(4 * (CORNER_SEGMENTS + 1) + 1);
    for (corner, start) in corners {
        for i in 0..=CORNER_SEGMENTS {
            let a = (start + 0.5 * i as f32 / CORNER_SEGMENTS as f32) * std::f32::consts::PI;
            points.push(center + (corner + Point::polar(a, radius)).rotate(angle));
        }
    }
    if let Some(&first) = points.first() {
        points.push(first);
    }
    points
}
