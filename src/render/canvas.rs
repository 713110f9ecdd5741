//! Software RGBA drawing surface.
//!
//! Every operation clips to the surface and returns quietly on non-finite
//! geometry, so renderers never have to guard their own math.

use rayon::prelude::*;

use super::geometry::Point;
use crate::color::Rgb;

/// One stop of a linear gradient. `offset` is 0..1 along the gradient axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stop {
    pub offset: f32,
    pub color: Rgb,
    pub alpha: f32,
}

impl Stop {
    pub fn new(offset: f32, color: Rgb, alpha: f32) -> Self {
        Self {
            offset,
            color,
            alpha,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    pub from: Point,
    pub to: Point,
    pub stops: Vec<Stop>,
}

impl Gradient {
    pub fn new(from: Point, to: Point, stops: Vec<Stop>) -> Self {
        let mut stops = stops;
        stops.sort_by(|a, b| a.offset.total_cmp(&b.offset));
        Self { from, to, stops }
    }

    fn sample(&self, p: Point) -> (Rgb, f32) {
        let (first, last) = match (self.stops.first(), self.stops.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return (Rgb::BLACK, 0.0),
        };
        let axis = self.to - self.from;
        let len2 = axis.dot(axis);
        let t = if len2 > f32::EPSILON {
            ((p - self.from).dot(axis) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };

        if t <= first.offset {
            return (first.color, first.alpha);
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.offset {
                let span = (b.offset - a.offset).max(f32::EPSILON);
                let k = (t - a.offset) / span;
                return (a.color.lerp(b.color, k), a.alpha + (b.alpha - a.alpha) * k);
            }
        }
        (last.color, last.alpha)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Paint {
    Solid(Rgb, f32),
    Linear(Gradient),
}

impl Paint {
    pub fn solid(color: Rgb) -> Self {
        Paint::Solid(color, 1.0)
    }

    fn sample(&self, p: Point) -> (Rgb, f32) {
        match self {
            Paint::Solid(color, alpha) => (*color, *alpha),
            Paint::Linear(gradient) => gradient.sample(p),
        }
    }
}

pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// Inclusive-exclusive pixel box after clipping.
struct Span {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        let mut canvas = Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
        };
        canvas.resize(width, height);
        canvas
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Reallocate to a new size. Contents are cleared to opaque black.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        let len = width as usize * height as usize * 4;
        self.pixels.clear();
        self.pixels.resize(len, 0);
        self.clear(Rgb::BLACK);
    }

    pub fn clear(&mut self, color: Rgb) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[color.r, color.g, color.b, 255]);
        }
    }

    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels
            .get(idx..idx + 4)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }

    fn blend(&mut self, x: u32, y: u32, color: Rgb, alpha: f32) {
        if !(alpha > 0.0) || x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        if let Some(px) = self.pixels.get_mut(idx..idx + 4) {
            blend_into(px, color, alpha.min(1.0));
        }
    }

    fn clip(&self, min: Point, max: Point) -> Option<Span> {
        if !min.is_finite() || !max.is_finite() || self.width == 0 || self.height == 0 {
            return None;
        }
        let x0 = min.x.floor().max(0.0);
        let y0 = min.y.floor().max(0.0);
        let x1 = max.x.ceil().min(self.width as f32);
        let y1 = max.y.ceil().min(self.height as f32);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some(Span {
            x0: x0 as u32,
            y0: y0 as u32,
            x1: x1 as u32,
            y1: y1 as u32,
        })
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, paint: &Paint) {
        let (x0, x1) = if w < 0.0 { (x + w, x) } else { (x, x + w) };
        let (y0, y1) = if h < 0.0 { (y + h, y) } else { (y, y + h) };
        let Some(span) = self.clip(Point::new(x0, y0), Point::new(x1, y1)) else {
            return;
        };
        for py in span.y0..span.y1 {
            let cy = py as f32 + 0.5;
            let cov_y = coverage_1d(cy, y0, y1);
            for px in span.x0..span.x1 {
                let cx = px as f32 + 0.5;
                let cov = cov_y * coverage_1d(cx, x0, x1);
                if cov <= 0.0 {
                    continue;
                }
                let (color, alpha) = paint.sample(Point::new(cx, cy));
                self.blend(px, py, color, alpha * cov);
            }
        }
    }

    pub fn fill_circle(&mut self, center: Point, radius: f32, color: Rgb, alpha: f32) {
        if !(radius > 0.0) {
            return;
        }
        let reach = Point::new(radius + 1.0, radius + 1.0);
        let Some(span) = self.clip(center - reach, center + reach) else {
            return;
        };
        for py in span.y0..span.y1 {
            for px in span.x0..span.x1 {
                let d = (Point::new(px as f32 + 0.5, py as f32 + 0.5) - center).length();
                let cov = (radius - d + 0.5).clamp(0.0, 1.0);
                if cov > 0.0 {
                    self.blend(px, py, color, alpha * cov);
                }
            }
        }
    }

    /// Soft glow: alpha falls off quadratically from `alpha` at the center
    /// to zero at `radius`.
    pub fn fill_radial(&mut self, center: Point, radius: f32, color: Rgb, alpha: f32) {
        if !(radius > 0.0) {
            return;
        }
        let reach = Point::new(radius, radius);
        let Some(span) = self.clip(center - reach, center + reach) else {
            return;
        };
        for py in span.y0..span.y1 {
            for px in span.x0..span.x1 {
                let d = (Point::new(px as f32 + 0.5, py as f32 + 0.5) - center).length();
                let falloff = (1.0 - d / radius).max(0.0);
                if falloff > 0.0 {
                    self.blend(px, py, color, alpha * falloff * falloff);
                }
            }
        }
    }

    pub fn stroke_line(&mut self, a: Point, b: Point, width: f32, paint: &Paint) {
        if !(width > 0.0) {
            return;
        }
        let half = width / 2.0;
        let pad = Point::new(half + 1.0, half + 1.0);
        let min = Point::new(a.x.min(b.x), a.y.min(b.y)) - pad;
        let max = Point::new(a.x.max(b.x), a.y.max(b.y)) + pad;
        let Some(span) = self.clip(min, max) else {
            return;
        };
        let ab = b - a;
        let len2 = ab.dot(ab);
        for py in span.y0..span.y1 {
            for px in span.x0..span.x1 {
                let p = Point::new(px as f32 + 0.5, py as f32 + 0.5);
                let t = if len2 > f32::EPSILON {
                    ((p - a).dot(ab) / len2).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let d = (p - (a + ab * t)).length();
                let cov = (half - d + 0.5).clamp(0.0, 1.0);
                if cov > 0.0 {
                    let (color, alpha) = paint.sample(p);
                    self.blend(px, py, color, alpha * cov);
                }
            }
        }
    }

    /// A line whose color runs through `stops` from `a` to `b`.
    pub fn stroke_gradient_line(&mut self, a: Point, b: Point, width: f32, stops: Vec<Stop>) {
        self.stroke_line(a, b, width, &Paint::Linear(Gradient::new(a, b, stops)));
    }

    pub fn stroke_polyline(&mut self, points: &[Point], width: f32, paint: &Paint) {
        for pair in points.windows(2) {
            self.stroke_line(pair[0], pair[1], width, paint);
        }
    }

    /// Stroke the arc of `radius` around `center` from `start` sweeping
    /// `sweep` radians clockwise in screen space. A sweep of `TAU` or more
    /// strokes the full ring.
    pub fn stroke_arc(
        &mut self,
        center: Point,
        radius: f32,
        start: f32,
        sweep: f32,
        width: f32,
        color: Rgb,
        alpha: f32,
    ) {
        if !(radius > 0.0) || !(width > 0.0) || !start.is_finite() || !sweep.is_finite() {
            return;
        }
        let half = width / 2.0;
        let reach = Point::new(radius + half + 1.0, radius + half + 1.0);
        let Some(span) = self.clip(center - reach, center + reach) else {
            return;
        };
        let tau = std::f32::consts::TAU;
        let full = sweep.abs() >= tau;
        let (start, sweep) = if sweep < 0.0 { (start + sweep, -sweep) } else { (start, sweep) };
        let start = start.rem_euclid(tau);

        for py in span.y0..span.y1 {
            for px in span.x0..span.x1 {
                let v = Point::new(px as f32 + 0.5, py as f32 + 0.5) - center;
                let cov = (half - (v.length() - radius).abs() + 0.5).clamp(0.0, 1.0);
                if cov <= 0.0 {
                    continue;
                }
                if !full {
                    let angle = v.y.atan2(v.x).rem_euclid(tau);
                    if (angle - start).rem_euclid(tau) > sweep {
                        continue;
                    }
                }
                self.blend(px, py, color, alpha * cov);
            }
        }
    }

    /// Even-odd scanline fill sampled at pixel centers.
    pub fn fill_polygon(&mut self, points: &[Point], paint: &Paint) {
        if points.len() < 3 || points.iter().any(|p| !p.is_finite()) {
            return;
        }
        let (mut min, mut max) = (points[0], points[0]);
        for p in points {
            min = Point::new(min.x.min(p.x), min.y.min(p.y));
            max = Point::new(max.x.max(p.x), max.y.max(p.y));
        }
        let Some(span) = self.clip(min, max) else {
            return;
        };

        let mut crossings: Vec<f32> = Vec::new();
        for py in span.y0..span.y1 {
            let cy = py as f32 + 0.5;
            crossings.clear();
            for i in 0..points.len() {
                let a = points[i];
                let b = points[(i + 1) % points.len()];
                if (a.y <= cy) != (b.y <= cy) {
                    crossings.push(a.x + (cy - a.y) / (b.y - a.y) * (b.x - a.x));
                }
            }
            crossings.sort_by(f32::total_cmp);
            for pair in crossings.chunks_exact(2) {
                let x0 = pair[0].max(span.x0 as f32);
                let x1 = pair[1].min(span.x1 as f32);
                if x0 >= x1 {
                    continue;
                }
                for px in (x0.floor() as u32)..(x1.ceil() as u32).min(span.x1) {
                    let cx = px as f32 + 0.5;
                    let cov = coverage_1d(cx, pair[0], pair[1]);
                    if cov > 0.0 {
                        let (color, alpha) = paint.sample(Point::new(cx, cy));
                        self.blend(px, py, color, alpha * cov);
                    }
                }
            }
        }
    }

    /// Evaluate `f(x, y)` for every pixel center and blend the result.
    /// Rows are processed in parallel.
    pub fn fill_field<F>(&mut self, f: F)
    where
        F: Fn(f32, f32) -> (Rgb, f32) + Sync,
    {
        let width = self.width as usize;
        if width == 0 {
            return;
        }
        self.pixels
            .par_chunks_mut(width * 4)
            .enumerate()
            .for_each(|(y, row)| {
                let cy = y as f32 + 0.5;
                for (x, px) in row.chunks_exact_mut(4).enumerate() {
                    let (color, alpha) = f(x as f32 + 0.5, cy);
                    if alpha > 0.0 {
                        blend_into(px, color, alpha.min(1.0));
                    }
                }
            });
    }

    /// Scale the surface onto an `out_width` x `out_height` RGBA buffer with
    /// bilinear filtering. With `overscan > 1` only the central
    /// `1 / overscan` of the surface is shown.
    pub fn present(&self, out_width: u32, out_height: u32, overscan: f32, out: &mut Vec<u8>) {
        let out_len = out_width as usize * out_height as usize * 4;
        out.clear();
        out.resize(out_len, 0);
        if out_len == 0 {
            return;
        }
        if self.width == 0 || self.height == 0 {
            for px in out.chunks_exact_mut(4) {
                px[3] = 255;
            }
            return;
        }

        let overscan = if overscan.is_finite() { overscan.max(1.0) } else { 1.0 };
        let src_w = self.width as f32 / overscan;
        let src_h = self.height as f32 / overscan;
        let off_x = (self.width as f32 - src_w) / 2.0;
        let off_y = (self.height as f32 - src_h) / 2.0;
        let sx = src_w / out_width as f32;
        let sy = src_h / out_height as f32;
        let max_x = self.width as usize - 1;
        let max_y = self.height as usize - 1;
        let stride = self.width as usize * 4;
        let src = &self.pixels;

        out.par_chunks_mut(out_width as usize * 4)
            .enumerate()
            .for_each(|(oy, row)| {
                let fy = (off_y + (oy as f32 + 0.5) * sy - 0.5).max(0.0);
                let y0 = (fy.floor() as usize).min(max_y);
                let y1 = (y0 + 1).min(max_y);
                let ty = fy - y0 as f32;
                for (ox, px) in row.chunks_exact_mut(4).enumerate() {
                    let fx = (off_x + (ox as f32 + 0.5) * sx - 0.5).max(0.0);
                    let x0 = (fx.floor() as usize).min(max_x);
                    let x1 = (x0 + 1).min(max_x);
                    let tx = fx - x0 as f32;
                    for c in 0..4 {
                        let p00 = src[y0 * stride + x0 * 4 + c] as f32;
                        let p10 = src[y0 * stride + x1 * 4 + c] as f32;
                        let p01 = src[y1 * stride + x0 * 4 + c] as f32;
                        let p11 = src[y1 * stride + x1 * 4 + c] as f32;
                        let top = p00 + (p10 - p00) * tx;
                        let bottom = p01 + (p11 - p01) * tx;
                        px[c] = (top + (bottom - top) * ty).round().clamp(0.0, 255.0) as u8;
                    }
                }
            });
    }
}

/// Fraction of the unit pixel centered at `c` that lies inside `[lo, hi]`.
fn coverage_1d(c: f32, lo: f32, hi: f32) -> f32 {
    ((c + 0.5).min(hi) - (c - 0.5).max(lo)).clamp(0.0, 1.0)
}

fn blend_into(px: &mut [u8], color: Rgb, a: f32) {
    let inv = 1.0 - a;
    let mix = |src: u8, dst: u8| (src as f32 * a + dst as f32 * inv).round() as u8;
    px[0] = mix(color.r, px[0]);
    px[1] = mix(color.g, px[1]);
    px[2] = mix(color.b, px[2]);
    px[3] = mix(255, px[3]);
}
