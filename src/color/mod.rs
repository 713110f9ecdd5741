pub mod css;
pub mod model;
pub mod palettes;

pub use css::parse_css_color;
pub use model::{ColorModel, FrameColors, ModelKind, ModelOptions};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Per-channel linear blend, rounded to the nearest integer.
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round().clamp(0.0, 255.0) as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    /// Multiply every channel by `k`, saturating at 255.
    pub fn scale(self, k: f32) -> Rgb {
        let k = if k.is_nan() { 0.0 } else { k.max(0.0) };
        let mul = |c: u8| (c as f32 * k).round().clamp(0.0, 255.0) as u8;
        Rgb::new(mul(self.r), mul(self.g), mul(self.b))
    }
}

/// Ordered, cyclic list of color stops.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    stops: Vec<Rgb>,
}

impl Palette {
    /// Parse CSS color strings once. Strings that don't parse become black;
    /// an empty list falls back to the default palette.
    pub fn from_css<S: AsRef<str>>(colors: &[S]) -> Self {
        if colors.is_empty() {
            return Self::from_css(palettes::DEFAULT);
        }
        let stops = colors
            .iter()
            .map(|c| {
                parse_css_color(c.as_ref()).unwrap_or_else(|| {
                    log::warn!("Invalid palette color '{}', using black", c.as_ref());
                    Rgb::BLACK
                })
            })
            .collect();
        Self { stops }
    }

    pub fn from_stops(stops: Vec<Rgb>) -> Self {
        if stops.is_empty() {
            return Self::from_css(palettes::DEFAULT);
        }
        Self { stops }
    }

    pub fn stops(&self) -> &[Rgb] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Map a 0..1 factor onto the palette: `offset = factor * (N - 1)`,
    /// blend stop `floor(offset) mod N` into the next one (mod N) by the
    /// fractional part.
    pub fn at(&self, factor: f32) -> Rgb {
        let n = self.stops.len();
        if n == 1 {
            return self.stops[0];
        }
        let factor = if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) };
        let offset = factor * (n - 1) as f32;
        let base = offset.floor();
        let index1 = base as usize % n;
        let index2 = (index1 + 1) % n;
        self.stops[index1].lerp(self.stops[index2], offset - base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_stop_palette_is_constant() {
        let palette = Palette::from_css(&["#123456"]);
        assert_eq!(palette.at(0.0), Rgb::new(0x12, 0x34, 0x56));
        assert_eq!(palette.at(0.7), Rgb::new(0x12, 0x34, 0x56));
        assert_eq!(palette.at(1.0), Rgb::new(0x12, 0x34, 0x56));
    }

    #[test]
    fn two_stop_midpoint() {
        let palette = Palette::from_css(&["#000000", "#FFFFFF"]);
        assert_eq!(palette.at(0.5), Rgb::new(128, 128, 128));
        assert_eq!(palette.at(0.25), Rgb::new(64, 64, 64));
    }

    #[test]
    fn invalid_colors_fail_closed_to_black() {
        let palette = Palette::from_css(&["nope", "#fff"]);
        assert_eq!(palette.stops(), &[Rgb::BLACK, Rgb::WHITE]);
    }

    #[test]
    fn empty_palette_uses_default() {
        let empty: [&str; 0] = [];
        assert_eq!(Palette::from_css(&empty).len(), palettes::DEFAULT.len());
    }

    #[test]
    fn scale_saturates() {
        assert_eq!(Rgb::new(200, 100, 0).scale(2.0), Rgb::new(255, 200, 0));
        assert_eq!(Rgb::new(200, 100, 0).scale(0.5), Rgb::new(100, 50, 0));
    }

    proptest! {
        #[test]
        fn palette_endpoints_are_exact(
            stops in proptest::collection::vec(any::<(u8, u8, u8)>(), 1..12),
            factor in 0.0f32..=1.0,
        ) {
            let stops: Vec<Rgb> = stops.into_iter().map(|(r, g, b)| Rgb::new(r, g, b)).collect();
            let palette = Palette::from_stops(stops.clone());
            prop_assert_eq!(palette.at(0.0), stops[0]);
            prop_assert_eq!(palette.at(1.0), *stops.last().unwrap());
            // Never indexes out of bounds for any factor in range.
            let _ = palette.at(factor);
        }
    }
}
