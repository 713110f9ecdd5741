use anyhow::{Context, Result};
use fontdue::{Font, FontSettings};

use super::title::TitleStyle;
use crate::color::Rgb;

/// Glow halo offsets, in units of the glow radius.
const HALO: [(f32, f32); 8] = [
    (1.0, 0.0),
    (-1.0, 0.0),
    (0.0, 1.0),
    (0.0, -1.0),
    (0.7, 0.7),
    (-0.7, 0.7),
    (0.7, -0.7),
    (-0.7, -0.7),
];

/// Fetch font bytes over HTTP.
pub fn load_font_from_url(url: &str) -> Result<Vec<u8>> {
    log::info!("Downloading font from {}", url);
    let response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to fetch font from {}", url))?
        .error_for_status()
        .with_context(|| format!("Font download failed: {}", url))?;
    let bytes = response.bytes().context("Failed to read font body")?;
    Ok(bytes.to_vec())
}

pub struct TextOverlay {
    font: Font,
    font_size: f32,
}

impl TextOverlay {
    /// Build from downloaded bytes, or read `font_path` when no bytes are
    /// given.
    pub fn new(font_size: f32, font_path: Option<&str>, font_bytes: Option<&[u8]>) -> Result<Self> {
        let owned;
        let data = match (font_bytes, font_path) {
            (Some(bytes), _) => bytes,
            (None, Some(path)) => {
                owned = std::fs::read(path).with_context(|| format!("Failed to read font {}", path))?;
                owned.as_slice()
            }
            (None, None) => anyhow::bail!("No font path or font data given"),
        };
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|e| anyhow::anyhow!("Failed to parse font: {}", e))?;
        Ok(Self { font, font_size })
    }

    /// Draw the animated title centered on `center_x`, top at `y`.
    pub fn composite_title(
        &self,
        pixels: &mut [u8],
        width: u32,
        height: u32,
        text: &str,
        center_x: f32,
        y: f32,
        style: &TitleStyle,
    ) {
        let size = self.font_size * style.scale.max(0.1);
        let text_width = self.measure_width_at(text, size).max(1) as f32;
        let left = center_x - text_width / 2.0;
        let tilt = style.tilt_deg.to_radians();
        let shade = |px: f32| {
            let t = (px - left) / text_width;
            (style.gradient_start.lerp(style.gradient_end, t), 1.0)
        };

        if style.glow > 0.0 {
            let radius = style.glow * size * 0.08;
            let halo_alpha = (style.glow * 0.18).min(0.25);
            let glow = |_: f32| (style.gradient_start, halo_alpha);
            for (dx, dy) in HALO {
                self.draw_glyphs(
                    pixels,
                    width,
                    height,
                    text,
                    size,
                    (left + dx * radius, y + dy * radius),
                    tilt,
                    &glow,
                );
            }
        }
        self.draw_glyphs(pixels, width, height, text, size, (left, y), tilt, &shade);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_glyphs(
        &self,
        pixels: &mut [u8],
        width: u32,
        height: u32,
        text: &str,
        size: f32,
        origin: (f32, f32),
        tilt: f32,
        shade: &dyn Fn(f32) -> (Rgb, f32),
    ) {
        let text_width = self.measure_width_at(text, size) as f32;
        let pivot = (origin.0 + text_width / 2.0, origin.1 + size / 2.0);
        let (sin, cos) = tilt.sin_cos();

        let mut cursor_x = origin.0;
        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, size);
            let glyph_y = origin.1 + size - metrics.height as f32 - metrics.ymin as f32;
            let glyph_x = cursor_x + metrics.xmin as f32;

            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let coverage = bitmap[gy * metrics.width + gx];
                    if coverage == 0 {
                        continue;
                    }
                    let sx = glyph_x + gx as f32;
                    let sy = glyph_y + gy as f32;
                    let (rx, ry) = (sx - pivot.0, sy - pivot.1);
                    let px = (pivot.0 + rx * cos - ry * sin).round();
                    let py = (pivot.1 + rx * sin + ry * cos).round();
                    if px < 0.0 || py < 0.0 || px >= width as f32 || py >= height as f32 {
                        continue;
                    }

                    let idx = (py as usize * width as usize + px as usize) * 4;
                    let Some(dst) = pixels.get_mut(idx..idx + 4) else {
                        continue;
                    };
                    let (color, alpha) = shade(sx);
                    let a = coverage as f32 / 255.0 * alpha.clamp(0.0, 1.0);
                    let inv_a = 1.0 - a;
                    dst[0] = (color.r as f32 * a + dst[0] as f32 * inv_a) as u8;
                    dst[1] = (color.g as f32 * a + dst[1] as f32 * inv_a) as u8;
                    dst[2] = (color.b as f32 * a + dst[2] as f32 * inv_a) as u8;
                    dst[3] = 255;
                }
            }

            cursor_x += metrics.advance_width;
        }
    }

    fn measure_width_at(&self, text: &str, size: f32) -> u32 {
        let width: f32 = text
            .chars()
            .map(|ch| self.font.metrics(ch, size).advance_width)
            .sum();
        width.ceil() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_font_sources_are_errors() {
        assert!(TextOverlay::new(24.0, None, None).is_err());
        assert!(TextOverlay::new(24.0, Some("/nonexistent/font.ttf"), None).is_err());
        assert!(TextOverlay::new(24.0, None, Some(&b"not a font"[..])).is_err());
    }
}
