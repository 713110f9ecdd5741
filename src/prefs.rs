//! Listener preferences persisted as a flat JSON object of strings.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::audio::features::{MAX_GAMMA, MAX_PERCENTILE, MIN_GAMMA, MIN_PERCENTILE};
use crate::color::palettes;
use crate::render::style::Style;

pub const ANIM_MODEL: &str = "anim-model";
pub const VIZ_PALETTE: &str = "viz-palette";
pub const VIZ_COLORS: &str = "viz-colors";
pub const VIZ_GAMMA: &str = "viz-gamma";
pub const VIZ_PERCENTILE: &str = "viz-percentile";
pub const AUTOHIDE: &str = "autohide";
pub const VIZ_VISIBLE: &str = "audio-viz-visible";
pub const VOLUME: &str = "volume";

/// Gamma the player renders with when none was ever stored.
const PLAYER_GAMMA: f32 = 1.7;
/// Fallback for a stored gamma that isn't a number.
const INVALID_GAMMA: f32 = 1.0;
const DEFAULT_PERCENTILE: f32 = 0.75;
const DEFAULT_VOLUME: f32 = 0.25;

/// Typed view over the stored preferences.
#[derive(Clone, Debug, PartialEq)]
pub struct VisualPreferences {
    pub style: Style,
    pub palette: String,
    /// Explicit palette colors, if stored.
    pub colors: Option<Vec<String>>,
    pub gamma: f32,
    pub percentile: f32,
    /// Hide the player header once playback has run for a while.
    pub auto_hide: bool,
    pub viz_visible: bool,
    pub volume: f32,
}

#[derive(Debug, Default)]
pub struct Preferences {
    path: Option<PathBuf>,
    values: BTreeMap<String, String>,
}

/// `<config_dir>/airwave/prefs.json`.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(crate::config::APP_DIR).join("prefs.json"))
}

impl Preferences {
    /// Load from `path`. A missing file is an empty store; a malformed one
    /// is logged and treated as empty.
    pub fn load(path: &Path) -> Self {
        let values = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(values) => values,
                Err(err) => {
                    log::warn!("Ignoring malformed preferences {}: {}", path.display(), err);
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                log::warn!("Cannot read preferences {}: {}", path.display(), err);
                BTreeMap::new()
            }
        };
        Self {
            path: Some(path.to_path_buf()),
            values,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn save(&self) -> Result<()> {
        let path = self.path.as_deref().context("Preferences have no backing file")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.values).context("Failed to encode preferences")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Saved preferences to {}", path.display());
        Ok(())
    }

    fn parse_f32(&self, key: &str) -> Option<f32> {
        parse_number_prefix(self.get(key)?)
    }

    fn parse_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).map_or(default, |v| v == "true")
    }

    pub fn resolve(&self) -> VisualPreferences {
        let style = self
            .get(ANIM_MODEL)
            .map(Style::parse)
            .filter(Style::is_known)
            .unwrap_or(Style::Polar);

        let palette = self
            .get(VIZ_PALETTE)
            .filter(|name| palettes::by_name(name).is_some())
            .unwrap_or("default")
            .to_string();

        let colors = self.get(VIZ_COLORS).and_then(|raw| {
            serde_json::from_str::<Vec<String>>(raw)
                .map_err(|err| log::warn!("Ignoring stored palette colors: {}", err))
                .ok()
        });

        let gamma = match self.get(VIZ_GAMMA) {
            None => PLAYER_GAMMA,
            Some(_) => self
                .parse_f32(VIZ_GAMMA)
                .map_or(INVALID_GAMMA, |v| v.clamp(MIN_GAMMA, MAX_GAMMA)),
        };
        let percentile = self
            .parse_f32(VIZ_PERCENTILE)
            .map_or(DEFAULT_PERCENTILE, |v| v.clamp(MIN_PERCENTILE, MAX_PERCENTILE));

        let volume = self
            .parse_f32(VOLUME)
            .filter(|v| (0.0..=1.0).contains(v))
            .unwrap_or(DEFAULT_VOLUME);

        VisualPreferences {
            style,
            palette,
            colors,
            gamma,
            percentile,
            auto_hide: self.parse_bool(AUTOHIDE, true),
            viz_visible: self.parse_bool(VIZ_VISIBLE, true),
            volume,
        }
    }

    /// Store the visual options the way the settings screen does: the
    /// palette name together with its expanded colors. Unset gamma and
    /// percentile are left untouched.
    pub fn store_visual(
        &mut self,
        style: &Style,
        palette: &str,
        colors: &[String],
        gamma: Option<f32>,
        percentile: Option<f32>,
    ) {
        if style.is_known() {
            self.set(ANIM_MODEL, style.tag());
        }
        self.set(VIZ_PALETTE, palette);
        if let Ok(json) = serde_json::to_string(colors) {
            self.set(VIZ_COLORS, json);
        }
        if let Some(gamma) = gamma {
            self.set(VIZ_GAMMA, gamma.to_string());
        }
        if let Some(percentile) = percentile {
            self.set(VIZ_PERCENTILE, percentile.to_string());
        }
    }
}

/// The leading decimal number of `raw`, ignoring whatever follows it, so
/// `"1.7abc"` reads as 1.7. `None` when there is no leading number.
fn parse_number_prefix(raw: &str) -> Option<f32> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let digits = |from: usize| {
        bytes
            .get(from..)
            .map_or(0, |rest| rest.iter().take_while(|b| b.is_ascii_digit()).count())
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    if s[end..].starts_with("Infinity") {
        return s[..end + "Infinity".len()].parse().ok();
    }
    let int = digits(end);
    end += int;
    let mut frac = 0;
    if bytes.get(end) == Some(&b'.') {
        frac = digits(end + 1);
        if int + frac > 0 {
            end += 1 + frac;
        }
    }
    if int + frac == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let n = digits(exp);
        if n > 0 {
            end = exp + n;
        }
    }
    s[..end].parse().ok().filter(|v: &f32| !v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Preferences::load(&dir.path().join("prefs.json"));
        let resolved = prefs.resolve();
        assert_eq!(resolved.style, Style::Polar);
        assert_eq!(resolved.palette, "default");
        assert_eq!(resolved.gamma, 1.7);
        assert_eq!(resolved.percentile, 0.75);
        assert!(resolved.auto_hide);
        assert!(resolved.viz_visible);
        assert_eq!(resolved.volume, 0.25);
    }

    #[test]
    fn malformed_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Preferences::load(&path).get(ANIM_MODEL), None);
    }

    #[test]
    fn values_are_clamped_and_validated() {
        let mut prefs = Preferences::default();
        prefs.set(ANIM_MODEL, "lasers");
        prefs.set(VIZ_PALETTE, "plaid");
        prefs.set(VIZ_GAMMA, "9");
        prefs.set(VIZ_PERCENTILE, "abc");
        prefs.set(VOLUME, "1.5");
        prefs.set(AUTOHIDE, "false");
        let resolved = prefs.resolve();
        assert_eq!(resolved.style, Style::Polar);
        assert_eq!(resolved.palette, "default");
        assert_eq!(resolved.gamma, MAX_GAMMA);
        assert_eq!(resolved.percentile, 0.75);
        assert_eq!(resolved.volume, 0.25);
        assert!(!resolved.auto_hide);
    }

    #[test]
    fn save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");
        let mut prefs = Preferences::load(&path);
        let colors = vec!["#ff0000".to_string(), "#00ff00".to_string()];
        prefs.store_visual(&Style::WarpGrid, "fire", &colors, Some(0.2), Some(0.9));
        prefs.set(VOLUME, "0.6");
        prefs.save().unwrap();

        let resolved = Preferences::load(&path).resolve();
        assert_eq!(resolved.style, Style::WarpGrid);
        assert_eq!(resolved.palette, "fire");
        assert_eq!(resolved.colors, Some(colors));
        // Stored below the floor, clamped on read.
        assert_eq!(resolved.gamma, MIN_GAMMA);
        assert_eq!(resolved.percentile, 0.9);
        assert_eq!(resolved.volume, 0.6);
    }

    #[test]
    fn unparsable_gamma_is_one() {
        let mut prefs = Preferences::default();
        prefs.set(VIZ_GAMMA, "abc");
        assert_eq!(prefs.resolve().gamma, 1.0);
        prefs.set(VIZ_GAMMA, "NaN");
        assert_eq!(prefs.resolve().gamma, 1.0);
    }

    #[test]
    fn numbers_read_by_leading_prefix() {
        let mut prefs = Preferences::default();
        prefs.set(VIZ_GAMMA, "1.7abc");
        prefs.set(VIZ_PERCENTILE, " 0.8 percent");
        prefs.set(VOLUME, ".5;");
        let resolved = prefs.resolve();
        assert_eq!(resolved.gamma, 1.7);
        assert_eq!(resolved.percentile, 0.8);
        assert_eq!(resolved.volume, 0.5);
    }

    #[test]
    fn number_prefix_edge_cases() {
        assert_eq!(parse_number_prefix("2"), Some(2.0));
        assert_eq!(parse_number_prefix("-1.5e1x"), Some(-15.0));
        assert_eq!(parse_number_prefix("3e"), Some(3.0));
        assert_eq!(parse_number_prefix("5."), Some(5.0));
        assert_eq!(parse_number_prefix("+.25"), Some(0.25));
        assert_eq!(parse_number_prefix("Infinity"), Some(f32::INFINITY));
        assert_eq!(parse_number_prefix("."), None);
        assert_eq!(parse_number_prefix("abc"), None);
        assert_eq!(parse_number_prefix(""), None);
        assert_eq!(parse_number_prefix("-"), None);
    }
}
