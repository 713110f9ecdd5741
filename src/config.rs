use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "airwave.toml";
pub const APP_DIR: &str = "airwave";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub visual: VisualConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub font_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VisualConfig {
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub palette: Option<String>,
    #[serde(default)]
    pub colors: Option<Vec<String>>,
    #[serde(default)]
    pub gamma: Option<f32>,
    #[serde(default)]
    pub percentile: Option<f32>,
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default = "default_render_scale")]
    pub render_scale: f32,
    #[serde(default = "default_overscan")]
    pub overscan: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_bins")]
    pub bins: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing_time_constant: f32,
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,
    #[serde(default = "default_max_decibels")]
    pub max_decibels: f32,
}

#[derive(Debug, Deserialize)]
pub struct StatusConfig {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            refresh_rate: default_refresh_rate(),
            crf: default_crf(),
            codec: default_codec(),
            pix_fmt: default_pix_fmt(),
            font: None,
            font_url: None,
        }
    }
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            style: None,
            palette: None,
            colors: None,
            gamma: None,
            percentile: None,
            speed: None,
            render_scale: default_render_scale(),
            overscan: default_overscan(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            bins: default_bins(),
            smoothing_time_constant: default_smoothing(),
            min_decibels: default_min_decibels(),
            max_decibels: default_max_decibels(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 720 }
fn default_refresh_rate() -> u32 { 60 }
fn default_crf() -> u32 { 20 }
fn default_codec() -> String { "libx264".into() }
fn default_pix_fmt() -> String { "yuv420p".into() }
fn default_render_scale() -> f32 { 0.5 }
fn default_overscan() -> f32 { 1.0 }
fn default_bins() -> usize { 512 }
fn default_smoothing() -> f32 { 0.8 }
fn default_min_decibels() -> f32 { -100.0 }
fn default_max_decibels() -> f32 { -30.0 }
fn default_timeout_secs() -> u64 { 5 }

/// Explicit path, or the first of `./airwave.toml`,
/// `~/.config/airwave/config.toml`, `<config_dir>/airwave/config.toml` that
/// exists.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join(APP_DIR).join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join(APP_DIR).join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            log::warn!("Cannot read {}: {}", path.display(), err);
            return None;
        }
    };
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Cannot parse {}: {}", path.display(), err);
            None
        }
    }
}
