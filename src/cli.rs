use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_OUTPUT: &str = "airwave.mp4";
pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 720;
pub const DEFAULT_REFRESH_RATE: u32 = 60;
pub const DEFAULT_RENDER_SCALE: f32 = 0.5;
pub const DEFAULT_OVERSCAN: f32 = 1.0;
pub const DEFAULT_BINS: usize = 512;
pub const DEFAULT_CRF: u32 = 20;
pub const DEFAULT_CODEC: &str = "libx264";
pub const DEFAULT_PIX_FMT: &str = "yuv420p";

#[derive(Parser, Debug)]
#[command(name = "airwave", about = "Audio-reactive radio visualizer", version)]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Read audio from the radio stream instead of a file
    #[arg(long)]
    pub stream: bool,

    /// Output video file
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Viewport width in pixels
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,

    /// Display refresh rate (vsync ticks per second)
    #[arg(long, default_value_t = DEFAULT_REFRESH_RATE)]
    pub refresh_rate: u32,

    /// Visualization style, or "all" to cycle through every style
    /// (defaults to the stored preference, then polar)
    #[arg(short, long)]
    pub style: Option<String>,

    /// Named palette (see --list-palettes)
    #[arg(long)]
    pub palette: Option<String>,

    /// Palette as comma-separated colors (hex or names); wins over --palette
    #[arg(long, value_delimiter = ',')]
    pub colors: Vec<String>,

    /// Contrast exponent (0.3-3)
    #[arg(long)]
    pub gamma: Option<f32>,

    /// Normalization percentile (0.5-0.99)
    #[arg(long)]
    pub percentile: Option<f32>,

    /// Animation speed hint
    #[arg(long)]
    pub speed: Option<f32>,

    /// Canvas resolution relative to the viewport
    #[arg(long, default_value_t = DEFAULT_RENDER_SCALE)]
    pub render_scale: f32,

    /// Extra canvas margin drawn beyond the viewport
    #[arg(long, default_value_t = DEFAULT_OVERSCAN)]
    pub overscan: f32,

    /// Frequency snapshot length
    #[arg(long, default_value_t = DEFAULT_BINS)]
    pub bins: usize,

    /// Title text overlay (defaults to the now-playing title when live)
    #[arg(long)]
    pub title: Option<String>,

    /// Radio API base URL (status and stream)
    #[arg(long)]
    pub api_url: Option<String>,

    /// Font file for the title overlay
    #[arg(long)]
    pub font: Option<String>,

    /// Download the title font from this URL
    #[arg(long)]
    pub font_url: Option<String>,

    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Persist the resolved visual options as preferences
    #[arg(long)]
    pub save_prefs: bool,

    /// List visualization styles and exit
    #[arg(long)]
    pub list_styles: bool,

    /// List named palettes and exit
    #[arg(long)]
    pub list_palettes: bool,

    /// Limit rendered seconds
    #[arg(long)]
    pub duration: Option<f32>,

    /// Seed for particle effects
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// H.264 CRF quality (0-51, lower = better)
    #[arg(long, default_value_t = DEFAULT_CRF)]
    pub crf: u32,

    /// FFmpeg video codec
    #[arg(long, default_value = DEFAULT_CODEC)]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = DEFAULT_PIX_FMT)]
    pub pix_fmt: String,
}
