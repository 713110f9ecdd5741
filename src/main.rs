mod audio;
mod cli;
mod color;
mod config;
mod encode;
mod prefs;
mod render;
mod status;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use audio::analyser::{Analyser, SilentSource, SpectralSource};
use cli::Cli;
use color::{palettes, ModelOptions};
use config::Config;
use encode::ffmpeg::{EncodeSettings, FfmpegEncoder, FrameSink};
use prefs::{Preferences, VisualPreferences};
use render::scheduler::{Display, LoopSettings, RenderLoop, TickOutcome};
use render::style::Style;
use render::text::{load_font_from_url, TextOverlay};
use render::title::{header_visible, TitlePulse};
use status::StatusClient;

const ALL_STYLES: &str = "all";
const CUSTOM_PALETTE: &str = "custom";
/// Seconds pulled from the live stream when `--duration` is not given.
const DEFAULT_STREAM_SECONDS: f32 = 30.0;

/// Visual options after CLI, config and stored preferences are merged.
#[derive(Debug, PartialEq)]
struct ResolvedVisuals {
    style: String,
    palette: String,
    options: ModelOptions,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    if cli.list_styles {
        println!("Available styles:");
        for style in Style::all() {
            println!("  {:<20} {} ({} fps)", style.tag(), style.display_name(), style.target_fps());
        }
        println!("  {:<20} Cycle through every style", ALL_STYLES);
        return Ok(());
    }
    if cli.list_palettes {
        println!("Available palettes:");
        for (name, colors) in palettes::NAMED {
            println!("  {:<12} {}", name, colors.join(" "));
        }
        return Ok(());
    }

    let mut cfg = Config::default();
    if let Some(path) = config::find_config(cli.config.as_deref()) {
        match config::load_config(&path) {
            Some(loaded) => {
                log::info!("Loaded config from {}", path.display());
                cfg = loaded;
                merge_config(&mut cli, &cfg);
            }
            None => log::warn!("Failed to load config from {}", path.display()),
        }
    }
    cfg.audio.bins = cli.bins.max(1);

    let prefs_path = prefs::default_path();
    let mut stored = match &prefs_path {
        Some(path) => Preferences::load(path),
        None => Preferences::default(),
    };
    let preferences = stored.resolve();
    if !preferences.viz_visible {
        log::info!("Visualization hidden by preferences, rendering title only");
    }

    let visuals = resolve_visuals(&cli, &preferences);
    log::info!(
        "Style: {}, palette: {} ({} colors)",
        visuals.style,
        visuals.palette,
        visuals.options.colors.len()
    );

    if cli.save_prefs {
        let style = Style::parse(&visuals.style);
        stored.store_visual(
            &style,
            &visuals.palette,
            &visuals.options.colors,
            visuals.options.gamma,
            visuals.options.percentile,
        );
        if let Err(err) = stored.save() {
            log::warn!("Could not save preferences: {:#}", err);
        }
    }

    // Now playing
    let mut title = cli.title.clone();
    let status_client = match cli.api_url.as_deref() {
        Some(url) => Some(StatusClient::new(url, Duration::from_secs(cfg.status.timeout_secs))?),
        None => None,
    };
    let mut live = false;
    if let Some(client) = &status_client {
        match client.fetch() {
            Ok(radio) => {
                live = radio.is_live();
                log::info!(
                    "Radio is {} ({} listeners)",
                    if live { "live" } else { "offline" },
                    radio.listeners().unwrap_or(0)
                );
                if title.is_none() {
                    title = radio.now_playing().map(str::to_string);
                }
            }
            Err(err) => log::warn!(
                "Status unavailable: {} ({}{})",
                err.message(),
                err,
                if err.is_retryable() { ", retryable" } else { "" }
            ),
        }
    }

    // 1. Audio
    let (mut source, duration, audio_path): (Box<dyn SpectralSource>, f32, _) = if cli.stream {
        let client = status_client
            .as_ref()
            .context("--stream needs --api-url or status.api_url in the config")?;
        if !live {
            anyhow::bail!("Radio stream is offline");
        }
        let seconds = cli.duration.unwrap_or(DEFAULT_STREAM_SECONDS);
        let audio = audio::decode::decode_stream(&client.stream_url(), seconds)?;
        let analyser = Analyser::new(audio, &cfg.audio);
        let duration = analyser.duration() as f32;
        (Box::new(analyser), duration, None)
    } else if let Some(input) = cli.input.as_ref() {
        if !input.exists() {
            anyhow::bail!("Input file not found: {}", input.display());
        }
        log::info!("Decoding audio...");
        let audio = audio::decode::decode_audio(input, cli.duration)?;
        let analyser = Analyser::new(audio, &cfg.audio);
        let duration = analyser.duration() as f32;
        (Box::new(analyser), duration, Some(input.as_path()))
    } else if let Some(seconds) = cli.duration {
        log::info!("No input audio, rendering {:.1}s of silence", seconds);
        (Box::new(SilentSource::new(cfg.audio.bins)), seconds, None)
    } else {
        anyhow::bail!("Input audio file is required (or --stream, or --duration for silence)");
    };
    let duration = cli.duration.map_or(duration, |limit| duration.min(limit));

    let total_ticks = (duration as f64 * cli.refresh_rate as f64).ceil() as u64;
    log::info!(
        "Resolution: {}x{} @ {}Hz, {:.1}s ({} ticks)",
        cli.width, cli.height, cli.refresh_rate, duration, total_ticks
    );

    // 2. Render loop
    let cycle: Vec<Style> = if visuals.style.eq_ignore_ascii_case(ALL_STYLES) {
        Style::all().to_vec()
    } else {
        vec![Style::parse(&visuals.style)]
    };
    let settings = LoopSettings {
        render_scale: cli.render_scale,
        overscan: cli.overscan,
        placeholder_bins: cfg.audio.bins,
        seed: cli.seed,
    };
    let mut display = Display::new(cli.refresh_rate);
    let mut render_loop = RenderLoop::new(cycle[0].clone(), visuals.options.clone(), settings);
    if preferences.viz_visible {
        render_loop.mount(cli.width, cli.height);
        render_loop.start(&mut display);
    }

    // 3. Encoder
    let encode_settings = EncodeSettings {
        codec: &cli.codec,
        pix_fmt: &cli.pix_fmt,
        crf: cli.crf,
        audio_volume: stored.get(prefs::VOLUME).map(|_| preferences.volume),
    };
    let mut encoder = FfmpegEncoder::new(
        &cli.output,
        audio_path,
        cli.width,
        cli.height,
        cli.refresh_rate,
        &encode_settings,
    )?;

    // 4. Title overlay
    let overlay = match &title {
        Some(_) => build_overlay(&cli),
        None => None,
    };
    let mut pulse = TitlePulse::new();

    // 5. Display ticks
    let pb = ProgressBar::new(total_ticks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ticks ({eta} remaining)")
            .context("Invalid progress template")?
            .progress_chars("=>-"),
    );

    let pixel_len = cli.width as usize * cli.height as usize * 4;
    let mut shown = vec![0u8; pixel_len];
    for px in shown.chunks_exact_mut(4) {
        px[3] = 255;
    }
    let mut frame = Vec::with_capacity(pixel_len);
    let mut title_snapshot = Vec::new();

    for tick in 0..total_ticks {
        let now = display.now();
        let next = &cycle[style_slot(cycle.len(), now, duration as f64)];
        if next != render_loop.style() {
            render_loop.set_style(next.clone());
        }

        if let Some(vsync) = display.vsync() {
            let outcome = render_loop.tick(vsync, &mut display, Some(&mut *source));
            if outcome == TickOutcome::Drawn {
                if let Some(canvas) = render_loop.canvas() {
                    canvas.present(cli.width, cli.height, render_loop.overscan(), &mut shown);
                }
            }
        }

        frame.clear();
        frame.extend_from_slice(&shown);
        let header = header_visible(preferences.auto_hide, now);
        if let (true, Some(overlay), Some(text)) = (header, &overlay, &title) {
            let snapshot: &[u8] = if preferences.viz_visible {
                render_loop.snapshot()
            } else {
                source.snapshot(now, &mut title_snapshot);
                &title_snapshot
            };
            let style = pulse.update(snapshot, now);
            let top = cli.height as f32 * 0.08;
            overlay.composite_title(&mut frame, cli.width, cli.height, text, cli.width as f32 / 2.0, top, &style);
        }

        encoder.write_frame(&frame)?;
        pb.set_position(tick + 1);
    }

    pb.finish_with_message("Rendering complete");
    render_loop.unmount(&mut display);
    log::info!("Drew {} of {} ticks", render_loop.frames_drawn(), total_ticks);

    log::info!("Finishing encoding...");
    encoder.finish()?;

    log::info!("Done! Output: {}", cli.output.display());
    Ok(())
}

/// Config values apply only where the CLI is still at its default.
fn merge_config(cli: &mut Cli, cfg: &Config) {
    if cli.width == cli::DEFAULT_WIDTH { cli.width = cfg.output.width; }
    if cli.height == cli::DEFAULT_HEIGHT { cli.height = cfg.output.height; }
    if cli.refresh_rate == cli::DEFAULT_REFRESH_RATE { cli.refresh_rate = cfg.output.refresh_rate; }
    if cli.crf == cli::DEFAULT_CRF { cli.crf = cfg.output.crf; }
    if cli.codec == cli::DEFAULT_CODEC { cli.codec = cfg.output.codec.clone(); }
    if cli.pix_fmt == cli::DEFAULT_PIX_FMT { cli.pix_fmt = cfg.output.pix_fmt.clone(); }
    if cli.render_scale == cli::DEFAULT_RENDER_SCALE { cli.render_scale = cfg.visual.render_scale; }
    if cli.overscan == cli::DEFAULT_OVERSCAN { cli.overscan = cfg.visual.overscan; }
    if cli.bins == cli::DEFAULT_BINS { cli.bins = cfg.audio.bins; }
    if cli.style.is_none() {
        cli.style = cfg.visual.style.clone();
    }
    if cli.palette.is_none() {
        cli.palette = cfg.visual.palette.clone();
    }
    if cli.colors.is_empty() {
        if let Some(colors) = &cfg.visual.colors {
            cli.colors = colors.clone();
        }
    }
    if cli.gamma.is_none() { cli.gamma = cfg.visual.gamma; }
    if cli.percentile.is_none() { cli.percentile = cfg.visual.percentile; }
    if cli.speed.is_none() { cli.speed = cfg.visual.speed; }
    if cli.font.is_none() {
        cli.font = cfg.output.font.clone();
    }
    if cli.font_url.is_none() {
        cli.font_url = cfg.output.font_url.clone();
    }
    if cli.api_url.is_none() {
        cli.api_url = cfg.status.api_url.clone();
    }
}

/// Fill whatever the command line and config left open from stored
/// preferences. Explicit colors win over a palette name.
fn resolve_visuals(cli: &Cli, preferences: &VisualPreferences) -> ResolvedVisuals {
    let style = cli
        .style
        .clone()
        .unwrap_or_else(|| preferences.style.tag().to_string());

    let named = |name: &str| palettes::by_name(name).map(|colors| colors.iter().map(|c| c.to_string()).collect::<Vec<_>>());
    let (palette, colors) = if !cli.colors.is_empty() {
        (CUSTOM_PALETTE.to_string(), cli.colors.clone())
    } else if let Some(colors) = cli.palette.as_deref().and_then(|name| named(name)) {
        (cli.palette.clone().unwrap_or_default(), colors)
    } else {
        if let Some(name) = &cli.palette {
            log::warn!("Unknown palette '{}', using stored preference", name);
        }
        match &preferences.colors {
            Some(colors) if !colors.is_empty() => (preferences.palette.clone(), colors.clone()),
            _ => (
                preferences.palette.clone(),
                named(&preferences.palette).unwrap_or_default(),
            ),
        }
    };

    ResolvedVisuals {
        style,
        palette,
        options: ModelOptions {
            colors,
            gamma: Some(cli.gamma.unwrap_or(preferences.gamma)),
            percentile: Some(cli.percentile.unwrap_or(preferences.percentile)),
            speed: cli.speed,
        },
    }
}

/// Index of the style shown at `time` when `count` styles share the
/// timeline evenly.
fn style_slot(count: usize, time: f64, duration: f64) -> usize {
    if count <= 1 || duration <= 0.0 {
        return 0;
    }
    let slot = (time / duration * count as f64).floor();
    if slot.is_finite() && slot > 0.0 {
        (slot as usize).min(count - 1)
    } else {
        0
    }
}

fn build_overlay(cli: &Cli) -> Option<TextOverlay> {
    let font_bytes = match cli.font_url.as_deref() {
        Some(url) => match load_font_from_url(url) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::warn!("Failed to load font from URL: {:#}", err);
                None
            }
        },
        None => None,
    };
    let shorter = cli.width.min(cli.height) as f32;
    let font_size = (shorter * 0.07).max(24.0);
    match TextOverlay::new(font_size, cli.font.as_deref(), font_bytes.as_deref()) {
        Ok(overlay) => Some(overlay),
        Err(err) => {
            log::warn!("Title overlay disabled: {:#}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::Preferences;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["airwave"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn style_slots_split_timeline() {
        assert_eq!(style_slot(7, 0.0, 70.0), 0);
        assert_eq!(style_slot(7, 9.99, 70.0), 0);
        assert_eq!(style_slot(7, 10.0, 70.0), 1);
        assert_eq!(style_slot(7, 69.9, 70.0), 6);
        assert_eq!(style_slot(7, 200.0, 70.0), 6);
        assert_eq!(style_slot(1, 50.0, 70.0), 0);
        assert_eq!(style_slot(7, 5.0, 0.0), 0);
    }

    #[test]
    fn config_fills_only_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [output]
            width = 640
            height = 360

            [visual]
            style = "warpGrid"
            palette = "ocean"

            [status]
            api_url = "https://radio.example"
            "#,
        )
        .unwrap();
        let mut args = cli(&["--width", "1024", "--palette", "fire"]);
        merge_config(&mut args, &cfg);
        assert_eq!(args.width, 1024);
        assert_eq!(args.height, 360);
        assert_eq!(args.style.as_deref(), Some("warpGrid"));
        assert_eq!(args.palette.as_deref(), Some("fire"));
        assert_eq!(args.api_url.as_deref(), Some("https://radio.example"));
    }

    #[test]
    fn colors_win_over_palette() {
        let prefs = Preferences::default().resolve();
        let resolved = resolve_visuals(&cli(&["--palette", "fire", "--colors", "#000,#fff"]), &prefs);
        assert_eq!(resolved.palette, CUSTOM_PALETTE);
        assert_eq!(resolved.options.colors, vec!["#000", "#fff"]);

        let resolved = resolve_visuals(&cli(&["--palette", "fire"]), &prefs);
        assert_eq!(resolved.palette, "fire");
        assert_eq!(resolved.options.colors.len(), palettes::FIRE.len());
    }

    #[test]
    fn stored_preferences_fill_gaps() {
        let mut stored = Preferences::default();
        stored.set(prefs::ANIM_MODEL, "radialPetals");
        stored.set(prefs::VIZ_PALETTE, "ice");
        stored.set(prefs::VIZ_GAMMA, "2.5");
        let prefs = stored.resolve();

        let resolved = resolve_visuals(&cli(&[]), &prefs);
        assert_eq!(resolved.style, "radialPetals");
        assert_eq!(resolved.palette, "ice");
        assert_eq!(resolved.options.colors.len(), palettes::ICE.len());
        assert_eq!(resolved.options.gamma, Some(2.5));
        assert_eq!(resolved.options.percentile, Some(0.75));

        let resolved = resolve_visuals(&cli(&["-s", "energyBars", "--gamma", "0.5"]), &prefs);
        assert_eq!(resolved.style, "energyBars");
        assert_eq!(resolved.options.gamma, Some(0.5));
    }

    #[test]
    fn config_style_beats_stored_style() {
        let cfg: Config = toml::from_str(
            r#"
            [visual]
            style = "polar"
            "#,
        )
        .unwrap();
        let mut stored = Preferences::default();
        stored.set(prefs::ANIM_MODEL, "warpGrid");
        let prefs = stored.resolve();

        let mut args = cli(&[]);
        merge_config(&mut args, &cfg);
        assert_eq!(resolve_visuals(&args, &prefs).style, "polar");

        // Without a config value the stored style applies.
        assert_eq!(resolve_visuals(&cli(&[]), &prefs).style, "warpGrid");
        // And the command line beats both.
        let mut args = cli(&["-s", "energyBars"]);
        merge_config(&mut args, &cfg);
        assert_eq!(resolve_visuals(&args, &prefs).style, "energyBars");
    }

    #[test]
    fn unstored_gamma_uses_player_default() {
        let prefs = Preferences::default().resolve();
        let resolved = resolve_visuals(&cli(&[]), &prefs);
        assert_eq!(resolved.options.gamma, Some(1.7));
        assert_eq!(resolved.style, "polar");
    }

    #[test]
    fn unknown_palette_falls_back() {
        let prefs = Preferences::default().resolve();
        let resolved = resolve_visuals(&cli(&["--palette", "plaid"]), &prefs);
        assert_eq!(resolved.palette, "default");
        assert_eq!(resolved.options.colors.len(), palettes::DEFAULT.len());
    }
}
