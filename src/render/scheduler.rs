//! Frame-capped render loop driven by display vsync callbacks.
//!
//! The loop holds at most one outstanding frame request. Every tick either
//! skips (too soon for the active style's frame cap) or samples a snapshot
//! and redraws the canvas, then asks the driver for the next callback.

use super::canvas::Canvas;
use super::session::SessionState;
use super::style::Style;
use super::styles::{draw_style, Frame};
use crate::audio::analyser::SpectralSource;
use crate::color::{ColorModel, ModelOptions};

/// Slack when comparing elapsed time against the frame interval, so a
/// vsync landing exactly on the interval isn't skipped by rounding.
const INTERVAL_TOLERANCE: f64 = 1e-4;

/// Handle for one requested frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRequest(pub u64);

/// Source of "next frame" callbacks.
pub trait FrameDriver {
    fn request_frame(&mut self) -> FrameRequest;
    fn cancel_frame(&mut self, request: FrameRequest);
}

/// Fixed-rate display that fires the pending request on each vsync.
#[derive(Debug)]
pub struct Display {
    refresh_rate: u32,
    tick: u64,
    next_id: u64,
    pending: Vec<FrameRequest>,
    max_outstanding: usize,
}

impl Display {
    pub fn new(refresh_rate: u32) -> Self {
        Self {
            refresh_rate: refresh_rate.max(1),
            tick: 0,
            next_id: 0,
            pending: Vec::new(),
            max_outstanding: 0,
        }
    }

    pub fn refresh_rate(&self) -> u32 {
        self.refresh_rate
    }

    pub fn now(&self) -> f64 {
        self.tick as f64 / self.refresh_rate as f64
    }

    /// Advance one refresh. Returns the vsync timestamp when a callback
    /// was pending (and is now consumed).
    pub fn vsync(&mut self) -> Option<f64> {
        let now = self.now();
        self.tick += 1;
        if self.pending.is_empty() {
            return None;
        }
        self.pending.clear();
        Some(now)
    }

    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    /// Largest number of simultaneously pending requests seen so far.
    pub fn max_outstanding(&self) -> usize {
        self.max_outstanding
    }
}

impl FrameDriver for Display {
    fn request_frame(&mut self) -> FrameRequest {
        self.next_id += 1;
        let request = FrameRequest(self.next_id);
        self.pending.push(request);
        self.max_outstanding = self.max_outstanding.max(self.pending.len());
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        self.pending.retain(|r| *r != request);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running, or no canvas.
    Idle,
    /// Under the frame budget; rescheduled without drawing.
    Skipped,
    Drawn,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopSettings {
    pub render_scale: f32,
    pub overscan: f32,
    /// Length of the zero-filled snapshot used before a source is attached.
    pub placeholder_bins: usize,
    pub seed: u64,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            render_scale: 0.5,
            overscan: 1.0,
            placeholder_bins: 512,
            seed: 0,
        }
    }
}

/// Canvas pixel size for a viewport: `viewport * render_scale * overscan`.
pub fn canvas_size(viewport: (u32, u32), render_scale: f32, overscan: f32) -> (u32, u32) {
    let k = render_scale * overscan;
    let k = if k.is_finite() && k > 0.0 { k } else { 1.0 };
    let scale = |v: u32| (v as f32 * k).round().max(0.0) as u32;
    (scale(viewport.0), scale(viewport.1))
}

pub struct RenderLoop {
    settings: LoopSettings,
    style: Style,
    options: ModelOptions,
    model: ColorModel,
    session: SessionState,
    canvas: Option<Canvas>,
    pending: Option<FrameRequest>,
    running: bool,
    last_frame: Option<f64>,
    snapshot: Vec<u8>,
    frames_drawn: u64,
}

impl RenderLoop {
    pub fn new(style: Style, options: ModelOptions, settings: LoopSettings) -> Self {
        let model = ColorModel::new(style.color_kind(), &options);
        Self {
            session: SessionState::new(settings.seed),
            settings,
            style,
            options,
            model,
            canvas: None,
            pending: None,
            running: false,
            last_frame: None,
            snapshot: Vec::new(),
            frames_drawn: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        if self.running {
            LoopState::Running
        } else {
            LoopState::Idle
        }
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn overscan(&self) -> f32 {
        self.settings.overscan
    }

    /// The snapshot used for the last drawn frame.
    pub fn snapshot(&self) -> &[u8] {
        &self.snapshot
    }

    /// Attach a canvas sized for `viewport`.
    pub fn mount(&mut self, viewport_width: u32, viewport_height: u32) {
        let viewport = (viewport_width, viewport_height);
        let (w, h) = canvas_size(viewport, self.settings.render_scale, self.settings.overscan);
        log::debug!("Mounted {}x{} canvas for {}x{} viewport", w, h, viewport_width, viewport_height);
        self.canvas = Some(Canvas::new(w, h));
    }

    /// Recompute the canvas size. Takes effect on the next drawn frame.
    pub fn resize(&mut self, viewport_width: u32, viewport_height: u32) {
        let viewport = (viewport_width, viewport_height);
        let (w, h) = canvas_size(viewport, self.settings.render_scale, self.settings.overscan);
        if let Some(canvas) = &mut self.canvas {
            if (canvas.width(), canvas.height()) != (w, h) {
                log::debug!("Canvas resized to {}x{}", w, h);
                canvas.resize(w, h);
            }
        }
    }

    pub fn start(&mut self, driver: &mut dyn FrameDriver) {
        if self.canvas.is_none() {
            log::warn!("Render loop started without a canvas, staying idle");
            return;
        }
        self.running = true;
        self.schedule(driver);
    }

    pub fn stop(&mut self, driver: &mut dyn FrameDriver) {
        if let Some(request) = self.pending.take() {
            driver.cancel_frame(request);
        }
        self.running = false;
    }

    pub fn unmount(&mut self, driver: &mut dyn FrameDriver) {
        self.stop(driver);
        self.canvas = None;
    }

    /// Switch renderers. The next tick draws with the new style without
    /// waiting out the old style's interval.
    pub fn set_style(&mut self, style: Style) {
        if style == self.style {
            return;
        }
        log::info!("Visualization style: {}", style.display_name());
        self.model = ColorModel::new(style.color_kind(), &self.options);
        self.style = style;
        self.last_frame = None;
    }

    pub fn set_options(&mut self, options: ModelOptions) {
        self.model = ColorModel::new(self.style.color_kind(), &options);
        self.options = options;
    }

    fn schedule(&mut self, driver: &mut dyn FrameDriver) {
        if let Some(request) = self.pending.take() {
            driver.cancel_frame(request);
        }
        self.pending = Some(driver.request_frame());
    }

    /// Handle one fired frame callback at `now` seconds.
    pub fn tick(
        &mut self,
        now: f64,
        driver: &mut dyn FrameDriver,
        source: Option<&mut dyn SpectralSource>,
    ) -> TickOutcome {
        // The request that brought us here has fired.
        self.pending = None;
        if !self.running {
            return TickOutcome::Idle;
        }
        if self.canvas.is_none() {
            self.running = false;
            return TickOutcome::Idle;
        }

        let interval = 1.0 / self.style.target_fps() as f64;
        if let Some(last) = self.last_frame {
            if now - last + INTERVAL_TOLERANCE < interval {
                self.schedule(driver);
                return TickOutcome::Skipped;
            }
        }

        match source {
            Some(source) => source.snapshot(now, &mut self.snapshot),
            None => {
                self.snapshot.clear();
                self.snapshot.resize(self.settings.placeholder_bins, 0);
            }
        }

        let dt = self.session.prepare(&self.style, now);
        if let Some(canvas) = self.canvas.as_mut() {
            let frame = Frame {
                snapshot: &self.snapshot,
                time: now,
                dt,
            };
            let colors = self.model.frame(&self.snapshot);
            draw_style(&self.style, canvas, &frame, &colors, &mut self.session);
        }

        self.last_frame = Some(now);
        self.frames_drawn += 1;
        self.schedule(driver);
        TickOutcome::Drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analyser::SilentSource;

    fn running_loop(style: Style, settings: LoopSettings, viewport: (u32, u32)) -> (RenderLoop, Display) {
        let mut display = Display::new(60);
        let mut render_loop = RenderLoop::new(style, ModelOptions::default(), settings);
        render_loop.mount(viewport.0, viewport.1);
        render_loop.start(&mut display);
        (render_loop, display)
    }

    fn run(render_loop: &mut RenderLoop, display: &mut Display, ticks: usize) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();
        for _ in 0..ticks {
            if let Some(now) = display.vsync() {
                outcomes.push(render_loop.tick(now, display, None));
            }
        }
        outcomes
    }

    #[test]
    fn canvas_size_scales_viewport() {
        assert_eq!(canvas_size((800, 600), 0.5, 1.0), (400, 300));
        assert_eq!(canvas_size((1280, 720), 0.5, 1.25), (800, 450));
        assert_eq!(canvas_size((0, 0), 0.5, 1.0), (0, 0));
        assert_eq!(canvas_size((100, 50), f32::NAN, 1.0), (100, 50));
    }

    #[test]
    fn thirty_fps_style_draws_every_other_vsync() {
        let (mut render_loop, mut display) = running_loop(Style::Polar, LoopSettings::default(), (64, 64));
        let outcomes = run(&mut render_loop, &mut display, 6);
        use TickOutcome::*;
        assert_eq!(outcomes, vec![Drawn, Skipped, Drawn, Skipped, Drawn, Skipped]);
        assert_eq!(render_loop.frames_drawn(), 3);
    }

    #[test]
    fn warp_grid_draws_every_third_vsync() {
        let (mut render_loop, mut display) = running_loop(Style::WarpGrid, LoopSettings::default(), (64, 64));
        let outcomes = run(&mut render_loop, &mut display, 9);
        let drawn = outcomes.iter().filter(|o| **o == TickOutcome::Drawn).count();
        assert_eq!(drawn, 3);
    }

    #[test]
    fn never_more_than_one_pending_callback() {
        let (mut render_loop, mut display) = running_loop(Style::Polar, LoopSettings::default(), (32, 32));
        // A second start must replace, not add, the pending request.
        render_loop.start(&mut display);
        run(&mut render_loop, &mut display, 20);
        assert_eq!(display.max_outstanding(), 1);
        assert_eq!(display.outstanding(), 1);

        render_loop.stop(&mut display);
        assert_eq!(display.outstanding(), 0);
        assert_eq!(render_loop.state(), LoopState::Idle);
        assert!(run(&mut render_loop, &mut display, 5).is_empty());
    }

    #[test]
    fn start_without_canvas_stays_idle() {
        let mut display = Display::new(60);
        let mut render_loop = RenderLoop::new(Style::Polar, ModelOptions::default(), LoopSettings::default());
        render_loop.start(&mut display);
        assert_eq!(render_loop.state(), LoopState::Idle);
        assert_eq!(display.outstanding(), 0);
    }

    #[test]
    fn unmount_cancels_and_drops_canvas() {
        let (mut render_loop, mut display) = running_loop(Style::Polar, LoopSettings::default(), (32, 32));
        render_loop.unmount(&mut display);
        assert!(render_loop.canvas().is_none());
        assert_eq!(display.outstanding(), 0);
        assert_eq!(render_loop.tick(1.0, &mut display, None), TickOutcome::Idle);
    }

    #[test]
    fn resize_mid_session_renders_at_new_size() {
        let settings = LoopSettings {
            render_scale: 1.0,
            ..LoopSettings::default()
        };
        let (mut render_loop, mut display) = running_loop(Style::PulseCircles, settings, (800, 600));
        let mut source = SilentSource::new(128);
        let now = display.vsync().unwrap();
        assert_eq!(render_loop.tick(now, &mut display, Some(&mut source)), TickOutcome::Drawn);

        render_loop.resize(400, 300);
        use TickOutcome::*;
        assert_eq!(run(&mut render_loop, &mut display, 2), vec![Skipped, Drawn]);

        let canvas = render_loop.canvas().unwrap();
        assert_eq!((canvas.width(), canvas.height()), (400, 300));
        // The idle ring sits around the new center (200, 150), radius 78.
        let lit = |x: u32, y: u32| canvas.get(x, y).map_or(false, |px| px[..3] != [0, 0, 0]);
        assert!((276..281).any(|x| lit(x, 150)));
        assert!(!lit(200, 150));
    }

    #[test]
    fn style_switch_draws_next_tick_with_fresh_state() {
        let (mut render_loop, mut display) = running_loop(Style::Polar, LoopSettings::default(), (64, 64));
        let drawn_before = {
            run(&mut render_loop, &mut display, 1);
            render_loop.frames_drawn()
        };

        render_loop.set_style(Style::WarpGrid);
        let now = display.vsync().unwrap();
        assert_eq!(render_loop.tick(now, &mut display, None), TickOutcome::Drawn);
        assert_eq!(render_loop.frames_drawn(), drawn_before + 1);
        assert_eq!(render_loop.session().style(), Some(&Style::WarpGrid));
        // Depth restarts from zero and advances by one silent step.
        let depth = render_loop.session().warp_depth;
        assert!((depth - 0.2 / 60.0).abs() < 1e-5, "depth {}", depth);
        assert_eq!(display.max_outstanding(), 1);
    }

    #[test]
    fn unknown_style_keeps_the_loop_alive() {
        let (mut render_loop, mut display) =
            running_loop(Style::parse("lasers"), LoopSettings::default(), (16, 16));
        let outcomes = run(&mut render_loop, &mut display, 4);
        assert_eq!(outcomes.first(), Some(&TickOutcome::Drawn));
        assert_eq!(render_loop.state(), LoopState::Running);
        render_loop.set_style(Style::Polar);
        let outcomes = run(&mut render_loop, &mut display, 2);
        assert!(outcomes.contains(&TickOutcome::Drawn));
    }

    #[test]
    fn placeholder_snapshot_is_zero_filled() {
        let settings = LoopSettings {
            placeholder_bins: 64,
            ..LoopSettings::default()
        };
        let (mut render_loop, mut display) = running_loop(Style::EnergyBars, settings, (32, 32));
        run(&mut render_loop, &mut display, 1);
        assert_eq!(render_loop.snapshot(), &[0u8; 64][..]);
    }
}
