//! Native host: command line, headless runs and the winit window loop.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use glam::{Vec2, Vec3};
use pollster::block_on;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton as WinitMouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use crate::app::{CityApp, TITLE};
use crate::config::CityConfig;
use crate::input::{MouseButton, PointerState, SurfaceRect};
use crate::picking::pick_ndc;
use crate::render::{HeadlessRenderer, Renderer};
use crate::session::ClickOutcome;

/// Explore a procedural neon city; click glowing buildings to collect points.
#[derive(Debug, Parser)]
#[command(name = "neon-city", version)]
pub struct Cli {
    /// XML file overriding the default city parameters.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Seed for reproducible cities.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Run without a window and print a summary.
    #[arg(long)]
    pub headless: bool,
    /// Frames to simulate in headless mode.
    #[arg(long, default_value_t = 600)]
    pub frames: u32,
    /// Scripted clicks on visible glowing buildings in headless mode.
    #[arg(long, default_value_t = 0)]
    pub clicks: u32,
}

#[derive(Debug, Error)]
#[error("failed to initialize {stage}: {message}")]
pub struct WindowInitError {
    stage: &'static str,
    message: String,
}

impl WindowInitError {
    fn new(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self {
            stage,
            message: err.to_string(),
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if cli.headless {
        return run_headless(config, rng, cli.frames, cli.clicks);
    }
    match run_windowed(config.clone(), rng.clone()) {
        Err(err) if err.downcast_ref::<WindowInitError>().is_some() => {
            eprintln!(
                "{err}. Falling back to --headless mode \
                 (set DISPLAY or install X11 libs to enable rendering)."
            );
            run_headless(config, rng, cli.frames, cli.clicks)
        }
        other => other,
    }
}

pub fn load_config(path: Option<&Path>) -> Result<CityConfig> {
    let Some(path) = path else {
        return Ok(CityConfig::default());
    };
    let xml = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    CityConfig::from_xml(&xml).with_context(|| format!("invalid config {}", path.display()))
}

/// Simulates a session at 60 frames per second without a window.
pub fn run_headless(config: CityConfig, mut rng: StdRng, frames: u32, clicks: u32) -> Result<()> {
    let mut app = CityApp::new(config, 1280, 720);
    app.start(&mut rng);
    let city = app.session().context("session did not start")?.city();
    println!(
        "Generated {} buildings ({} interactive)",
        city.buildings.len(),
        city.interactive_count()
    );

    let mut renderer = HeadlessRenderer::default();
    let mut registered = 0;
    for frame in 0..frames {
        let now = frame as f64 / 60.0;
        if registered < clicks {
            if let Some(ndc) = aim_at_glowing_building(&app) {
                if let ClickOutcome::Scored { building, points } = app.clicked(ndc, now) {
                    println!(" - building {} +{points}", building.0);
                    registered += 1;
                }
            }
        }
        app.frame(&mut renderer, now)?;
    }
    app.teardown();

    println!("Rendered {} frames", renderer.frames());
    if let Some(eye) = renderer.last_camera() {
        println!("Camera ended at ({:.1}, {:.1}, {:.1})", eye.x, eye.y, eye.z);
    }
    println!("Clicks registered: {registered}");
    println!("Final score: {}", app.score());
    Ok(())
}

/// Screen position of an interactive building that is not hidden behind
/// another one.
fn aim_at_glowing_building(app: &CityApp) -> Option<Vec2> {
    let session = app.session()?;
    let camera = app.camera()?;
    let view_proj = camera.view_proj();
    let buildings = &session.city().buildings;
    buildings
        .iter()
        .filter(|b| b.is_interactive)
        .find_map(|building| {
            let aim = building.position + Vec3::Y * building.size.y * 0.25;
            let ndc = view_proj.project_point3(aim).truncate();
            let hit = pick_ndc(buildings, camera, ndc)?;
            (hit.building == building.id).then_some(ndc)
        })
}

fn run_windowed(config: CityConfig, rng: StdRng) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| WindowInitError::new("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut host = DesktopHost::new(config, rng);
    event_loop
        .run_app(&mut host)
        .context("event loop terminated abnormally")?;
    host.shutdown();

    match host.last_error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct DesktopHost {
    app: CityApp,
    rng: StdRng,
    clock: Instant,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    pointer: PointerState,
    title: String,
    last_error: Option<anyhow::Error>,
}

impl DesktopHost {
    fn new(config: CityConfig, rng: StdRng) -> Self {
        Self {
            app: CityApp::new(config, 1280, 720),
            rng,
            clock: Instant::now(),
            window: None,
            renderer: None,
            pointer: PointerState::new(),
            title: String::new(),
            last_error: None,
        }
    }

    fn now(&self) -> f64 {
        self.clock.elapsed().as_secs_f64()
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(LogicalSize::new(1280.0, 720.0));
        let window = event_loop
            .create_window(attributes)
            .map_err(|err| WindowInitError::new("window", err))?;
        let size = window.inner_size();
        self.app.resize(size.width, size.height);
        self.window = Some(Arc::new(window));
        self.refresh_title();
        Ok(())
    }

    fn start_session(&mut self) -> Result<()> {
        let Some(window) = self.window.clone() else {
            return Ok(());
        };
        if !self.app.start(&mut self.rng) {
            return Ok(());
        }
        let environment = &self
            .app
            .session()
            .context("session did not start")?
            .city()
            .environment;
        let renderer = block_on(Renderer::new(window, environment))?;
        self.renderer = Some(renderer);
        Ok(())
    }

    fn surface(&self) -> SurfaceRect {
        let (width, height) = self.app.viewport();
        SurfaceRect::from_size(width, height)
    }

    fn process_event(&mut self, event_loop: &ActiveEventLoop, event: WindowEvent) -> Result<()> {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size);
                }
                self.app.resize(size.width, size.height);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                self.pointer.set_position(position);
                if let Some(ndc) = self.surface().to_ndc(position) {
                    self.app.pointer_moved(ndc);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = map_mouse_button(button);
                match state {
                    ElementState::Pressed => self.pointer.press(button),
                    ElementState::Released => {
                        if self.pointer.release(button) && button == MouseButton::LEFT {
                            self.handle_click()?;
                        }
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match event.logical_key {
                    Key::Named(NamedKey::Enter | NamedKey::Space) => self.start_session()?,
                    Key::Named(NamedKey::Escape) => event_loop.exit(),
                    _ => {}
                }
            }
            WindowEvent::RedrawRequested => self.draw_frame()?,
            _ => {}
        }
        Ok(())
    }

    fn handle_click(&mut self) -> Result<()> {
        if !self.app.is_started() {
            return self.start_session();
        }
        let Some(ndc) = self
            .pointer
            .position()
            .and_then(|position| self.surface().to_ndc(position))
        else {
            return Ok(());
        };
        let now = self.now();
        self.app.clicked(ndc, now);
        Ok(())
    }

    fn draw_frame(&mut self) -> Result<()> {
        let now = self.now();
        if let Some(renderer) = self.renderer.as_mut() {
            self.app.frame(renderer, now)?;
        }
        self.refresh_title();
        Ok(())
    }

    fn refresh_title(&mut self) {
        let title = self.app.status_line();
        if title != self.title {
            if let Some(window) = self.window.as_ref() {
                window.set_title(&title);
            }
            self.title = title;
        }
    }

    fn shutdown(&mut self) {
        if self.app.teardown() {
            println!("Final score: {}", self.app.score());
        }
        self.renderer = None;
    }
}

impl ApplicationHandler for DesktopHost {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.create_window(event_loop) {
            self.last_error = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.window.as_ref().map(|window| window.id()) != Some(window_id) {
            return;
        }
        if let Err(err) = self.process_event(event_loop, event) {
            log::error!("event processing error: {err:?}");
            self.last_error = Some(err);
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

fn map_mouse_button(button: WinitMouseButton) -> MouseButton {
    let index = match button {
        WinitMouseButton::Left => 0,
        WinitMouseButton::Right => 1,
        WinitMouseButton::Middle => 2,
        WinitMouseButton::Back => 3,
        WinitMouseButton::Forward => 4,
        WinitMouseButton::Other(value) => value.min(u8::MAX as u16) as u8,
    };
    MouseButton::new(index)
}
