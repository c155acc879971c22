use anyhow::Result;
use glam::Vec2;
use rand::Rng;

use crate::animation::AnimationDriver;
use crate::camera::OrbitCamera;
use crate::config::CityConfig;
use crate::render::FrameRenderer;
use crate::scene::build_city;
use crate::session::{ClickOutcome, HoverInfo, Session};

pub const TITLE: &str = "Neon Cityscape Explorer";

/// Host-independent shell around one city session.
///
/// Native and browser hosts forward pointer, resize and frame callbacks
/// here; nothing in this type touches a window or a canvas.
#[derive(Debug)]
pub struct CityApp {
    config: CityConfig,
    viewport: (u32, u32),
    session: Option<Session>,
    driver: Option<AnimationDriver>,
    torn_down: bool,
}

impl CityApp {
    pub fn new(config: CityConfig, width: u32, height: u32) -> Self {
        Self {
            config,
            viewport: (width.max(1), height.max(1)),
            session: None,
            driver: None,
            torn_down: false,
        }
    }

    /// Builds the city and starts the animation driver. Returns `false` if
    /// the session was already started or the app has been torn down.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.session.is_some() || self.torn_down {
            return false;
        }
        let city = build_city(&self.config, rng);
        log::info!(
            "city ready: {} buildings, {} interactive",
            city.buildings.len(),
            city.interactive_count()
        );
        let mut driver = AnimationDriver::new(&self.config, 1.0);
        driver.resize(self.viewport.0, self.viewport.1);
        self.driver = Some(driver);
        self.session = Some(Session::new(self.config.clone(), city));
        true
    }

    pub fn is_started(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.driver.as_ref().is_some_and(AnimationDriver::is_running)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn camera(&self) -> Option<&OrbitCamera> {
        self.driver.as_ref().map(AnimationDriver::camera)
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = (width, height);
        if let Some(driver) = self.driver.as_mut() {
            driver.resize(width, height);
        }
    }

    pub fn pointer_moved(&mut self, ndc: Vec2) -> Option<HoverInfo> {
        let (Some(session), Some(driver)) = (self.session.as_mut(), self.driver.as_ref()) else {
            return None;
        };
        if !driver.is_running() {
            return None;
        }
        session.pointer_moved(driver.camera(), ndc)
    }

    pub fn clicked(&mut self, ndc: Vec2, now: f64) -> ClickOutcome {
        let (Some(session), Some(driver)) = (self.session.as_mut(), self.driver.as_ref()) else {
            return ClickOutcome::Missed;
        };
        if !driver.is_running() {
            return ClickOutcome::Missed;
        }
        session.clicked(driver.camera(), ndc, now)
    }

    /// Runs one animation tick. Returns `Ok(false)` when there is nothing
    /// to animate, i.e. before start or after teardown.
    pub fn frame(&mut self, renderer: &mut dyn FrameRenderer, now: f64) -> Result<bool> {
        match (self.session.as_mut(), self.driver.as_mut()) {
            (Some(session), Some(driver)) => driver.tick(session, renderer, now),
            _ => Ok(false),
        }
    }

    /// Stops the animation driver. Safe to call repeatedly; returns `true`
    /// only for the call that actually tore the session down.
    pub fn teardown(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;
        if let Some(driver) = self.driver.as_mut() {
            driver.stop();
        }
        log::info!("session ended with score {}", self.score());
        true
    }

    pub fn score(&self) -> u32 {
        self.session.as_ref().map_or(0, Session::score)
    }

    pub fn hovered(&self) -> Option<HoverInfo> {
        self.session.as_ref().and_then(Session::hovered)
    }

    /// One-line score panel for title bars and HUDs.
    pub fn status_line(&self) -> String {
        if !self.is_started() {
            return format!("{TITLE} | click to start exploration");
        }
        match self.hovered() {
            Some(info) => format!(
                "{TITLE} | SCORE: {} | POINTS: {}",
                self.score(),
                info.point_value
            ),
            None => format!("{TITLE} | SCORE: {}", self.score()),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::render::HeadlessRenderer;

    fn app() -> CityApp {
        let config = CityConfig {
            star_count: 0,
            ..CityConfig::default()
        };
        CityApp::new(config, 1280, 720)
    }

    #[test]
    fn nothing_happens_before_start() {
        let mut app = app();
        let mut renderer = HeadlessRenderer::default();
        assert!(!app.frame(&mut renderer, 0.0).unwrap());
        assert_eq!(app.clicked(Vec2::ZERO, 0.0), ClickOutcome::Missed);
        assert!(app.pointer_moved(Vec2::ZERO).is_none());
        assert_eq!(app.score(), 0);
        assert!(app.status_line().contains("click to start"));
    }

    #[test]
    fn start_only_once() {
        let mut app = app();
        let mut rng = StdRng::seed_from_u64(2);
        assert!(app.start(&mut rng));
        assert!(!app.start(&mut rng));
        assert_eq!(app.session().unwrap().city().buildings.len(), 100);
        assert!(app.session().unwrap().state().started);
        assert_eq!(app.status_line(), "Neon Cityscape Explorer | SCORE: 0");
    }

    #[test]
    fn resize_updates_camera_aspect() {
        let mut app = app();
        app.start(&mut StdRng::seed_from_u64(2));
        app.resize(1000, 500);
        assert_eq!(app.camera().unwrap().aspect, 2.0);
        app.resize(0, 500);
        assert_eq!(app.viewport(), (1000, 500));
    }

    #[test]
    fn teardown_is_idempotent_and_stops_frames() {
        let mut app = app();
        let mut renderer = HeadlessRenderer::default();
        app.start(&mut StdRng::seed_from_u64(4));
        assert!(app.frame(&mut renderer, 0.0).unwrap());
        assert!(app.teardown());
        assert!(!app.teardown());
        assert!(!app.is_running());
        assert!(!app.frame(&mut renderer, 0.016).unwrap());
        assert_eq!(renderer.frames(), 1);
        assert_eq!(app.clicked(Vec2::ZERO, 1.0), ClickOutcome::Missed);
        assert!(!app.start(&mut StdRng::seed_from_u64(4)));
    }

    #[test]
    fn hover_shows_points_in_status() {
        let mut app = app();
        app.start(&mut StdRng::seed_from_u64(8));
        let camera = app.camera().unwrap().clone();
        let city = app.session().unwrap().city();
        let target = city
            .buildings
            .iter()
            .map(|b| (b.id, camera.view_proj().project_point3(b.position)))
            .find_map(|(id, ndc)| {
                let ndc = ndc.truncate();
                let hit = crate::picking::pick_ndc(&city.buildings, &camera, ndc)?;
                let building = city.get(hit.building)?;
                let visible = hit.building == id && building.is_interactive;
                visible.then_some((ndc, building.point_value, building.position))
            });
        let (ndc, points, position) = target.expect("an interactive building faces the camera");
        let info = app.pointer_moved(ndc).unwrap();
        assert_eq!(info.point_value, points);
        assert_eq!(info.position, position);
        assert_eq!(app.hovered().map(|info| info.position.to_array()), Some(position.to_array()));
        assert!(app.status_line().ends_with(&format!("POINTS: {points}")));
    }
}
