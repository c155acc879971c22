use anyhow::Result;

use crate::camera::OrbitCamera;
use crate::config::CityConfig;
use crate::render::{FrameRenderer, FrameView, LightParams};
use crate::scene::AnimationState;
use crate::session::Session;

/// Longest wall-clock gap credited to the pulse clock in one tick. A
/// throttled or backgrounded host resumes the pulse where it left off
/// instead of jumping ahead.
pub const MAX_FRAME_GAP: f64 = 0.1;

/// Per-frame driver: orbit, cooldown expiry, pulse, growth tween, render.
///
/// The driver is advanced by the host's frame callback and never schedules
/// itself; once [`AnimationDriver::stop`] has run, [`AnimationDriver::tick`]
/// is a no-op.
#[derive(Debug, Clone)]
pub struct AnimationDriver {
    camera: OrbitCamera,
    orbit_step: f32,
    pulse_clock: f64,
    last_tick: Option<f64>,
    frames: u64,
    running: bool,
}

impl AnimationDriver {
    pub fn new(config: &CityConfig, aspect: f32) -> Self {
        Self {
            camera: OrbitCamera::new(config, aspect),
            orbit_step: config.orbit_step,
            pulse_clock: 0.0,
            last_tick: None,
            frames: 0,
            running: true,
        }
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn pulse_clock(&self) -> f64 {
        self.pulse_clock
    }

    /// Stops the driver. Returns `false` when it was already stopped.
    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    /// Runs one frame at wall-clock `now` seconds. Returns `Ok(false)` once
    /// the driver has been stopped.
    pub fn tick(
        &mut self,
        session: &mut Session,
        renderer: &mut dyn FrameRenderer,
        now: f64,
    ) -> Result<bool> {
        if !self.running {
            return Ok(false);
        }

        let gap = self
            .last_tick
            .map_or(0.0, |last| (now - last).clamp(0.0, MAX_FRAME_GAP));
        self.last_tick = Some(now);
        self.pulse_clock += gap;

        self.camera.advance(self.orbit_step);
        session.expire_cooldowns(now);
        self.pulse(session);
        advance_growth(session);

        let frame = FrameView {
            camera: self.camera.params(),
            light: LightParams::default(),
            city: session.city(),
        };
        renderer.render_frame(&frame)?;
        self.frames += 1;
        log::trace!("frame {} at t={now:.3}", self.frames);
        Ok(true)
    }

    /// Pulses every interactive building except the hovered one, which keeps
    /// its hover highlight until the pointer leaves it.
    fn pulse(&self, session: &mut Session) {
        let config = session.config();
        let intensity = config.base_intensity
            + (self.pulse_clock as f32 * config.pulse_frequency).sin() * config.pulse_amplitude;
        let hovered = session.state().hovered;
        for building in &mut session.city_mut().buildings {
            if building.is_interactive && Some(building.id) != hovered {
                building.emissive_intensity = intensity;
            }
        }
    }
}

fn advance_growth(session: &mut Session) {
    let step = session.config().growth_step;
    let stretch = session.config().growth_factor - 1.0;
    for building in &mut session.city_mut().buildings {
        let AnimationState::Growing { progress } = building.animation else {
            continue;
        };
        let progress = (progress + step).min(1.0);
        building.scale_y = 1.0 + stretch * progress;
        building.position.y =
            building.rest_y() + building.original_height * (building.scale_y - 1.0) / 2.0;
        building.animation = if progress >= 1.0 {
            AnimationState::Resetting
        } else {
            AnimationState::Growing { progress }
        };
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::render::HeadlessRenderer;
    use crate::scene::{build_city, BuildingId};

    fn setup() -> (Session, AnimationDriver, HeadlessRenderer) {
        let config = CityConfig {
            grid_size: 4,
            interactive_chance: 1.0,
            star_count: 0,
            ..CityConfig::default()
        };
        let city = build_city(&config, &mut StdRng::seed_from_u64(9));
        let driver = AnimationDriver::new(&config, 1.0);
        (Session::new(config, city), driver, HeadlessRenderer::default())
    }

    #[test]
    fn each_tick_orbits_and_renders_once() {
        let (mut session, mut driver, mut renderer) = setup();
        for frame in 0..10 {
            assert!(driver.tick(&mut session, &mut renderer, frame as f64 / 60.0).unwrap());
        }
        assert_eq!(renderer.frames(), 10);
        assert_eq!(driver.frames(), 10);
        assert!((driver.camera().angle - 0.01).abs() < 1e-6);
    }

    #[test]
    fn growth_reaches_one_and_a_half_height() {
        let (mut session, mut driver, mut renderer) = setup();
        let id = BuildingId(0);
        let original = session.city().get(id).unwrap().clone();
        session.click(Some(id), 0.0);

        for frame in 0..25 {
            driver
                .tick(&mut session, &mut renderer, frame as f64 / 60.0)
                .unwrap();
        }
        let grown = session.city().get(id).unwrap();
        assert_eq!(grown.animation, AnimationState::Resetting);
        assert!((grown.scale_y - 1.5).abs() < 1e-5);
        let (min, max) = grown.bounds();
        assert!(min.y.abs() < 1e-3, "base lifted off the ground: {}", min.y);
        assert!((max.y - original.size.y * 1.5).abs() < 1e-3);
        assert!(!grown.is_interactive);
    }

    #[test]
    fn growth_is_gradual() {
        let (mut session, mut driver, mut renderer) = setup();
        let id = BuildingId(1);
        session.click(Some(id), 0.0);
        driver.tick(&mut session, &mut renderer, 0.0).unwrap();
        let building = session.city().get(id).unwrap();
        assert!(matches!(
            building.animation,
            AnimationState::Growing { progress } if (progress - 0.05).abs() < 1e-6
        ));
        assert!((building.scale_y - 1.025).abs() < 1e-6);
    }

    #[test]
    fn cooldown_expiry_restores_scale_and_position() {
        let (mut session, mut driver, mut renderer) = setup();
        let id = BuildingId(2);
        let rest = session.city().get(id).unwrap().position;
        session.click(Some(id), 0.0);
        let mut now = 0.0;
        while now < 3.0 {
            driver.tick(&mut session, &mut renderer, now).unwrap();
            now += 1.0 / 60.0;
        }
        driver.tick(&mut session, &mut renderer, 3.01).unwrap();
        let building = session.city().get(id).unwrap();
        assert!(building.is_interactive);
        assert_eq!(building.scale_y, 1.0);
        assert_eq!(building.position, rest);
        assert_eq!(building.animation, AnimationState::Idle);
        assert_eq!(building.emissive, building.base_color);
    }

    #[test]
    fn pulse_skips_hovered_and_disabled() {
        let (mut session, mut driver, mut renderer) = setup();
        session.hover(Some(BuildingId(0)));
        session.click(Some(BuildingId(1)), 0.0);
        driver.tick(&mut session, &mut renderer, 0.0).unwrap();
        driver.tick(&mut session, &mut renderer, 0.05).unwrap();

        let expected = 0.2 + (0.05f32).sin() * 0.1;
        let city = session.city();
        assert_eq!(city.get(BuildingId(0)).unwrap().emissive_intensity, 0.5);
        assert_eq!(city.get(BuildingId(1)).unwrap().emissive_intensity, 1.0);
        assert_eq!(city.get(BuildingId(1)).unwrap().emissive, Vec3::ONE);
        assert!((city.get(BuildingId(2)).unwrap().emissive_intensity - expected).abs() < 1e-5);
    }

    #[test]
    fn long_gaps_do_not_jump_the_pulse() {
        let (mut session, mut driver, mut renderer) = setup();
        driver.tick(&mut session, &mut renderer, 0.0).unwrap();
        driver.tick(&mut session, &mut renderer, 600.0).unwrap();
        assert!((driver.pulse_clock() - MAX_FRAME_GAP).abs() < 1e-9);
    }

    #[test]
    fn stop_is_idempotent_and_final() {
        let (mut session, mut driver, mut renderer) = setup();
        driver.tick(&mut session, &mut renderer, 0.0).unwrap();
        assert!(driver.stop());
        assert!(!driver.stop());
        assert!(!driver.tick(&mut session, &mut renderer, 1.0).unwrap());
        assert_eq!(renderer.frames(), 1);
        assert!(!driver.is_running());
    }
}
