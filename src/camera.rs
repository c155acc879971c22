use glam::{Mat4, Vec3};

use crate::config::CityConfig;
use crate::render::CameraParams;

const NEAR: f32 = 0.1;
const FAR: f32 = 1000.0;

/// Perspective camera circling the origin at a fixed radius and height.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub angle: f32,
    pub radius: f32,
    pub height: f32,
    pub fov_degrees: f32,
    pub aspect: f32,
}

impl OrbitCamera {
    pub fn new(config: &CityConfig, aspect: f32) -> Self {
        Self {
            angle: 0.0,
            radius: config.orbit_radius,
            height: config.orbit_height,
            fov_degrees: config.fov_degrees,
            aspect: aspect.max(0.01),
        }
    }

    pub fn advance(&mut self, step: f32) {
        self.angle += step;
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(
            self.angle.sin() * self.radius,
            self.height,
            self.angle.cos() * self.radius,
        )
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), Vec3::ZERO, Vec3::Y)
    }

    /// Projection with a 0..1 depth range.
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, NEAR, FAR)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }

    pub fn params(&self) -> CameraParams {
        CameraParams {
            view_proj: self.view_proj(),
            position: self.position(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_keeps_radius_and_height() {
        let mut camera = OrbitCamera::new(&CityConfig::default(), 16.0 / 9.0);
        for _ in 0..1000 {
            camera.advance(0.01);
            let p = camera.position();
            assert!((p.y - 40.0).abs() < 1e-4);
            assert!((p.x.hypot(p.z) - 120.0).abs() < 1e-3);
        }
    }

    #[test]
    fn origin_projects_to_screen_centre() {
        let mut camera = OrbitCamera::new(&CityConfig::default(), 1.5);
        camera.advance(0.7);
        let ndc = camera.view_proj().project_point3(Vec3::ZERO);
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!((0.0..1.0).contains(&ndc.z));
    }

    #[test]
    fn zero_height_viewport_falls_back_to_square() {
        let mut camera = OrbitCamera::new(&CityConfig::default(), 2.0);
        camera.set_aspect(800, 0);
        assert_eq!(camera.aspect, 1.0);
        camera.set_aspect(800, 400);
        assert_eq!(camera.aspect, 2.0);
    }
}
