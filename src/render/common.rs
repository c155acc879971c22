use anyhow::Result;
use glam::{Mat4, Vec3};

use crate::config::hex_color;
use crate::scene::City;

/// Camera parameters consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct CameraParams {
    pub view_proj: Mat4,
    pub position: Vec3,
}

/// Lighting state consumed by the renderer's uniform buffer.
#[derive(Clone, Debug)]
pub struct LightParams {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub ambient: Vec3,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            position: Vec3::new(50.0, 100.0, 50.0),
            color: Vec3::ONE,
            intensity: 1.0,
            ambient: hex_color(0x404040) * 2.0,
        }
    }
}

/// Everything a renderer needs for one frame. The city is borrowed
/// read-only; renderers never mutate building state.
pub struct FrameView<'a> {
    pub camera: CameraParams,
    pub light: LightParams,
    pub city: &'a City,
}

/// Draws one frame of the city.
pub trait FrameRenderer {
    fn render_frame(&mut self, frame: &FrameView<'_>) -> Result<()>;
}

/// Renderer for headless runs and tests; counts frames and keeps the last
/// camera position.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    frames: u64,
    last_camera: Option<Vec3>,
}

impl HeadlessRenderer {
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_camera(&self) -> Option<Vec3> {
        self.last_camera
    }
}

impl FrameRenderer for HeadlessRenderer {
    fn render_frame(&mut self, frame: &FrameView<'_>) -> Result<()> {
        self.frames += 1;
        self.last_camera = Some(frame.camera.position);
        Ok(())
    }
}
