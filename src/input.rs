use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
pub mod wasm;

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

/// Placement of the render surface in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl SurfaceRect {
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: width as f32,
            height: height as f32,
        }
    }

    /// Maps a pointer position to normalized device coordinates: x grows to
    /// the right, y grows upward, the surface spans -1..=1 on both axes.
    /// Returns `None` while the surface has no area.
    pub fn to_ndc(&self, pointer: Vec2) -> Option<Vec2> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        Some(Vec2::new(
            (pointer.x - self.left) / self.width * 2.0 - 1.0,
            -((pointer.y - self.top) / self.height) * 2.0 + 1.0,
        ))
    }
}

/// Last known pointer position and held buttons for hosts whose button
/// events carry no coordinates.
#[derive(Debug, Default)]
pub struct PointerState {
    position: Option<Vec2>,
    buttons: HashSet<MouseButton>,
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = Some(position);
    }

    pub fn position(&self) -> Option<Vec2> {
        self.position
    }

    pub fn press(&mut self, button: MouseButton) {
        self.buttons.insert(button);
    }

    /// Releases a button and reports whether this completes a click.
    pub fn release(&mut self, button: MouseButton) -> bool {
        self.buttons.remove(&button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_map_to_ndc_extremes() {
        let rect = SurfaceRect {
            left: 100.0,
            top: 50.0,
            width: 800.0,
            height: 600.0,
        };
        assert_eq!(rect.to_ndc(Vec2::new(100.0, 50.0)), Some(Vec2::new(-1.0, 1.0)));
        assert_eq!(rect.to_ndc(Vec2::new(900.0, 650.0)), Some(Vec2::new(1.0, -1.0)));
        assert_eq!(rect.to_ndc(Vec2::new(500.0, 350.0)), Some(Vec2::ZERO));
    }

    #[test]
    fn empty_surface_has_no_ndc() {
        assert_eq!(SurfaceRect::from_size(0, 600).to_ndc(Vec2::ZERO), None);
    }

    #[test]
    fn release_completes_click_only_after_press() {
        let mut pointer = PointerState::new();
        assert!(!pointer.release(MouseButton::LEFT));
        pointer.press(MouseButton::LEFT);
        assert!(pointer.release(MouseButton::LEFT));
        assert!(!pointer.release(MouseButton::LEFT));
    }

    #[test]
    fn pointer_remembers_position() {
        let mut pointer = PointerState::new();
        assert!(pointer.position().is_none());
        pointer.set_position(Vec2::new(3.0, 4.0));
        assert_eq!(pointer.position(), Some(Vec2::new(3.0, 4.0)));
    }
}
