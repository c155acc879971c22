//! Procedural neon cityscape with a click-to-score mini game.
//!
//! The crate is split into host-independent pieces (city generation,
//! picking, session rules, animation) and thin hosts: a winit/wgpu desktop
//! window, a canvas-backed WebAssembly entry point and a headless runner
//! used by the command line and tests.

pub mod animation;
pub mod app;
pub mod camera;
pub mod config;
#[cfg(not(target_arch = "wasm32"))]
pub mod desktop;
pub mod input;
pub mod picking;
pub mod render;
pub mod scene;
pub mod session;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use animation::AnimationDriver;
pub use app::CityApp;
pub use camera::OrbitCamera;
pub use config::{CityConfig, ConfigError};
pub use input::{MouseButton, PointerState, SurfaceRect};
pub use picking::{pick, PickHit, Ray};
pub use render::{CameraParams, FrameRenderer, FrameView, HeadlessRenderer, LightParams};
pub use scene::{build_city, AnimationState, Building, BuildingId, City, Environment};
pub use session::{ClickOutcome, HoverInfo, Session, SessionState};
