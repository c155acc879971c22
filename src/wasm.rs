#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use glam::Vec2;
use gloo_events::EventListener;
use rand::rngs::StdRng;
use rand::SeedableRng;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, HtmlCanvasElement, Window};

use crate::app::CityApp;
use crate::config::CityConfig;
use crate::input::wasm::PointerListeners;
use crate::render::CanvasRenderer;

const CANVAS_FILL: f64 = 0.8;

#[wasm_bindgen(start)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Browser entry point. Owns the canvas renderer, the DOM listeners and the
/// `requestAnimationFrame` loop for one city session.
#[wasm_bindgen]
pub struct WasmApp {
    state: Rc<RefCell<BrowserState>>,
    frame_loop: Rc<RefCell<FrameLoop>>,
    pointer: Option<PointerListeners>,
    resize: Option<EventListener>,
}

#[wasm_bindgen]
impl WasmApp {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: String) -> Result<WasmApp, JsValue> {
        Self::create(&canvas_id, None).map_err(to_js)
    }

    /// Same as the constructor, with city parameters read from an XML
    /// document.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(canvas_id: String, config_xml: String) -> Result<WasmApp, JsValue> {
        let config = CityConfig::from_xml(&config_xml).map_err(|err| to_js(err.into()))?;
        Self::create(&canvas_id, Some(config)).map_err(to_js)
    }

    /// Builds the city and starts the frame loop. Calling it again is a
    /// no-op.
    pub fn start(&mut self) -> Result<(), JsValue> {
        if !self.state.borrow_mut().app.start(&mut StdRng::from_entropy()) {
            return Ok(());
        }
        self.attach_listeners().map_err(to_js)?;

        let state = Rc::clone(&self.state);
        let frame_loop = Rc::clone(&self.frame_loop);
        let closure = Closure::wrap(Box::new(move |timestamp: f64| {
            frame_loop.borrow_mut().handle = None;
            let keep_going = match state.try_borrow_mut() {
                Ok(mut state) => state.frame(timestamp / 1000.0),
                Err(_) => true,
            };
            if keep_going {
                if let Err(err) = schedule_frame(&frame_loop) {
                    log::error!("{err}");
                }
            }
        }) as Box<dyn FnMut(f64)>);
        self.frame_loop.borrow_mut().closure = Some(closure);
        schedule_frame(&self.frame_loop).map_err(to_js)
    }

    /// Cancels the pending frame, detaches listeners and ends the session.
    /// Returns `true` only the first time.
    pub fn stop(&mut self) -> bool {
        let closure = {
            let mut frame_loop = self.frame_loop.borrow_mut();
            if let (Some(handle), Some(window)) = (frame_loop.handle.take(), window()) {
                if let Err(err) = window.cancel_animation_frame(handle) {
                    log::warn!("cancelAnimationFrame failed: {err:?}");
                }
            }
            frame_loop.closure.take()
        };
        drop(closure);
        self.pointer = None;
        self.resize = None;
        self.state.borrow_mut().app.teardown()
    }

    pub fn score(&self) -> u32 {
        self.state.borrow().app.score()
    }

    #[wasm_bindgen(js_name = hoveredPoints)]
    pub fn hovered_points(&self) -> Option<u32> {
        self.state.borrow().app.hovered().map(|info| info.point_value)
    }

    /// World position `[x, y, z]` of the hovered building.
    #[wasm_bindgen(js_name = hoveredPosition)]
    pub fn hovered_position(&self) -> Option<Vec<f32>> {
        self.state
            .borrow()
            .app
            .hovered()
            .map(|info| info.position.to_array().to_vec())
    }

    #[wasm_bindgen(js_name = statusLine)]
    pub fn status_line(&self) -> String {
        self.state.borrow().app.status_line()
    }
}

impl WasmApp {
    fn create(canvas_id: &str, config: Option<CityConfig>) -> Result<Self> {
        let window = window().ok_or_else(|| anyhow!("window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| anyhow!("document not available"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| anyhow!("canvas element `{canvas_id}` not found"))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| anyhow!("element `{canvas_id}` is not a canvas"))?;

        let mut renderer = CanvasRenderer::new(canvas)?;
        let size = canvas_size(&window);
        renderer.resize(size);
        let app = CityApp::new(config.unwrap_or_default(), size.0, size.1);

        Ok(Self {
            state: Rc::new(RefCell::new(BrowserState { app, renderer })),
            frame_loop: Rc::new(RefCell::new(FrameLoop::default())),
            pointer: None,
            resize: None,
        })
    }

    fn attach_listeners(&mut self) -> Result<()> {
        let window = window().ok_or_else(|| anyhow!("window not available"))?;
        let canvas = self.state.borrow().renderer.canvas().clone();

        let on_move = {
            let state = Rc::clone(&self.state);
            move |ndc: Vec2| {
                if let Ok(mut state) = state.try_borrow_mut() {
                    state.app.pointer_moved(ndc);
                }
            }
        };
        let on_click = {
            let state = Rc::clone(&self.state);
            let performance = window.performance();
            move |ndc: Vec2| {
                let now = performance.as_ref().map_or(0.0, |p| p.now() / 1000.0);
                if let Ok(mut state) = state.try_borrow_mut() {
                    state.app.clicked(ndc, now);
                }
            }
        };
        self.pointer = Some(PointerListeners::attach(&canvas, on_move, on_click));

        let state = Rc::clone(&self.state);
        let target = window.clone();
        self.resize = Some(EventListener::new(&window, "resize", move |_| {
            let size = canvas_size(&target);
            if let Ok(mut state) = state.try_borrow_mut() {
                state.renderer.resize(size);
                state.app.resize(size.0, size.1);
            }
        }));
        Ok(())
    }
}

impl Drop for WasmApp {
    fn drop(&mut self) {
        self.stop();
    }
}

struct BrowserState {
    app: CityApp,
    renderer: CanvasRenderer,
}

impl BrowserState {
    fn frame(&mut self, now: f64) -> bool {
        let Self { app, renderer } = self;
        match app.frame(renderer, now) {
            Ok(keep_going) => keep_going,
            Err(err) => {
                log::error!("frame failed: {err:?}");
                false
            }
        }
    }
}

#[derive(Default)]
struct FrameLoop {
    handle: Option<i32>,
    closure: Option<Closure<dyn FnMut(f64)>>,
}

fn schedule_frame(frame_loop: &Rc<RefCell<FrameLoop>>) -> Result<()> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let mut frame_loop = frame_loop.borrow_mut();
    let Some(closure) = frame_loop.closure.as_ref() else {
        return Ok(());
    };
    let handle = window
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?;
    frame_loop.handle = Some(handle);
    Ok(())
}

fn canvas_size(window: &Window) -> (u32, u32) {
    let dimension = |value: Result<JsValue, JsValue>, fallback: f64| {
        let value = value.ok().and_then(|v| v.as_f64()).unwrap_or(fallback);
        ((value * CANVAS_FILL) as u32).max(1)
    };
    (
        dimension(window.inner_width(), 1280.0),
        dimension(window.inner_height(), 720.0),
    )
}

fn to_js(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{err:#}"))
}
