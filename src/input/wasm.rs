use glam::Vec2;
use gloo_events::EventListener;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, MouseEvent};

use super::{MouseButton, SurfaceRect};

/// DOM pointer listeners on the game canvas. Positions are handed to the
/// callbacks already mapped to normalized device coordinates.
///
/// Dropping the handler detaches every listener.
pub struct PointerListeners {
    listeners: Vec<EventListener>,
}

impl PointerListeners {
    pub fn attach<M, C>(canvas: &HtmlCanvasElement, on_move: M, on_click: C) -> Self
    where
        M: Fn(Vec2) + 'static,
        C: Fn(Vec2) + 'static,
    {
        let mut listeners = Vec::new();

        {
            let target = canvas.clone();
            listeners.push(EventListener::new(canvas, "mousemove", move |event| {
                let Some(event) = event.dyn_ref::<MouseEvent>() else {
                    return;
                };
                if let Some(ndc) = event_ndc(&target, event) {
                    on_move(ndc);
                }
            }));
        }

        {
            let target = canvas.clone();
            listeners.push(EventListener::new(canvas, "click", move |event| {
                let Some(event) = event.dyn_ref::<MouseEvent>() else {
                    return;
                };
                if MouseButton::new(event.button() as u8) != MouseButton::LEFT {
                    return;
                }
                if let Some(ndc) = event_ndc(&target, event) {
                    on_click(ndc);
                }
            }));
        }

        Self { listeners }
    }
}

impl Drop for PointerListeners {
    fn drop(&mut self) {
        self.listeners.clear();
    }
}

fn event_ndc(canvas: &HtmlCanvasElement, event: &MouseEvent) -> Option<Vec2> {
    let rect = canvas.get_bounding_client_rect();
    let surface = SurfaceRect {
        left: rect.left() as f32,
        top: rect.top() as f32,
        width: rect.width() as f32,
        height: rect.height() as f32,
    };
    surface.to_ndc(Vec2::new(event.client_x() as f32, event.client_y() as f32))
}
