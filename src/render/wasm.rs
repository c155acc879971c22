use anyhow::{anyhow, Result};
use glam::{Mat4, Vec2, Vec3, Vec4};
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::scene::Building;

use super::common::{FrameRenderer, FrameView, LightParams};

const MIN_CLIP_W: f32 = 0.1;

/// Software renderer backed by a 2D canvas for WebAssembly builds.
///
/// Faces are clipped against the near plane in clip space and drawn back to
/// front; there is no depth buffer.
pub struct CanvasRenderer {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    size: (u32, u32),
}

impl CanvasRenderer {
    /// Creates a renderer that draws into the provided HTML canvas element.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self> {
        let context = canvas
            .get_context("2d")
            .map_err(|err| anyhow!("failed to query canvas context: {err:?}"))?
            .ok_or_else(|| anyhow!("canvas does not support 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| anyhow!("failed to cast canvas context"))?;

        let size = (canvas.width(), canvas.height());
        Ok(Self {
            canvas,
            context,
            size,
        })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Updates the canvas dimensions to match the browser layout.
    pub fn resize(&mut self, new_size: (u32, u32)) {
        if new_size.0 == 0 || new_size.1 == 0 {
            return;
        }
        self.size = new_size;
        self.canvas.set_width(new_size.0);
        self.canvas.set_height(new_size.1);
    }

    fn to_screen(&self, clip: Vec4) -> Vec2 {
        let ndc = clip.truncate() / clip.w;
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.size.0 as f32,
            (1.0 - ndc.y) * 0.5 * self.size.1 as f32,
        )
    }

    fn fill_polygon(&self, view_proj: Mat4, corners: &[Vec3], fill: &str, outline: Option<&str>) {
        let clipped = clip_near(corners.iter().map(|c| view_proj * c.extend(1.0)));
        if clipped.len() < 3 {
            return;
        }
        self.context.begin_path();
        for (index, clip) in clipped.iter().enumerate() {
            let point = self.to_screen(*clip);
            if index == 0 {
                self.context.move_to(point.x as f64, point.y as f64);
            } else {
                self.context.line_to(point.x as f64, point.y as f64);
            }
        }
        self.context.close_path();
        self.context.set_fill_style_str(fill);
        self.context.fill();
        if let Some(outline) = outline {
            self.context.set_stroke_style_str(outline);
            self.context.stroke();
        }
    }

    fn draw_stars(&self, view_proj: Mat4, stars: &[Vec3]) {
        self.context.set_fill_style_str("#ffffff");
        let (width, height) = (self.size.0 as f32, self.size.1 as f32);
        for star in stars {
            let clip = view_proj * star.extend(1.0);
            if clip.w < MIN_CLIP_W {
                continue;
            }
            let point = self.to_screen(clip);
            if point.x >= 0.0 && point.y >= 0.0 && point.x < width && point.y < height {
                self.context
                    .fill_rect(point.x as f64, point.y as f64, 1.0, 1.0);
            }
        }
    }

    fn draw_lines(&self, view_proj: Mat4, segments: &[(Vec3, Vec3)], color: &str, alpha: f32) {
        self.context.set_global_alpha(alpha as f64);
        self.context.set_stroke_style_str(color);
        self.context.set_line_width(1.0);
        self.context.begin_path();
        for (a, b) in segments {
            let clipped = clip_near([view_proj * a.extend(1.0), view_proj * b.extend(1.0)]);
            if let [start, end] = clipped.as_slice() {
                let start = self.to_screen(*start);
                let end = self.to_screen(*end);
                self.context.move_to(start.x as f64, start.y as f64);
                self.context.line_to(end.x as f64, end.y as f64);
            }
        }
        self.context.stroke();
        self.context.set_global_alpha(1.0);
    }

    fn draw_building(&self, view_proj: Mat4, eye: Vec3, light: &LightParams, building: &Building) {
        let (min, max) = building.bounds();
        let glow = building.emissive * building.emissive_intensity;
        for (normal, corners) in box_faces(min, max) {
            let centre = corners.iter().copied().sum::<Vec3>() / 4.0;
            if normal.dot(eye - centre) <= 0.0 {
                continue;
            }
            let light_dir = (light.position - centre).normalize_or_zero();
            let diffuse = normal.dot(light_dir).max(0.0) * light.intensity;
            let color = (light.ambient + light.color * diffuse) * building.base_color * 0.5 + glow;
            let outline = (building.base_color * 0.4 + glow).min(Vec3::ONE);
            self.fill_polygon(
                view_proj,
                &corners,
                &css_color(color),
                Some(&css_color(outline)),
            );
        }
    }
}

impl FrameRenderer for CanvasRenderer {
    fn render_frame(&mut self, frame: &FrameView<'_>) -> Result<()> {
        let env = &frame.city.environment;
        let view_proj = frame.camera.view_proj;
        let eye = frame.camera.position;
        let (width, height) = (self.size.0 as f64, self.size.1 as f64);

        self.context.set_fill_style_str(&css_color(env.background));
        self.context.fill_rect(0.0, 0.0, width, height);
        self.draw_stars(view_proj, &env.stars);

        let half = env.ground.size / 2.0;
        self.fill_polygon(
            view_proj,
            &[
                Vec3::new(-half, 0.0, -half),
                Vec3::new(half, 0.0, -half),
                Vec3::new(half, 0.0, half),
                Vec3::new(-half, 0.0, half),
            ],
            &css_color(env.ground.color),
            None,
        );
        self.draw_lines(
            view_proj,
            &env.grid.segments(),
            &css_color(env.grid.color),
            env.grid.opacity,
        );

        let mut order: Vec<&Building> = frame.city.buildings.iter().collect();
        order.sort_by(|a, b| {
            let da = a.position.distance_squared(eye);
            let db = b.position.distance_squared(eye);
            db.total_cmp(&da)
        });
        for building in order {
            self.draw_building(view_proj, eye, &frame.light, building);
        }
        Ok(())
    }
}

/// Sutherland-Hodgman clip of a polygon against `w >= MIN_CLIP_W`.
fn clip_near(points: impl IntoIterator<Item = Vec4>) -> Vec<Vec4> {
    let input: Vec<Vec4> = points.into_iter().collect();
    let closed = input.len() > 2;
    let mut output = Vec::with_capacity(input.len() + 1);
    let edges = if closed { input.len() } else { input.len().saturating_sub(1) };
    if input.len() == 1 && input[0].w >= MIN_CLIP_W {
        output.push(input[0]);
    }
    for index in 0..edges {
        let current = input[index];
        let next = input[(index + 1) % input.len()];
        let current_in = current.w >= MIN_CLIP_W;
        let next_in = next.w >= MIN_CLIP_W;
        if current_in && (closed || index == 0) {
            output.push(current);
        }
        if current_in != next_in {
            let t = (MIN_CLIP_W - current.w) / (next.w - current.w);
            output.push(current.lerp(next, t));
        }
        if !closed && next_in {
            output.push(next);
        }
    }
    output
}

fn box_faces(min: Vec3, max: Vec3) -> [(Vec3, [Vec3; 4]); 6] {
    let corner = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
    [
        (
            Vec3::Z,
            [
                corner(min.x, min.y, max.z),
                corner(max.x, min.y, max.z),
                corner(max.x, max.y, max.z),
                corner(min.x, max.y, max.z),
            ],
        ),
        (
            Vec3::NEG_Z,
            [
                corner(max.x, min.y, min.z),
                corner(min.x, min.y, min.z),
                corner(min.x, max.y, min.z),
                corner(max.x, max.y, min.z),
            ],
        ),
        (
            Vec3::X,
            [
                corner(max.x, min.y, max.z),
                corner(max.x, min.y, min.z),
                corner(max.x, max.y, min.z),
                corner(max.x, max.y, max.z),
            ],
        ),
        (
            Vec3::NEG_X,
            [
                corner(min.x, min.y, min.z),
                corner(min.x, min.y, max.z),
                corner(min.x, max.y, max.z),
                corner(min.x, max.y, min.z),
            ],
        ),
        (
            Vec3::Y,
            [
                corner(min.x, max.y, max.z),
                corner(max.x, max.y, max.z),
                corner(max.x, max.y, min.z),
                corner(min.x, max.y, min.z),
            ],
        ),
        (
            Vec3::NEG_Y,
            [
                corner(min.x, min.y, min.z),
                corner(max.x, min.y, min.z),
                corner(max.x, min.y, max.z),
                corner(min.x, min.y, max.z),
            ],
        ),
    ]
}

fn css_color(color: Vec3) -> String {
    let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    format!("rgb({}, {}, {})", c.x as u8, c.y as u8, c.z as u8)
}
