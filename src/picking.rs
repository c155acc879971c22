use glam::{Vec2, Vec3};

use crate::camera::OrbitCamera;
use crate::scene::{Building, BuildingId};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    pub building: BuildingId,
    pub distance: f32,
    pub point: Vec3,
}

/// Casts a ray from the camera through a point in normalized device
/// coordinates (x right, y up, both in -1..=1).
pub fn ray_from_ndc(camera: &OrbitCamera, ndc: Vec2) -> Ray {
    let inverse = camera.view_proj().inverse();
    let near = inverse.project_point3(ndc.extend(0.0));
    let far = inverse.project_point3(ndc.extend(1.0));
    Ray {
        origin: near,
        dir: (far - near).normalize_or_zero(),
    }
}

/// Nearest building whose current bounds the ray enters.
///
/// Equal distances resolve to the lower building id. Disabled buildings are
/// still hit; callers decide whether the hit means anything.
pub fn pick(buildings: &[Building], ray: Ray) -> Option<PickHit> {
    if ray.dir == Vec3::ZERO {
        return None;
    }

    let mut best: Option<(f32, BuildingId)> = None;
    for building in buildings {
        let (min, max) = building.bounds();
        let Some(t) = ray_aabb_hit_t(ray, min, max) else {
            continue;
        };
        best = match best {
            Some((bt, bid)) if bt < t || (bt == t && bid < building.id) => Some((bt, bid)),
            _ => Some((t, building.id)),
        };
    }

    best.map(|(distance, building)| PickHit {
        building,
        distance,
        point: ray.origin + ray.dir * distance,
    })
}

/// Screen picking: ray cast and nearest hit in one call.
pub fn pick_ndc(buildings: &[Building], camera: &OrbitCamera, ndc: Vec2) -> Option<PickHit> {
    pick(buildings, ray_from_ndc(camera, ndc))
}

fn ray_aabb_hit_t(ray: Ray, min: Vec3, max: Vec3) -> Option<f32> {
    // Slab test; returns the entry distance, zero when starting inside.
    let mut t_min = 0.0_f32;
    let mut t_max = f32::INFINITY;
    for axis in 0..3 {
        let o = ray.origin[axis];
        let d = ray.dir[axis];
        if d.abs() < 1e-8 {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t1 = (min[axis] - o) * inv;
        let mut t2 = (max[axis] - o) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_max < t_min {
            return None;
        }
    }
    Some(t_min)
}
