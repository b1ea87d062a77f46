//! CPU ray casting against the interactive primitives of a model.

use crate::scene::{Model, Primitive, SectionMesh};
use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Nearest intersection among the section meshes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Index into the section mesh list that was tested.
    pub entry: usize,
    pub primitive: usize,
    pub distance: f32,
    pub point: Vec3,
}

/// Slab test; `t` is in units of `dir`, which need not be normalized.
pub fn ray_aabb_intersection(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    // Parallel is judged relative to the ray's length, not in absolute units.
    let parallel = dir.length() * 1e-6;
    let mut t_min: f32 = 0.0;
    let mut t_max: f32 = f32::INFINITY;
    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        if d.abs() <= parallel {
            if o < min[axis] || o > max[axis] {
                return None;
            }
        } else {
            let inv_d = 1.0 / d;
            let mut t1 = (min[axis] - o) * inv_d;
            let mut t2 = (max[axis] - o) * inv_d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
    }
    if t_max < 0.0 {
        return None;
    }
    let t_hit = if t_min >= 0.0 { t_min } else { t_max };
    Some((t_hit, origin + dir * t_hit))
}

/// Möller-Trumbore, hitting both faces. `t` is in units of `dir`.
pub fn ray_triangle_intersection(origin: Vec3, dir: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let edge1 = b - a;
    let edge2 = c - a;
    let p = dir.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() <= f32::EPSILON * dir.length() * edge1.length() * edge2.length() {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = dir.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    (t >= 0.0).then_some(t)
}

/// Nearest hit on one primitive placed by `world`, as (world distance, world point).
pub fn intersect_primitive(ray: &Ray, primitive: &Primitive, world: Mat4) -> Option<(f32, Vec3)> {
    let inverse = world.inverse();
    if !inverse.is_finite() {
        return None;
    }
    // Transforming the direction without renormalizing keeps `t` equal to
    // the world-space distance along a unit ray.
    let origin = inverse.transform_point3(ray.origin);
    let dir = inverse.transform_vector3(ray.direction);
    if dir == Vec3::ZERO || !dir.is_finite() {
        return None;
    }
    ray_aabb_intersection(origin, dir, primitive.bounds.min, primitive.bounds.max)?;

    let mut nearest: Option<f32> = None;
    for index in 0..primitive.triangle_count() {
        let Some([a, b, c]) = primitive.triangle(index) else {
            continue;
        };
        if let Some(t) = ray_triangle_intersection(origin, dir, a, b, c) {
            if nearest.map_or(true, |best| t < best) {
                nearest = Some(t);
            }
        }
    }
    nearest.map(|t| (t, ray.at(t)))
}

/// Closest section mesh under the ray. Ties keep the earlier entry.
pub fn pick_nearest(ray: &Ray, model: &Model, entries: &[SectionMesh]) -> Option<PickHit> {
    let mut best: Option<PickHit> = None;
    for (entry, mesh) in entries.iter().enumerate() {
        let Some(primitive) = model.primitive(mesh.primitive) else {
            continue;
        };
        let world = model.primitive_world(mesh.primitive);
        let Some((distance, point)) = intersect_primitive(ray, primitive, world) else {
            continue;
        };
        if best.map_or(true, |hit| distance < hit.distance) {
            best = Some(PickHit {
                entry,
                primitive: mesh.primitive,
                distance,
                point,
            });
        }
    }
    best
}
