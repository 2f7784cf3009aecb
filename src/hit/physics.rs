//! Physics queries consumed by hit resolution
//!
//! The weapon core only ever asks two questions of the world: "what lies along
//! this ray" and "what overlaps this sphere". [`PhysicsWorld`] is that seam;
//! [`CollisionWorld`] is a small sphere/box implementation used by the session
//! host and the tests.

use bitflags::bitflags;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a controlled actor (player or bot)
pub type ActorId = Uuid;
/// Identity of anything that can take damage
pub type TargetId = Uuid;
/// Collider handle inside a physics world
pub type ColliderId = u32;
/// Surface material tag used for impact cosmetics
pub type SurfaceTag = u16;

bitflags! {
    /// Collision layers a bullet may hit
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct HitMask: u32 {
        const WORLD = 1 << 0;
        const ACTORS = 1 << 1;
        const PROPS = 1 << 2;
        const GLASS = 1 << 3;
    }
}

impl Default for HitMask {
    fn default() -> Self {
        Self::all()
    }
}

/// Everything hit resolution needs to know about a collider
#[derive(Debug, Clone, PartialEq)]
pub struct ColliderInfo {
    pub id: ColliderId,
    pub layer: HitMask,
    /// Actor this collider belongs to, if any
    pub root: Option<ActorId>,
    /// Damage receiver behind this collider
    pub target: Option<TargetId>,
    /// Cost to shoot through; `None` means the collider stops every bullet
    pub penetration_cost: Option<u32>,
    /// Per-target damage multiplier (head boxes, armour plates)
    pub damage_multiplier: Option<f32>,
    pub surface: SurfaceTag,
}

impl ColliderInfo {
    /// A plain world collider: not damageable, not penetrable
    pub fn solid(id: ColliderId) -> Self {
        Self {
            id,
            layer: HitMask::WORLD,
            root: None,
            target: None,
            penetration_cost: None,
            damage_multiplier: None,
            surface: 0,
        }
    }

    pub fn on_layer(mut self, layer: HitMask) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_root(mut self, actor: ActorId) -> Self {
        self.root = Some(actor);
        self
    }

    pub fn with_target(mut self, target: TargetId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn penetrable(mut self, cost: u32) -> Self {
        self.penetration_cost = Some(cost);
        self
    }

    pub fn with_damage_multiplier(mut self, multiplier: f32) -> Self {
        self.damage_multiplier = Some(multiplier);
        self
    }

    pub fn with_surface(mut self, surface: SurfaceTag) -> Self {
        self.surface = surface;
        self
    }
}

/// A ray with a unit direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Builds a ray, normalizing the direction. Returns `None` for a degenerate
    /// direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        Some(Self { origin, direction })
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// One collider crossed by a ray
#[derive(Debug, Clone, PartialEq)]
pub struct RayHit {
    pub collider: ColliderInfo,
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

/// One collider overlapping a sphere
#[derive(Debug, Clone, PartialEq)]
pub struct Overlap {
    pub collider: ColliderInfo,
    /// Distance from the sphere center to the closest point of the collider
    pub distance: f32,
    pub closest: Vec3,
}

/// Read-only physics queries
pub trait PhysicsWorld {
    /// Every collider crossed by `ray` within `max_distance` whose layer
    /// intersects `mask`. Order is unspecified. Colliders containing the ray
    /// origin are not reported.
    fn raycast_all(&self, ray: Ray, max_distance: f32, mask: HitMask) -> Vec<RayHit>;

    /// Every collider overlapping the sphere
    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: HitMask) -> Vec<Overlap>;
}

/// Collider geometry supported by [`CollisionWorld`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { center: Vec3, radius: f32 },
    Aabb { min: Vec3, max: Vec3 },
}

impl Shape {
    /// Box from center and half extents
    pub fn cuboid(center: Vec3, half_extents: Vec3) -> Self {
        Self::Aabb {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Distance along the ray to the entry point, with the surface normal there
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        match *self {
            Shape::Sphere { center, radius } => intersect_sphere(ray, center, radius),
            Shape::Aabb { min, max } => intersect_aabb(ray, min, max),
        }
    }

    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        match *self {
            Shape::Sphere { center, radius } => {
                let offset = p - center;
                let len = offset.length();
                if len <= radius {
                    p
                } else {
                    center + offset / len * radius
                }
            }
            Shape::Aabb { min, max } => p.clamp(min, max),
        }
    }

    pub fn translate_to(&mut self, new_center: Vec3) {
        match self {
            Shape::Sphere { center, .. } => *center = new_center,
            Shape::Aabb { min, max } => {
                let half = (*max - *min) * 0.5;
                *min = new_center - half;
                *max = new_center + half;
            }
        }
    }
}

fn intersect_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<(f32, Vec3)> {
    let m = ray.origin - center;
    let c = m.length_squared() - radius * radius;
    if c <= 0.0 {
        // started inside
        return None;
    }
    let b = m.dot(ray.direction);
    if b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = -b - disc.sqrt();
    if t < 0.0 {
        return None;
    }
    let point = ray.at(t);
    Some((t, (point - center) / radius))
}

fn intersect_aabb(ray: &Ray, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    let o = ray.origin.to_array();
    let d = ray.direction.to_array();
    let lo = min.to_array();
    let hi = max.to_array();

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut enter_axis = 0usize;

    for axis in 0..3 {
        if d[axis].abs() < 1e-8 {
            if o[axis] < lo[axis] || o[axis] > hi[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d[axis];
        let mut t1 = (lo[axis] - o[axis]) * inv;
        let mut t2 = (hi[axis] - o[axis]) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        if t1 > t_enter {
            t_enter = t1;
            enter_axis = axis;
        }
        t_exit = t_exit.min(t2);
        if t_enter > t_exit {
            return None;
        }
    }

    // t_enter < 0 means the origin is inside the box
    if t_enter < 0.0 || !t_enter.is_finite() {
        return None;
    }

    let mut normal = [0.0f32; 3];
    normal[enter_axis] = -d[enter_axis].signum();
    Some((t_enter, Vec3::from_array(normal)))
}

/// Small brute-force collision world
#[derive(Debug, Default, Clone)]
pub struct CollisionWorld {
    colliders: Vec<(Shape, ColliderInfo)>,
    next_id: ColliderId,
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a collider; the id in `info` is replaced by a fresh one
    pub fn insert(&mut self, shape: Shape, mut info: ColliderInfo) -> ColliderId {
        self.next_id += 1;
        info.id = self.next_id;
        self.colliders.push((shape, info));
        self.next_id
    }

    pub fn remove(&mut self, id: ColliderId) -> bool {
        let before = self.colliders.len();
        self.colliders.retain(|(_, info)| info.id != id);
        before != self.colliders.len()
    }

    /// Remove every collider rooted at `actor`
    pub fn remove_root(&mut self, actor: ActorId) {
        self.colliders.retain(|(_, info)| info.root != Some(actor));
    }

    pub fn move_collider(&mut self, id: ColliderId, center: Vec3) {
        if let Some((shape, _)) = self.colliders.iter_mut().find(|(_, info)| info.id == id) {
            shape.translate_to(center);
        }
    }

    pub fn get(&self, id: ColliderId) -> Option<&ColliderInfo> {
        self.colliders
            .iter()
            .find(|(_, info)| info.id == id)
            .map(|(_, info)| info)
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }
}

impl PhysicsWorld for CollisionWorld {
    fn raycast_all(&self, ray: Ray, max_distance: f32, mask: HitMask) -> Vec<RayHit> {
        if !(max_distance > 0.0) || !ray.direction.is_finite() {
            return Vec::new();
        }
        self.colliders
            .iter()
            .filter(|(_, info)| info.layer.intersects(mask))
            .filter_map(|(shape, info)| {
                let (distance, normal) = shape.intersect(&ray)?;
                (distance <= max_distance).then(|| RayHit {
                    collider: info.clone(),
                    distance,
                    point: ray.at(distance),
                    normal,
                })
            })
            .collect()
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: HitMask) -> Vec<Overlap> {
        self.colliders
            .iter()
            .filter(|(_, info)| info.layer.intersects(mask))
            .filter_map(|(shape, info)| {
                let closest = shape.closest_point(center);
                let distance = closest.distance(center);
                (distance <= radius).then(|| Overlap {
                    collider: info.clone(),
                    distance,
                    closest,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forward_ray() -> Ray {
        Ray::new(Vec3::ZERO, Vec3::X).unwrap()
    }

    #[test]
    fn sphere_hit_reports_entry_distance_and_normal() {
        let mut world = CollisionWorld::new();
        world.insert(
            Shape::Sphere { center: Vec3::new(10.0, 0.0, 0.0), radius: 1.0 },
            ColliderInfo::solid(0),
        );
        let hits = world.raycast_all(forward_ray(), 100.0, HitMask::all());
        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - 9.0).abs() < 1e-4);
        assert!((hits[0].normal - Vec3::NEG_X).length() < 1e-4);
    }

    #[test]
    fn box_hit_and_range_limit() {
        let mut world = CollisionWorld::new();
        world.insert(Shape::cuboid(Vec3::new(5.0, 0.0, 0.0), Vec3::splat(0.5)), ColliderInfo::solid(0));
        assert_eq!(world.raycast_all(forward_ray(), 100.0, HitMask::all()).len(), 1);
        assert!(world.raycast_all(forward_ray(), 4.0, HitMask::all()).is_empty());
    }

    #[test]
    fn ray_starting_inside_collider_is_no_hit() {
        let mut world = CollisionWorld::new();
        world.insert(Shape::Sphere { center: Vec3::ZERO, radius: 2.0 }, ColliderInfo::solid(0));
        world.insert(Shape::cuboid(Vec3::ZERO, Vec3::splat(1.0)), ColliderInfo::solid(0));
        assert!(world.raycast_all(forward_ray(), 100.0, HitMask::all()).is_empty());
    }

    #[test]
    fn zero_length_query_is_no_hit() {
        let mut world = CollisionWorld::new();
        world.insert(Shape::cuboid(Vec3::new(1.0, 0.0, 0.0), Vec3::splat(0.5)), ColliderInfo::solid(0));
        assert!(world.raycast_all(forward_ray(), 0.0, HitMask::all()).is_empty());
        assert!(Ray::new(Vec3::ZERO, Vec3::ZERO).is_none());
    }

    #[test]
    fn mask_filters_layers() {
        let mut world = CollisionWorld::new();
        world.insert(
            Shape::cuboid(Vec3::new(3.0, 0.0, 0.0), Vec3::splat(0.5)),
            ColliderInfo::solid(0).on_layer(HitMask::GLASS),
        );
        assert!(world.raycast_all(forward_ray(), 10.0, HitMask::WORLD).is_empty());
        assert_eq!(world.raycast_all(forward_ray(), 10.0, HitMask::GLASS).len(), 1);
    }

    #[test]
    fn overlap_sphere_measures_closest_point() {
        let mut world = CollisionWorld::new();
        world.insert(Shape::cuboid(Vec3::new(3.0, 0.0, 0.0), Vec3::splat(1.0)), ColliderInfo::solid(0));
        let overlaps = world.overlap_sphere(Vec3::ZERO, 2.5, HitMask::all());
        assert_eq!(overlaps.len(), 1);
        assert!((overlaps[0].distance - 2.0).abs() < 1e-5);
        assert!(world.overlap_sphere(Vec3::ZERO, 1.5, HitMask::all()).is_empty());
    }
}
