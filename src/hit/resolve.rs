//! Hit-scan resolution: raycast strategies, penetration and damage

use glam::Vec3;

use super::ballistics::BulletSimulationSettings;
use super::physics::{ActorId, ColliderId, PhysicsWorld, Ray, RayHit, SurfaceTag, TargetId};

/// Hard bound on ray advances for one penetrating shot
pub const MAX_PENETRATION_ITERATIONS: usize = 10;

/// Distance the ray origin is pushed past a penetrated surface
const PENETRATION_SKIN: f32 = 0.001;

/// One collider a bullet touched
#[derive(Debug, Clone, PartialEq)]
pub struct Impact {
    pub collider: ColliderId,
    pub target: Option<TargetId>,
    pub point: Vec3,
    pub normal: Vec3,
    pub surface: SurfaceTag,
    /// Distance travelled from the muzzle
    pub distance: f32,
    /// Damage after dropoff and target multiplier; zero for non-damageable colliders
    pub damage: f32,
    /// Whether the bullet continued through this collider
    pub penetrated: bool,
}

/// Outcome of one hit-scan sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShotTrace {
    pub impacts: Vec<Impact>,
    /// Raycasts performed
    pub advances: usize,
    pub remaining_budget: u32,
}

/// Damage at `distance` against a collider with an optional multiplier
pub fn damage_at(settings: &BulletSimulationSettings, distance: f32, multiplier: Option<f32>) -> f32 {
    settings.damage * settings.dropoff.evaluate(distance) * multiplier.unwrap_or(1.0)
}

/// Nearest hit not rooted at the shooter and not already passed through
pub(crate) fn nearest_valid(
    mut hits: Vec<RayHit>,
    shooter: ActorId,
    passed: &[ColliderId],
) -> Option<RayHit> {
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits.into_iter()
        .find(|hit| hit.collider.root != Some(shooter) && !passed.contains(&hit.collider.id))
}

fn impact_from(settings: &BulletSimulationSettings, hit: &RayHit, travelled: f32, penetrated: bool) -> Impact {
    let damage = if hit.collider.target.is_some() {
        damage_at(settings, travelled, hit.collider.damage_multiplier)
    } else {
        0.0
    };
    Impact {
        collider: hit.collider.id,
        target: hit.collider.target,
        point: hit.point,
        normal: hit.normal,
        surface: hit.collider.surface,
        distance: travelled,
        damage,
        penetrated,
    }
}

/// Resolve one hit-scan sample along `direction` from `origin`.
///
/// Picks the non-penetrating or penetrating strategy from the settings.
pub fn resolve_hitscan(
    world: &dyn PhysicsWorld,
    settings: &BulletSimulationSettings,
    shooter: ActorId,
    origin: Vec3,
    direction: Vec3,
    range: f32,
) -> ShotTrace {
    let Some(ray) = Ray::new(origin, direction) else {
        return ShotTrace::default();
    };
    if settings.penetration_enabled {
        trace_penetrating(world, settings, shooter, ray, range, settings.penetration_budget, 0.0)
    } else {
        trace_single(world, settings, shooter, ray, range, 0.0)
    }
}

/// Sorted raycast, first collider not rooted at the shooter wins
pub fn trace_single(
    world: &dyn PhysicsWorld,
    settings: &BulletSimulationSettings,
    shooter: ActorId,
    ray: Ray,
    range: f32,
    already_travelled: f32,
) -> ShotTrace {
    let hits = world.raycast_all(ray, range, settings.hit_mask);
    let impacts = nearest_valid(hits, shooter, &[])
        .map(|hit| vec![impact_from(settings, &hit, already_travelled + hit.distance, false)])
        .unwrap_or_default();
    ShotTrace {
        impacts,
        advances: 1,
        remaining_budget: settings.penetration_budget,
    }
}

/// Iterative raycast that walks through penetrable colliders.
///
/// `already_travelled` offsets dropoff distance for projectiles that resolve
/// one segment at a time.
pub fn trace_penetrating(
    world: &dyn PhysicsWorld,
    settings: &BulletSimulationSettings,
    shooter: ActorId,
    ray: Ray,
    range: f32,
    budget: u32,
    already_travelled: f32,
) -> ShotTrace {
    let mut trace = ShotTrace {
        remaining_budget: budget,
        ..ShotTrace::default()
    };
    let mut passed: Vec<ColliderId> = Vec::new();
    let mut origin = ray.origin;
    let mut remaining = range;
    let mut travelled = already_travelled;

    while trace.advances < MAX_PENETRATION_ITERATIONS && remaining > 0.0 {
        trace.advances += 1;
        let hits = world.raycast_all(Ray { origin, direction: ray.direction }, remaining, settings.hit_mask);
        let Some(hit) = nearest_valid(hits, shooter, &passed) else {
            break;
        };

        travelled += hit.distance;
        remaining -= hit.distance;

        match hit.collider.penetration_cost {
            Some(cost) if cost <= trace.remaining_budget => {
                trace.remaining_budget -= cost;
                trace.impacts.push(impact_from(settings, &hit, travelled, true));
                if trace.remaining_budget == 0 {
                    break;
                }
                passed.push(hit.collider.id);
                origin = hit.point + ray.direction * PENETRATION_SKIN;
                remaining -= PENETRATION_SKIN;
                travelled += PENETRATION_SKIN;
            }
            _ => {
                trace.impacts.push(impact_from(settings, &hit, travelled, false));
                break;
            }
        }
    }

    trace
}
