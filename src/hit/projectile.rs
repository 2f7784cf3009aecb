//! Physical projectiles - bullets with travel time and thrown grenades

use std::sync::Arc;

use glam::Vec3;
use tracing::debug;

use super::ballistics::BulletSimulationSettings;
use super::damage::{DamageRequest, ShotSource};
use super::physics::{HitMask, PhysicsWorld, Ray};
use super::pool::{ObjectPool, PoolHandle};
use super::resolve::{nearest_valid, trace_penetrating, trace_single, Impact};

/// Gravity acceleration in m/s²
pub const GRAVITY: f32 = 9.81;

/// Area damage carried by grenades
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Explosion {
    pub radius: f32,
    pub damage: f32,
    pub force: f32,
    pub mask: HitMask,
}

impl Explosion {
    /// Linear falloff from full damage at the center to zero at the radius
    pub fn damage_at(&self, distance: f32) -> f32 {
        if self.radius <= 0.0 || distance > self.radius {
            return 0.0;
        }
        self.damage * (1.0 - distance / self.radius)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectileKind {
    Bullet,
    Grenade { fuse_at: f64, explosion: Explosion },
}

/// Projectile in flight
#[derive(Debug, Clone)]
pub struct Projectile {
    pub handle: PoolHandle,
    pub source: ShotSource,
    pub position: Vec3,
    pub velocity: Vec3,
    pub settings: Arc<BulletSimulationSettings>,
    pub kind: ProjectileKind,
    budget: u32,
    travelled: f32,
    expires_at: f64,
    stuck_until: Option<f64>,
    resting: bool,
    finished: bool,
}

/// What one projectile did during one step
#[derive(Debug, Clone, Default)]
pub struct ProjectileStep {
    pub impacts: Vec<Impact>,
    pub finished: bool,
}

impl Projectile {
    pub fn bullet(
        handle: PoolHandle,
        source: ShotSource,
        settings: Arc<BulletSimulationSettings>,
        now: f64,
    ) -> Self {
        let velocity = source.direction.normalize_or_zero() * settings.speed;
        Self {
            handle,
            source,
            position: source.position,
            velocity,
            budget: settings.penetration_budget,
            expires_at: now + settings.life_time as f64,
            settings,
            kind: ProjectileKind::Bullet,
            travelled: 0.0,
            stuck_until: None,
            resting: false,
            finished: false,
        }
    }

    pub fn grenade(
        handle: PoolHandle,
        source: ShotSource,
        velocity: Vec3,
        settings: Arc<BulletSimulationSettings>,
        fuse_at: f64,
        explosion: Explosion,
    ) -> Self {
        Self {
            handle,
            source,
            position: source.position,
            velocity,
            budget: 0,
            expires_at: fuse_at,
            settings,
            kind: ProjectileKind::Grenade { fuse_at, explosion },
            travelled: 0.0,
            stuck_until: None,
            resting: false,
            finished: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_stuck(&self) -> bool {
        self.stuck_until.is_some()
    }

    /// Advance one simulation step.
    ///
    /// Sweeps a ray from the previous to the new position and applies the same
    /// penetration and damage rules as hit-scan.
    pub fn step(&mut self, now: f64, dt: f32, world: &dyn PhysicsWorld) -> ProjectileStep {
        let mut step = ProjectileStep::default();
        if self.finished {
            step.finished = true;
            return step;
        }

        if let Some(until) = self.stuck_until {
            if now >= until {
                self.finished = true;
            }
            step.finished = self.finished;
            return step;
        }

        if let ProjectileKind::Grenade { fuse_at, explosion } = self.kind {
            if now >= fuse_at {
                step.impacts = self.explode(&explosion, world);
                self.finished = true;
                step.finished = true;
                return step;
            }
        } else if now >= self.expires_at {
            self.finished = true;
            step.finished = true;
            return step;
        }

        if self.resting {
            return step;
        }

        self.velocity += Vec3::NEG_Y * GRAVITY * self.settings.gravity_multiplier * dt;
        let next = self.position + self.velocity * dt;
        let segment = next - self.position;
        let length = segment.length();
        let Some(ray) = Ray::new(self.position, segment).filter(|_| length > f32::EPSILON) else {
            return step;
        };

        match self.kind {
            ProjectileKind::Bullet => self.sweep_bullet(now, ray, length, next, world, &mut step),
            ProjectileKind::Grenade { .. } => self.sweep_grenade(ray, length, next, world),
        }
        step.finished = self.finished;
        step
    }

    fn sweep_bullet(
        &mut self,
        now: f64,
        ray: Ray,
        length: f32,
        next: Vec3,
        world: &dyn PhysicsWorld,
        step: &mut ProjectileStep,
    ) {
        let trace = if self.settings.penetration_enabled {
            trace_penetrating(world, &self.settings, self.source.attacker, ray, length, self.budget, self.travelled)
        } else {
            trace_single(world, &self.settings, self.source.attacker, ray, length, self.travelled)
        };
        self.budget = trace.remaining_budget;

        let stopped_at = trace.impacts.last().and_then(|last| {
            let exhausted = self.settings.penetration_enabled && last.penetrated && self.budget == 0;
            (!last.penetrated || exhausted).then_some(last.point)
        });
        step.impacts = trace.impacts;

        match stopped_at {
            Some(point) => {
                self.position = point;
                self.velocity = Vec3::ZERO;
                if self.settings.stick_after_death && self.settings.stick_duration > 0.0 {
                    self.stuck_until = Some(now + self.settings.stick_duration as f64);
                } else {
                    self.finished = true;
                }
            }
            None => {
                self.travelled += length;
                self.position = next;
            }
        }
    }

    fn sweep_grenade(&mut self, ray: Ray, length: f32, next: Vec3, world: &dyn PhysicsWorld) {
        let hits = world.raycast_all(ray, length, self.settings.hit_mask);
        match nearest_valid(hits, self.source.attacker, &[]) {
            Some(hit) => {
                // comes to rest on first contact and waits for the fuse
                self.position = hit.point + hit.normal * 0.05;
                self.velocity = Vec3::ZERO;
                self.resting = true;
            }
            None => self.position = next,
        }
    }

    fn explode(&self, explosion: &Explosion, world: &dyn PhysicsWorld) -> Vec<Impact> {
        world
            .overlap_sphere(self.position, explosion.radius, explosion.mask)
            .into_iter()
            .filter(|overlap| overlap.collider.target.is_some())
            .map(|overlap| {
                let normal = (overlap.closest - self.position).normalize_or(Vec3::Y);
                Impact {
                    collider: overlap.collider.id,
                    target: overlap.collider.target,
                    point: overlap.closest,
                    normal,
                    surface: overlap.collider.surface,
                    distance: overlap.distance,
                    damage: explosion.damage_at(overlap.distance),
                    penetrated: false,
                }
            })
            .collect()
    }
}

/// Impacts from one projectile with the damage they carry
#[derive(Debug, Clone)]
pub struct ProjectileReport {
    pub source: ShotSource,
    pub impacts: Vec<Impact>,
    pub damage: Vec<DamageRequest>,
}

/// Owns every projectile in flight for one session
#[derive(Debug, Default)]
pub struct ProjectileSystem {
    projectiles: Vec<Projectile>,
}

impl ProjectileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, projectile: Projectile) {
        self.projectiles.push(projectile);
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter()
    }

    /// Step every projectile, release finished ones back to the pool
    pub fn step_all(
        &mut self,
        now: f64,
        dt: f32,
        world: &dyn PhysicsWorld,
        pool: &mut dyn ObjectPool,
    ) -> Vec<ProjectileReport> {
        let mut reports = Vec::new();
        for projectile in &mut self.projectiles {
            let step = projectile.step(now, dt, world);
            if !step.impacts.is_empty() {
                let source = ShotSource {
                    direction: projectile.velocity.normalize_or(projectile.source.direction),
                    ..projectile.source
                };
                let damage = step
                    .impacts
                    .iter()
                    .filter_map(|impact| projectile.source.request_for(impact))
                    .collect();
                reports.push(ProjectileReport {
                    source,
                    impacts: step.impacts,
                    damage,
                });
            }
        }

        self.projectiles.retain(|projectile| {
            if projectile.is_finished() {
                debug!(handle = projectile.handle.0, "Projectile returned to pool");
                pool.release(projectile.handle);
                false
            } else {
                true
            }
        });

        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::physics::{ColliderInfo, CollisionWorld, Shape};
    use crate::hit::pool::HandlePool;
    use glam::Quat;
    use uuid::Uuid;

    fn source(direction: Vec3) -> ShotSource {
        ShotSource {
            attacker: Uuid::new_v4(),
            attacker_is_bot: false,
            weapon_id: 2,
            position: Vec3::ZERO,
            direction,
            force: 5.0,
        }
    }

    fn flat_settings() -> Arc<BulletSimulationSettings> {
        Arc::new(BulletSimulationSettings {
            damage: 20.0,
            speed: 100.0,
            gravity_multiplier: 0.0,
            life_time: 1.0,
            ..BulletSimulationSettings::default()
        })
    }

    #[test]
    fn bullet_hits_target_and_returns_to_pool() {
        let target = Uuid::new_v4();
        let mut world = CollisionWorld::new();
        world.insert(
            Shape::cuboid(Vec3::new(5.0, 0.0, 0.0), Vec3::splat(0.5)),
            ColliderInfo::solid(0).with_target(target),
        );
        let mut pool = HandlePool::new();
        let handle = pool.acquire(1, Vec3::ZERO, Quat::IDENTITY);
        let mut system = ProjectileSystem::new();
        system.spawn(Projectile::bullet(handle, source(Vec3::X), flat_settings(), 0.0));

        let dt = 1.0 / 60.0;
        let mut reports = Vec::new();
        for i in 1..=10 {
            reports.extend(system.step_all(i as f64 * dt as f64, dt, &world, &mut pool));
        }
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].damage.len(), 1);
        assert_eq!(reports[0].damage[0].target, target);
        assert!(system.is_empty());
        assert!(!pool.is_live(handle));
    }

    #[test]
    fn bullet_expires_after_life_time() {
        let world = CollisionWorld::new();
        let mut pool = HandlePool::new();
        let handle = pool.acquire(1, Vec3::ZERO, Quat::IDENTITY);
        let mut system = ProjectileSystem::new();
        system.spawn(Projectile::bullet(handle, source(Vec3::X), flat_settings(), 0.0));

        assert!(system.step_all(0.5, 0.1, &world, &mut pool).is_empty());
        assert_eq!(system.len(), 1);
        system.step_all(1.0, 0.1, &world, &mut pool);
        assert!(system.is_empty());
        assert_eq!(pool.released_count(), 1);
    }

    #[test]
    fn sticky_bullet_lingers_before_release() {
        let mut world = CollisionWorld::new();
        world.insert(Shape::cuboid(Vec3::new(1.0, 0.0, 0.0), Vec3::splat(0.5)), ColliderInfo::solid(0));
        let settings = Arc::new(BulletSimulationSettings {
            stick_after_death: true,
            stick_duration: 2.0,
            ..(*flat_settings()).clone()
        });
        let mut projectile = Projectile::bullet(PoolHandle(1), source(Vec3::X), settings, 0.0);
        let step = projectile.step(0.1, 0.1, &world);
        assert_eq!(step.impacts.len(), 1);
        assert!(projectile.is_stuck());
        assert!(!projectile.step(1.0, 0.1, &world).finished);
        assert!(projectile.step(2.2, 0.1, &world).finished);
    }

    #[test]
    fn grenade_explodes_on_fuse() {
        let near = Uuid::new_v4();
        let far = Uuid::new_v4();
        let mut world = CollisionWorld::new();
        world.insert(
            Shape::Sphere { center: Vec3::new(2.0, 0.0, 0.0), radius: 0.5 },
            ColliderInfo::solid(0).with_target(near),
        );
        world.insert(
            Shape::Sphere { center: Vec3::new(40.0, 0.0, 0.0), radius: 0.5 },
            ColliderInfo::solid(0).with_target(far),
        );
        let explosion = Explosion {
            radius: 6.0,
            damage: 100.0,
            force: 20.0,
            mask: HitMask::all(),
        };
        let mut grenade = Projectile::grenade(
            PoolHandle(7),
            source(Vec3::X),
            Vec3::ZERO,
            flat_settings(),
            1.5,
            explosion,
        );
        assert!(grenade.step(1.0, 0.1, &world).impacts.is_empty());
        let step = grenade.step(1.5, 0.1, &world);
        assert!(step.finished);
        assert_eq!(step.impacts.len(), 1);
        assert_eq!(step.impacts[0].target, Some(near));
        assert!(step.impacts[0].damage > 0.0 && step.impacts[0].damage < 100.0);
    }
}
