//! Test bench for driving behaviors and managers without a session

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use crate::config::SimFlags;
use crate::hit::physics::{ActorId, CollisionWorld};
use crate::hit::pool::HandlePool;
use crate::hit::projectile::ProjectileSystem;
use crate::net::events::{Outbox, WeaponEvent};

use super::behavior::{Role, RuntimeState, WeaponBehavior, WeaponContext};
use super::env::MotionSample;
use super::input::WeaponInput;
use super::slot::WeaponRef;

pub struct Bench {
    pub actor: ActorId,
    pub role: Role,
    pub resolve_hits: bool,
    pub flags: SimFlags,
    pub dt: f32,
    pub input: WeaponInput,
    pub motion: MotionSample,
    pub world: CollisionWorld,
    pub pool: HandlePool,
    pub projectiles: ProjectileSystem,
    pub rng: ChaCha8Rng,
    pub out: Outbox,
}

impl Bench {
    pub fn new(seed: u64) -> Self {
        Self {
            actor: Uuid::new_v4(),
            role: Role::Owner,
            resolve_hits: true,
            flags: SimFlags::default(),
            dt: 1.0 / 60.0,
            input: WeaponInput::default(),
            motion: MotionSample::default(),
            world: CollisionWorld::new(),
            pool: HandlePool::new(),
            projectiles: ProjectileSystem::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            out: Outbox::new(),
        }
    }

    pub fn context(&mut self, now: f64) -> WeaponContext<'_> {
        WeaponContext {
            actor: self.actor,
            is_bot: false,
            role: self.role,
            resolve_hits: self.resolve_hits,
            now,
            dt: self.dt,
            flags: self.flags,
            input: self.input.clone(),
            motion: &self.motion,
            world: &self.world,
            pool: &mut self.pool,
            projectiles: &mut self.projectiles,
            rng: &mut self.rng,
            out: &mut self.out,
            weapon: WeaponRef::default(),
            catalog_id: 1,
        }
    }

    pub fn tick_fire(&mut self, behavior: &dyn WeaponBehavior, runtime: &mut RuntimeState, now: f64, fire: bool) {
        self.input.fire = fire;
        self.input.reload = false;
        let mut ctx = self.context(now);
        behavior.update(runtime, &mut ctx);
    }

    pub fn tick_reload(&mut self, behavior: &dyn WeaponBehavior, runtime: &mut RuntimeState, now: f64) {
        self.input.fire = false;
        self.input.reload = true;
        let mut ctx = self.context(now);
        behavior.update(runtime, &mut ctx);
        self.input.reload = false;
    }

    pub fn count(&self, pred: impl Fn(&WeaponEvent) -> bool) -> usize {
        self.out.events.iter().filter(|(_, e)| pred(e)).count()
    }

    pub fn seen(&self, pred: impl Fn(&WeaponEvent) -> bool) -> bool {
        self.count(pred) > 0
    }

    pub fn position(&self, pred: impl Fn(&WeaponEvent) -> bool) -> Option<usize> {
        self.out.events.iter().position(|(_, e)| pred(e))
    }

    pub fn fire_events(&self) -> usize {
        self.count(|e| matches!(e, WeaponEvent::Fire { .. }))
    }
}
