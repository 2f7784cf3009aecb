//! Shared harness for scenario tests: one actor's weapons on a fixed clock

#![allow(dead_code)]

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use arsenal_server::config::SimFlags;
use arsenal_server::hit::{CollisionWorld, HandlePool, ProjectileSystem};
use arsenal_server::net::events::{DiscreteEvent, Outbox, WeaponEvent};
use arsenal_server::net::Replica;
use arsenal_server::util::time::SimClock;
use arsenal_server::weapons::catalog::{Loadout, LoadoutWeapon, WeaponCatalog};
use arsenal_server::weapons::{
    MotionSample, Role, RuntimeState, WeaponBehavior, WeaponContext, WeaponInput, WeaponManager, WeaponRef,
};

pub const TICK_RATE: u32 = 60;

pub struct Sim {
    pub actor: Uuid,
    pub role: Role,
    pub resolve_hits: bool,
    pub flags: SimFlags,
    pub clock: SimClock,
    pub motion: MotionSample,
    pub world: CollisionWorld,
    pub pool: HandlePool,
    pub projectiles: ProjectileSystem,
    pub rng: ChaCha8Rng,
    pub out: Outbox,
    pub next_seq: u32,
}

impl Sim {
    pub fn new(seed: u64) -> Self {
        Self {
            actor: Uuid::new_v4(),
            role: Role::Owner,
            resolve_hits: true,
            flags: SimFlags::default(),
            clock: SimClock::new(TICK_RATE),
            motion: MotionSample::default(),
            world: CollisionWorld::new(),
            pool: HandlePool::new(),
            projectiles: ProjectileSystem::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            out: Outbox::new(),
            next_seq: 0,
        }
    }

    pub fn replica_of(owner: &Sim, seed: u64) -> Self {
        Self {
            actor: owner.actor,
            role: Role::Replica,
            resolve_hits: false,
            flags: owner.flags,
            ..Self::new(seed)
        }
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn context(&mut self, input: &WeaponInput) -> WeaponContext<'_> {
        WeaponContext {
            actor: self.actor,
            is_bot: false,
            role: self.role,
            resolve_hits: self.resolve_hits,
            now: self.clock.now(),
            dt: self.clock.dt(),
            flags: self.flags,
            input: input.clone(),
            motion: &self.motion,
            world: &self.world,
            pool: &mut self.pool,
            projectiles: &mut self.projectiles,
            rng: &mut self.rng,
            out: &mut self.out,
            weapon: WeaponRef::default(),
            catalog_id: 0,
        }
    }

    /// Advance one tick and update the manager
    pub fn tick(&mut self, manager: &mut WeaponManager, input: &WeaponInput) {
        self.clock.advance();
        let mut ctx = self.context(input);
        manager.update(&mut ctx);
    }

    pub fn ticks(&mut self, manager: &mut WeaponManager, input: &WeaponInput, count: usize) {
        for _ in 0..count {
            self.tick(manager, input);
        }
    }

    /// Advance one tick and update a single behavior directly
    pub fn tick_behavior(&mut self, behavior: &dyn WeaponBehavior, runtime: &mut RuntimeState, input: &WeaponInput) {
        self.clock.advance();
        let mut ctx = self.context(input);
        behavior.update(runtime, &mut ctx);
    }

    /// Advance one tick on a replica mirror
    pub fn tick_replica(&mut self, replica: &mut Replica) {
        self.clock.advance();
        let input = replica.input().clone();
        let mut ctx = self.context(&input);
        replica.update(&mut ctx);
    }

    /// Stamp everything emitted so far
    pub fn take_events(&mut self) -> Vec<DiscreteEvent> {
        let tick = self.clock.tick();
        self.out.stamp(self.actor, tick, &mut self.next_seq)
    }

    pub fn count(&self, pred: impl Fn(&WeaponEvent) -> bool) -> usize {
        self.out.events.iter().filter(|(_, e)| pred(e)).count()
    }

    pub fn fire_events(&self) -> usize {
        self.count(|e| matches!(e, WeaponEvent::Fire { .. }))
    }
}

pub fn fire() -> WeaponInput {
    WeaponInput {
        fire: true,
        ..WeaponInput::default()
    }
}

pub fn reload() -> WeaponInput {
    WeaponInput {
        reload: true,
        ..WeaponInput::default()
    }
}

pub fn idle() -> WeaponInput {
    WeaponInput::default()
}

pub fn manager_with(catalog: &WeaponCatalog, slots: Vec<Vec<LoadoutWeapon>>, role: Role) -> WeaponManager {
    WeaponManager::from_loadout(&Loadout::from_slots(slots), catalog, role).expect("valid loadout")
}

/// Magazine and reserve of a gun instance
pub fn ammo(manager: &WeaponManager, r: WeaponRef) -> (u32, u32) {
    let gun = manager
        .weapon(r)
        .and_then(|w| w.runtime.as_gun())
        .expect("gun at ref");
    (gun.magazine, gun.reserve)
}
