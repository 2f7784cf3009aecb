//! Thrown grenades with a fuse

use std::sync::Arc;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hit::ballistics::BulletSimulationSettings;
use crate::hit::damage::ShotSource;
use crate::hit::physics::HitMask;
use crate::hit::pool::PrefabId;
use crate::hit::projectile::{Explosion, Projectile};
use crate::hit::spread::forward;
use crate::net::events::{WeaponEvent, WeaponPeriodic};
use crate::util::time::reached;

use super::behavior::{AmmoGrant, RuntimeState, WeaponBehavior, WeaponContext, WeaponStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrenadeSettings {
    pub name: String,
    pub max_count: u32,
    pub pin_pull_time: f32,
    pub throw_speed: f32,
    /// Extra upward launch speed
    pub throw_lift: f32,
    pub fuse_time: f32,
    pub gravity_multiplier: f32,
    pub radius: f32,
    pub damage: f32,
    pub force: f32,
    pub hit_mask: HitMask,
    pub prefab: PrefabId,
    pub throw_end_time: f32,
    pub draw_time: f32,
    pub putaway_time: f32,
}

impl Default for GrenadeSettings {
    fn default() -> Self {
        Self {
            name: "frag".to_string(),
            max_count: 2,
            pin_pull_time: 0.4,
            throw_speed: 15.0,
            throw_lift: 2.0,
            fuse_time: 3.0,
            gravity_multiplier: 1.0,
            radius: 6.0,
            damage: 120.0,
            force: 400.0,
            hit_mask: HitMask::all(),
            prefab: 0,
            throw_end_time: 0.35,
            draw_time: 0.4,
            putaway_time: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrenadeState {
    pub count: u32,
    /// Time the pin was pulled, `None` when idle
    pub pin_pulled_at: Option<f64>,
    pub throw_requested: bool,
    pub trigger_held: bool,
}

#[derive(Debug)]
pub struct Grenade {
    pub settings: GrenadeSettings,
    flight: Arc<BulletSimulationSettings>,
}

impl Grenade {
    pub fn new(settings: GrenadeSettings) -> Self {
        let flight = Arc::new(BulletSimulationSettings {
            damage: 0.0,
            gravity_multiplier: settings.gravity_multiplier,
            life_time: settings.fuse_time,
            hit_mask: HitMask::WORLD | HitMask::PROPS,
            ..BulletSimulationSettings::default()
        });
        Self { settings, flight }
    }

    fn pull_pin(&self, state: &mut GrenadeState, ctx: &mut WeaponContext<'_>) {
        state.pin_pulled_at = Some(ctx.now);
        state.throw_requested = false;
        ctx.emit(WeaponEvent::GrenadePinPulled);
    }

    fn throw(&self, state: &mut GrenadeState, ctx: &mut WeaponContext<'_>) {
        state.pin_pulled_at = None;
        state.throw_requested = false;
        if state.count == 0 {
            return;
        }
        state.count -= 1;

        let origin = ctx.input.origin;
        let direction = forward(ctx.input.aim_rotation);
        let velocity = direction * self.settings.throw_speed + Vec3::Y * self.settings.throw_lift;
        debug!(actor_id = %ctx.actor, remaining = state.count, "Grenade thrown");

        if ctx.resolve_hits {
            self.spawn(ctx, origin, velocity);
        }
        ctx.emit(WeaponEvent::GrenadeThrown { origin, velocity });
    }

    fn spawn(&self, ctx: &mut WeaponContext<'_>, origin: Vec3, velocity: Vec3) {
        let source = ShotSource {
            attacker: ctx.actor,
            attacker_is_bot: ctx.is_bot,
            weapon_id: ctx.catalog_id,
            position: origin,
            direction: velocity.normalize_or(Vec3::NEG_Z),
            force: self.settings.force,
        };
        let explosion = Explosion {
            radius: self.settings.radius,
            damage: self.settings.damage,
            force: self.settings.force,
            mask: self.settings.hit_mask,
        };
        let handle = ctx.pool.acquire(self.settings.prefab, origin, Quat::IDENTITY);
        ctx.projectiles.spawn(Projectile::grenade(
            handle,
            source,
            velocity,
            self.flight.clone(),
            ctx.now + self.settings.fuse_time as f64,
            explosion,
        ));
    }

    fn pin_ready(&self, state: &GrenadeState, now: f64) -> bool {
        state
            .pin_pulled_at
            .map(|at| reached(now, at + self.settings.pin_pull_time as f64))
            .unwrap_or(false)
    }
}

impl WeaponBehavior for Grenade {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn create_runtime(&self, grant: AmmoGrant) -> RuntimeState {
        RuntimeState::Grenade(GrenadeState {
            count: grant.magazine.unwrap_or(self.settings.max_count),
            pin_pulled_at: None,
            throw_requested: false,
            trigger_held: false,
        })
    }

    fn draw_time(&self) -> f32 {
        self.settings.draw_time
    }

    fn putaway_time(&self) -> f32 {
        self.settings.putaway_time
    }

    fn on_putaway(&self, state: &mut RuntimeState, _ctx: &mut WeaponContext<'_>) {
        if let Some(state) = state.as_grenade_mut() {
            // pin goes back in
            state.pin_pulled_at = None;
            state.throw_requested = false;
            state.trigger_held = false;
        }
    }

    fn update(&self, state: &mut RuntimeState, ctx: &mut WeaponContext<'_>) {
        let Some(state) = state.as_grenade_mut() else {
            return;
        };
        let pressed = ctx.input.fire && !state.trigger_held;
        let released = !ctx.input.fire && state.trigger_held;
        state.trigger_held = ctx.input.fire;
        if !ctx.is_owner() {
            return;
        }

        if state.pin_pulled_at.is_none() {
            if pressed && state.count > 0 && ctx.motion.can_fire() {
                self.pull_pin(state, ctx);
            }
            return;
        }
        if released {
            state.throw_requested = true;
        }
        if state.throw_requested && self.pin_ready(state, ctx.now) {
            self.throw(state, ctx);
        }
    }

    fn status(&self, state: &RuntimeState) -> WeaponStatus {
        state
            .as_grenade()
            .map(|state| WeaponStatus {
                ready: state.count > 0,
                reloading: false,
                empty: state.count == 0,
            })
            .unwrap_or_default()
    }

    fn supports_quick_use(&self, state: &RuntimeState) -> bool {
        state.as_grenade().map(|state| state.count > 0).unwrap_or(false)
    }

    fn quick_use_requires_release(&self) -> bool {
        true
    }

    fn begin_quick_use(&self, state: &mut RuntimeState, ctx: &mut WeaponContext<'_>) -> f32 {
        let Some(state) = state.as_grenade_mut() else {
            return 0.0;
        };
        if ctx.is_owner() {
            self.pull_pin(state, ctx);
        }
        self.settings.pin_pull_time
    }

    fn end_quick_use(&self, state: &mut RuntimeState, ctx: &mut WeaponContext<'_>) -> f32 {
        let Some(state) = state.as_grenade_mut() else {
            return 0.0;
        };
        if ctx.is_owner() && state.pin_pulled_at.is_some() {
            self.throw(state, ctx);
        }
        self.settings.throw_end_time
    }

    fn apply_event(&self, state: &mut RuntimeState, event: &WeaponEvent, ctx: &mut WeaponContext<'_>) {
        let Some(state) = state.as_grenade_mut() else {
            return;
        };
        match *event {
            WeaponEvent::GrenadePinPulled => state.pin_pulled_at = Some(ctx.now),
            WeaponEvent::GrenadeThrown { origin, velocity } => {
                state.pin_pulled_at = None;
                state.count = state.count.saturating_sub(1);
                if ctx.resolve_hits {
                    self.spawn(ctx, origin, velocity);
                }
            }
            _ => {}
        }
    }

    fn periodic(&self, state: &RuntimeState) -> WeaponPeriodic {
        state
            .as_grenade()
            .map(|state| WeaponPeriodic {
                firing: false,
                aiming: false,
                magazine: state.count,
                reserve: 0,
            })
            .unwrap_or_default()
    }

    fn apply_periodic(&self, state: &mut RuntimeState, periodic: &WeaponPeriodic) {
        if let Some(state) = state.as_grenade_mut() {
            state.count = periodic.magazine;
        }
    }

    fn restock(&self, state: &mut RuntimeState) {
        if let Some(state) = state.as_grenade_mut() {
            state.count = state.count.max(self.settings.max_count);
        }
    }

    fn ammo(&self, state: &RuntimeState) -> AmmoGrant {
        state
            .as_grenade()
            .map(|state| AmmoGrant {
                magazine: Some(state.count),
                reserve: None,
            })
            .unwrap_or_default()
    }
}
