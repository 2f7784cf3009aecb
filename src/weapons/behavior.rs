//! Stateless weapon behaviors and the per-player runtime state they drive

use std::fmt;

use rand_chacha::ChaCha8Rng;

use crate::config::SimFlags;
use crate::hit::physics::{ActorId, PhysicsWorld};
use crate::hit::pool::ObjectPool;
use crate::hit::projectile::ProjectileSystem;
use crate::net::events::{Outbox, WeaponEvent, WeaponPeriodic};

use super::env::Movement;
use super::grenade::GrenadeState;
use super::gun::GunState;
use super::input::WeaponInput;
use super::melee::MeleeState;
use super::slot::WeaponRef;

/// Which simulation drives the weapons of an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Decides fire, reload, switch and quick-use from input
    Owner,
    /// Mirrors the owner from discrete events and periodic state
    Replica,
}

/// Per-player mutable state of one weapon instance
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeState {
    Gun(GunState),
    Melee(MeleeState),
    Grenade(GrenadeState),
    Unselectable,
}

impl RuntimeState {
    pub fn as_gun(&self) -> Option<&GunState> {
        match self {
            RuntimeState::Gun(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_gun_mut(&mut self) -> Option<&mut GunState> {
        match self {
            RuntimeState::Gun(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_melee_mut(&mut self) -> Option<&mut MeleeState> {
        match self {
            RuntimeState::Melee(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_grenade(&self) -> Option<&GrenadeState> {
        match self {
            RuntimeState::Grenade(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_grenade_mut(&mut self) -> Option<&mut GrenadeState> {
        match self {
            RuntimeState::Grenade(state) => Some(state),
            _ => None,
        }
    }
}

/// Coarse weapon status exposed to HUD and AI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeaponStatus {
    pub ready: bool,
    pub reloading: bool,
    pub empty: bool,
}

/// Starting ammo for a fresh runtime state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmmoGrant {
    pub magazine: Option<u32>,
    pub reserve: Option<u32>,
}

/// Everything a behavior may touch during one call
pub struct WeaponContext<'a> {
    pub actor: ActorId,
    pub is_bot: bool,
    pub role: Role,
    /// This simulation computes damage for the actor's shots
    pub resolve_hits: bool,
    pub now: f64,
    pub dt: f32,
    pub flags: SimFlags,
    pub input: WeaponInput,
    pub motion: &'a dyn Movement,
    pub world: &'a dyn PhysicsWorld,
    pub pool: &'a mut dyn ObjectPool,
    pub projectiles: &'a mut ProjectileSystem,
    pub rng: &'a mut ChaCha8Rng,
    pub out: &'a mut Outbox,
    /// Weapon being driven, set by the manager before each call
    pub weapon: WeaponRef,
    pub catalog_id: i32,
}

impl WeaponContext<'_> {
    pub fn emit(&mut self, event: WeaponEvent) {
        self.out.emit(self.weapon, event);
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}

/// Shared, stateless weapon logic.
///
/// Every method receives the runtime state explicitly. A runtime state of the
/// wrong category is a local no-op returning the default value.
pub trait WeaponBehavior: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn create_runtime(&self, grant: AmmoGrant) -> RuntimeState;

    /// Whether the player can switch to this weapon
    fn selectable(&self) -> bool {
        true
    }

    fn draw_time(&self) -> f32;

    fn putaway_time(&self) -> f32;

    /// Draw started
    fn on_draw(&self, _state: &mut RuntimeState, _ctx: &mut WeaponContext<'_>) {}

    /// Putaway finished; transient state such as aim or a reload is dropped
    fn on_putaway(&self, _state: &mut RuntimeState, _ctx: &mut WeaponContext<'_>) {}

    /// Normal per-tick update while this weapon is current and ready
    fn update(&self, state: &mut RuntimeState, ctx: &mut WeaponContext<'_>);

    fn status(&self, state: &RuntimeState) -> WeaponStatus;

    fn sensitivity(&self, _state: &RuntimeState) -> f32 {
        1.0
    }

    fn speed_multiplier(&self, _state: &RuntimeState) -> f32 {
        1.0
    }

    fn supports_quick_use(&self, _state: &RuntimeState) -> bool {
        false
    }

    /// Quick use of this weapon starts without putting the current one away
    fn skip_quick_use_putaway(&self) -> bool {
        false
    }

    /// Quick use waits for the button to be released
    fn quick_use_requires_release(&self) -> bool {
        false
    }

    /// Returns the begin duration in seconds
    fn begin_quick_use(&self, _state: &mut RuntimeState, _ctx: &mut WeaponContext<'_>) -> f32 {
        0.0
    }

    fn update_quick_use(&self, _state: &mut RuntimeState, _ctx: &mut WeaponContext<'_>) {}

    /// Returns the end duration in seconds
    fn end_quick_use(&self, _state: &mut RuntimeState, _ctx: &mut WeaponContext<'_>) -> f32 {
        0.0
    }

    /// Mirror an owner event on a replica
    fn apply_event(&self, _state: &mut RuntimeState, _event: &WeaponEvent, _ctx: &mut WeaponContext<'_>) {}

    fn periodic(&self, _state: &RuntimeState) -> WeaponPeriodic {
        WeaponPeriodic::default()
    }

    fn apply_periodic(&self, _state: &mut RuntimeState, _periodic: &WeaponPeriodic) {}

    /// Refill reserve ammo to the configured maximum
    fn restock(&self, _state: &mut RuntimeState) {}

    /// Ammo carried over when the weapon is dropped
    fn ammo(&self, _state: &RuntimeState) -> AmmoGrant {
        AmmoGrant::default()
    }
}
