//! Replication payloads: discrete one-shot events, periodic state and the
//! per-tick outbox the weapon machines write into

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::hit::damage::DamageRequest;
use crate::hit::physics::{ActorId, SurfaceTag, TargetId};
use crate::weapons::slot::WeaponRef;

/// One discrete state transition of a weapon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WeaponEvent {
    /// Accepted shot; `directions` holds one entry per pellet
    Fire {
        last_round: bool,
        origin: Vec3,
        directions: Vec<Vec3>,
    },
    DryFire,
    BurstBegin { count: u8 },
    BoltCycled { last_round: bool },
    /// Reload episode phase; phase 0 ends or cancels the episode
    ReloadPhase { phase: u8, empty: bool },
    ProceduralStage { stage: u8 },
    FireModeChanged { mode_index: u8 },
    /// Resolved impact, broadcast by whoever computed the hit
    Impact {
        point: Vec3,
        normal: Vec3,
        surface: SurfaceTag,
        target: Option<TargetId>,
        damage: f32,
    },
    MeleeStrike { quick: bool },
    GrenadePinPulled,
    GrenadeThrown { origin: Vec3, velocity: Vec3 },
}

impl WeaponEvent {
    /// Wire tag of the variant
    pub fn tag(&self) -> u8 {
        match self {
            WeaponEvent::Fire { .. } => 1,
            WeaponEvent::DryFire => 2,
            WeaponEvent::BurstBegin { .. } => 3,
            WeaponEvent::BoltCycled { .. } => 4,
            WeaponEvent::ReloadPhase { .. } => 5,
            WeaponEvent::ProceduralStage { .. } => 6,
            WeaponEvent::FireModeChanged { .. } => 7,
            WeaponEvent::Impact { .. } => 8,
            WeaponEvent::MeleeStrike { .. } => 9,
            WeaponEvent::GrenadePinPulled => 10,
            WeaponEvent::GrenadeThrown { .. } => 11,
        }
    }
}

/// A weapon event stamped for transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteEvent {
    pub actor: ActorId,
    /// Per-actor sequence number, strictly increasing
    pub seq: u32,
    pub tick: u64,
    pub weapon: WeaponRef,
    pub event: WeaponEvent,
}

/// Periodic per-weapon mirror
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponPeriodic {
    pub firing: bool,
    pub aiming: bool,
    pub magazine: u32,
    pub reserve: u32,
}

/// Periodic state block for one actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicState {
    pub actor: ActorId,
    pub tick: u64,
    pub desired: WeaponRef,
    pub quick_use_desired: WeaponRef,
    pub quick_use_in_progress: bool,
    pub release_observed: bool,
    pub aim_origin: Vec3,
    pub aim_rotation: Quat,
    /// Flattened in slot order
    pub weapons: Vec<WeaponPeriodic>,
}

/// Local-only feedback that never crosses the wire
#[derive(Debug, Clone, PartialEq)]
pub enum Cosmetic {
    ShellEjected { weapon: WeaponRef },
    ImpactEffect { point: Vec3, normal: Vec3, surface: SurfaceTag },
}

/// Everything one actor's weapons produced during one tick
#[derive(Debug, Default)]
pub struct Outbox {
    pub events: Vec<(WeaponRef, WeaponEvent)>,
    pub damage: Vec<DamageRequest>,
    pub cosmetics: Vec<Cosmetic>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, weapon: WeaponRef, event: WeaponEvent) {
        self.events.push((weapon, event));
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.damage.is_empty() && self.cosmetics.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.damage.clear();
        self.cosmetics.clear();
    }

    /// Stamp the pending events with sequence numbers following `*next_seq`.
    ///
    /// `next_seq` holds the last number handed out and is left at the last one
    /// stamped here.
    pub fn stamp(&mut self, actor: ActorId, tick: u64, next_seq: &mut u32) -> Vec<DiscreteEvent> {
        self.events
            .drain(..)
            .map(|(weapon, event)| {
                *next_seq = next_seq.wrapping_add(1);
                DiscreteEvent {
                    actor,
                    seq: *next_seq,
                    tick,
                    weapon,
                    event,
                }
            })
            .collect()
    }
}
