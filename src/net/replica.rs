//! Replica-side mirror of another actor's weapons

use tracing::{debug, trace};

use crate::error::LoadoutError;
use crate::hit::physics::ActorId;
use crate::weapons::behavior::{Role, WeaponContext};
use crate::weapons::catalog::{Loadout, WeaponCatalog};
use crate::weapons::input::WeaponInput;
use crate::weapons::manager::WeaponManager;
use crate::weapons::slot;

use super::events::{DiscreteEvent, PeriodicState};

/// Applies an owner's discrete events and periodic blocks to a local
/// replica manager. Duplicate or stale frames are dropped.
#[derive(Debug)]
pub struct Replica {
    actor: ActorId,
    manager: WeaponManager,
    last_seq: Option<u32>,
    last_periodic_tick: Option<u64>,
    input: WeaponInput,
}

impl Replica {
    pub fn new(actor: ActorId, manager: WeaponManager) -> Self {
        debug_assert_eq!(manager.role(), Role::Replica);
        Self {
            actor,
            manager,
            last_seq: None,
            last_periodic_tick: None,
            input: WeaponInput::default(),
        }
    }

    pub fn from_loadout(actor: ActorId, loadout: &Loadout, catalog: &WeaponCatalog) -> Result<Self, LoadoutError> {
        Ok(Self::new(actor, WeaponManager::from_loadout(loadout, catalog, Role::Replica)?))
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn manager(&self) -> &WeaponManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut WeaponManager {
        &mut self.manager
    }

    pub fn last_seq(&self) -> Option<u32> {
        self.last_seq
    }

    /// Input reconstructed from the last periodic block
    pub fn input(&self) -> &WeaponInput {
        &self.input
    }

    fn is_new_seq(&self, seq: u32) -> bool {
        match self.last_seq {
            None => true,
            // wrapping comparison
            Some(last) => (seq.wrapping_sub(last) as i32) > 0,
        }
    }

    /// Apply one discrete event. Returns false when it was dropped.
    pub fn apply_event(&mut self, event: &DiscreteEvent, ctx: &mut WeaponContext<'_>) -> bool {
        if event.actor != self.actor {
            return false;
        }
        if !self.is_new_seq(event.seq) {
            trace!(actor_id = %self.actor, seq = event.seq, "Dropping duplicate event");
            return false;
        }
        self.last_seq = Some(event.seq);
        ctx.input = self.input.clone();
        self.manager.apply_event(event, ctx);
        true
    }

    /// Apply a periodic block. Returns false when it is older than the last one.
    pub fn apply_periodic(&mut self, state: &PeriodicState) -> bool {
        if state.actor != self.actor {
            return false;
        }
        if self.last_periodic_tick.is_some_and(|tick| state.tick <= tick) {
            debug!(actor_id = %self.actor, tick = state.tick, "Dropping stale periodic state");
            return false;
        }
        self.last_periodic_tick = Some(state.tick);
        self.manager.apply_periodic(state);

        let current = self.manager.current_weapon();
        let current_periodic = slot::refs(self.manager.slots())
            .position(|r| r == current)
            .and_then(|i| state.weapons.get(i))
            .copied()
            .unwrap_or_default();
        self.input = WeaponInput {
            fire: current_periodic.firing,
            aim: current_periodic.aiming,
            origin: state.aim_origin,
            aim_rotation: state.aim_rotation,
            ..WeaponInput::default()
        };
        true
    }

    /// Advance the replica one tick with the reconstructed input
    pub fn update(&mut self, ctx: &mut WeaponContext<'_>) {
        ctx.input = self.input.clone();
        self.manager.update(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::events::{WeaponEvent, WeaponPeriodic};
    use crate::weapons::catalog::{LoadoutWeapon, PISTOL, RIFLE};
    use crate::weapons::slot::WeaponRef;
    use crate::weapons::testing::Bench;
    use glam::{Quat, Vec3};

    fn replica(actor: ActorId) -> Replica {
        let loadout = Loadout::from_slots(vec![
            vec![LoadoutWeapon::new(RIFLE).with_ammo(30, 90)],
            vec![LoadoutWeapon::new(PISTOL)],
        ]);
        Replica::from_loadout(actor, &loadout, &WeaponCatalog::builtin()).unwrap()
    }

    fn periodic(actor: ActorId, tick: u64, firing: bool) -> PeriodicState {
        PeriodicState {
            actor,
            tick,
            desired: WeaponRef::new(0, 0),
            quick_use_desired: WeaponRef::default(),
            quick_use_in_progress: false,
            release_observed: false,
            aim_origin: Vec3::new(0.0, 1.5, 0.0),
            aim_rotation: Quat::IDENTITY,
            weapons: vec![
                WeaponPeriodic {
                    firing,
                    aiming: false,
                    magazine: 20,
                    reserve: 90,
                },
                WeaponPeriodic::default(),
            ],
        }
    }

    #[test]
    fn duplicate_and_stale_events_are_dropped() {
        let mut bench = Bench::new(5);
        bench.role = Role::Replica;
        let mut replica = replica(bench.actor);
        let ev = DiscreteEvent {
            actor: bench.actor,
            seq: 10,
            tick: 3,
            weapon: WeaponRef::new(0, 0),
            event: WeaponEvent::ReloadPhase { phase: 1, empty: false },
        };
        assert!(replica.apply_event(&ev, &mut bench.context(0.0)));
        assert!(!replica.apply_event(&ev, &mut bench.context(0.0)));
        let older = DiscreteEvent { seq: 9, ..ev.clone() };
        assert!(!replica.apply_event(&older, &mut bench.context(0.0)));
        assert_eq!(replica.last_seq(), Some(10));

        let rifle = replica.manager().weapon(WeaponRef::new(0, 0)).unwrap();
        assert!(rifle.runtime.as_gun().unwrap().is_reloading());
    }

    #[test]
    fn sequence_comparison_survives_wrap() {
        let mut bench = Bench::new(5);
        bench.role = Role::Replica;
        let mut replica = replica(bench.actor);
        let mut ev = DiscreteEvent {
            actor: bench.actor,
            seq: u32::MAX,
            tick: 1,
            weapon: WeaponRef::new(0, 0),
            event: WeaponEvent::DryFire,
        };
        assert!(replica.apply_event(&ev, &mut bench.context(0.0)));
        ev.seq = 0;
        assert!(replica.apply_event(&ev, &mut bench.context(0.0)));
    }

    #[test]
    fn periodic_drives_reconstructed_input() {
        let actor = uuid::Uuid::new_v4();
        let mut replica = replica(actor);
        assert!(replica.apply_periodic(&periodic(actor, 5, true)));
        assert!(replica.input().fire);
        assert_eq!(replica.input().origin, Vec3::new(0.0, 1.5, 0.0));
        assert!(!replica.apply_periodic(&periodic(actor, 5, false)));
        assert!(replica.input().fire);

        let rifle = replica.manager().weapon(WeaponRef::new(0, 0)).unwrap();
        assert_eq!(rifle.runtime.as_gun().unwrap().magazine, 20);
    }

    #[test]
    fn frames_for_other_actors_are_ignored() {
        let mut replica = replica(uuid::Uuid::new_v4());
        assert!(!replica.apply_periodic(&periodic(uuid::Uuid::new_v4(), 1, false)));
    }
}
