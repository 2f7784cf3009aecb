//! Per-player weapon manager: owns the slots and arbitrates switch and
//! quick-use over the current weapon

mod quick_use;
mod switch;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::SimFlags;
use crate::error::LoadoutError;
use crate::hit::physics::ActorId;
use crate::net::events::{DiscreteEvent, PeriodicState};

use super::behavior::{AmmoGrant, Role, RuntimeState, WeaponBehavior, WeaponContext, WeaponStatus};
use super::catalog::{Loadout, WeaponCatalog};
use super::env::GameRules;
use super::input::WeaponInput;
use super::slot::{self, WeaponInstance, WeaponRef, WeaponSlot, INJECTED_CATALOG_ID};

pub use quick_use::QuickUseState;
pub use switch::SwitchState;

/// Upper bound on slots and weapons per slot, both addressed by `u8`
pub const MAX_SLOTS: usize = 16;
pub const MAX_WEAPONS_PER_SLOT: usize = 16;

pub type InteractableId = u64;

/// A weapon left behind by a dying actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedWeapon {
    pub catalog_id: i32,
    pub attachments: Vec<u32>,
    pub magazine: Option<u32>,
    pub reserve: Option<u32>,
}

impl DroppedWeapon {
    fn from_instance(instance: &WeaponInstance) -> Self {
        let ammo = instance.behavior.ammo(&instance.runtime);
        Self {
            catalog_id: instance.catalog_id,
            attachments: instance.attachments.clone(),
            magazine: ammo.magazine,
            reserve: ammo.reserve,
        }
    }
}

#[derive(Debug)]
pub struct WeaponManager {
    role: Role,
    slots: Vec<WeaponSlot>,
    current: WeaponRef,
    desired: WeaponRef,
    switch: SwitchState,
    quick: QuickUseState,
    /// Held-last-tick state of the owner's buttons
    slot_edges: Vec<bool>,
    quick_edges: Vec<bool>,
    next_held: bool,
    previous_held: bool,
    holding: Option<InteractableId>,
    /// Current weapon is put away and must be redrawn before use
    stowed: bool,
}

impl WeaponManager {
    /// Build a manager over prepared slots, selecting the first selectable weapon
    pub fn new(slots: Vec<WeaponSlot>, role: Role) -> Result<Self, LoadoutError> {
        if slots.is_empty() {
            return Err(LoadoutError::EmptyLoadout);
        }
        if slots.len() > MAX_SLOTS {
            return Err(LoadoutError::TooLarge {
                what: "slots",
                max: MAX_SLOTS,
            });
        }
        for (i, slot) in slots.iter().enumerate() {
            if slot.is_empty() {
                return Err(LoadoutError::EmptySlot(i));
            }
            if slot.len() > MAX_WEAPONS_PER_SLOT {
                return Err(LoadoutError::TooLarge {
                    what: "weapons per slot",
                    max: MAX_WEAPONS_PER_SLOT,
                });
            }
        }
        let first = slot::refs(&slots)
            .find(|r| slot::is_selectable(&slots, *r))
            .ok_or(LoadoutError::NoSelectableWeapon)?;

        let count = slots.len();
        Ok(Self {
            role,
            slots,
            current: first,
            desired: first,
            switch: SwitchState::default(),
            quick: QuickUseState::default(),
            slot_edges: vec![false; count],
            quick_edges: vec![false; count],
            next_held: false,
            previous_held: false,
            holding: None,
            stowed: false,
        })
    }

    /// Resolve a loadout against the catalog
    pub fn from_loadout(loadout: &Loadout, catalog: &WeaponCatalog, role: Role) -> Result<Self, LoadoutError> {
        let mut slots = Vec::with_capacity(loadout.slots.len());
        for entry in &loadout.slots {
            let mut weapons = Vec::with_capacity(entry.weapons.len());
            for weapon in &entry.weapons {
                let behavior = catalog.get(weapon.catalog_id)?;
                let grant = AmmoGrant {
                    magazine: weapon.magazine,
                    reserve: weapon.reserve,
                };
                weapons.push(WeaponInstance::new(behavior, weapon.catalog_id, weapon.attachments.clone(), grant));
            }
            slots.push(WeaponSlot::new(weapons));
        }
        Self::new(slots, role)
    }

    /// Append a slot owned by an external system. Returns its index.
    pub fn inject_slot(&mut self, behaviors: Vec<Arc<dyn WeaponBehavior>>) -> Result<u8, LoadoutError> {
        if self.slots.len() >= MAX_SLOTS {
            return Err(LoadoutError::TooLarge {
                what: "slots",
                max: MAX_SLOTS,
            });
        }
        if behaviors.is_empty() {
            return Err(LoadoutError::EmptySlot(self.slots.len()));
        }
        let weapons = behaviors
            .into_iter()
            .map(|behavior| WeaponInstance::new(behavior, INJECTED_CATALOG_ID, Vec::new(), AmmoGrant::default()))
            .collect();
        self.slots.push(WeaponSlot::injected(weapons));
        self.slot_edges.push(false);
        self.quick_edges.push(false);
        Ok((self.slots.len() - 1) as u8)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn slots(&self) -> &[WeaponSlot] {
        &self.slots
    }

    pub fn weapon(&self, r: WeaponRef) -> Option<&WeaponInstance> {
        slot::get(&self.slots, r)
    }

    pub fn weapon_mut(&mut self, r: WeaponRef) -> Option<&mut WeaponInstance> {
        slot::get_mut(&mut self.slots, r)
    }

    pub fn current_weapon(&self) -> WeaponRef {
        self.current
    }

    pub fn desired_weapon(&self) -> WeaponRef {
        self.desired
    }

    pub fn current_instance(&self) -> Option<&WeaponInstance> {
        slot::get(&self.slots, self.current)
    }

    /// Request a switch. Refused for unknown or unselectable weapons.
    pub fn set_desired_weapon(&mut self, r: WeaponRef) -> bool {
        if !slot::is_selectable(&self.slots, r) {
            warn!(weapon = %r, "Refusing switch to unselectable weapon");
            return false;
        }
        self.desired = r;
        true
    }

    pub fn is_switching(&self) -> bool {
        self.switch.active
    }

    pub fn switch_state(&self) -> SwitchState {
        self.switch
    }

    pub fn is_quick_using(&self) -> bool {
        self.quick.active.is_some()
    }

    pub fn quick_use_state(&self) -> QuickUseState {
        self.quick
    }

    pub fn holding(&self) -> Option<InteractableId> {
        self.holding
    }

    /// Status of the current weapon; not ready while anything owns the transform
    pub fn weapon_state(&self) -> WeaponStatus {
        let Some(instance) = self.current_instance() else {
            return WeaponStatus::default();
        };
        let mut status = instance.behavior.status(&instance.runtime);
        if self.switch.active || self.is_quick_using() || self.stowed || self.holding.is_some() {
            status.ready = false;
        }
        status
    }

    pub fn sensitivity(&self) -> f32 {
        if self.transform_busy() {
            return 1.0;
        }
        self.current_instance()
            .map(|w| w.behavior.sensitivity(&w.runtime))
            .unwrap_or(1.0)
    }

    pub fn speed_multiplier(&self) -> f32 {
        if self.transform_busy() {
            return 1.0;
        }
        self.current_instance()
            .map(|w| w.behavior.speed_multiplier(&w.runtime))
            .unwrap_or(1.0)
    }

    fn transform_busy(&self) -> bool {
        self.switch.active || self.is_quick_using() || self.stowed || self.holding.is_some()
    }

    /// Refill reserves of every instance of `catalog_id`. Returns how many were restocked.
    pub fn restock_ammo(&mut self, catalog_id: i32) -> usize {
        let mut restocked = 0;
        for slot in &mut self.slots {
            for weapon in slot.weapons.iter_mut().filter(|w| w.catalog_id == catalog_id) {
                weapon.behavior.restock(&mut weapon.runtime);
                restocked += 1;
            }
        }
        restocked
    }

    /// Suspend weapon use while an interactable is held
    pub fn hold_interactable(&mut self, id: InteractableId) {
        debug!(interactable = id, "Holding interactable");
        self.holding = Some(id);
    }

    pub fn release_interactable(&mut self) -> Option<InteractableId> {
        self.holding.take()
    }

    /// Weapons left behind on death, empty when the rules forbid dropping
    pub fn drop_weapons(&self, rules: &dyn GameRules, flags: SimFlags) -> Vec<DroppedWeapon> {
        if !flags.allow_weapon_drop || !rules.can_drop_weapons() {
            return Vec::new();
        }
        self.slots
            .iter()
            .filter(|slot| !slot.injected)
            .flat_map(|slot| slot.weapons.iter())
            .filter(|w| w.catalog_id != INJECTED_CATALOG_ID && w.selectable())
            .map(DroppedWeapon::from_instance)
            .collect()
    }

    /// Replace the weapon at `at` with a picked-up one, returning what was there
    pub fn pickup(
        &mut self,
        at: WeaponRef,
        dropped: &DroppedWeapon,
        catalog: &WeaponCatalog,
    ) -> Result<DroppedWeapon, LoadoutError> {
        let injected = self
            .slots
            .get(at.slot as usize)
            .map(|slot| slot.injected)
            .unwrap_or(true);
        if injected || slot::get(&self.slots, at).is_none() {
            return Err(LoadoutError::InvalidRef {
                slot: at.slot,
                index: at.index,
            });
        }
        let behavior = catalog.get(dropped.catalog_id)?;
        let grant = AmmoGrant {
            magazine: dropped.magazine,
            reserve: dropped.reserve,
        };
        let fresh = WeaponInstance::new(behavior, dropped.catalog_id, dropped.attachments.clone(), grant);
        let instance = slot::get_mut(&mut self.slots, at).ok_or(LoadoutError::InvalidRef {
            slot: at.slot,
            index: at.index,
        })?;
        let previous = std::mem::replace(instance, fresh);

        if at == self.current {
            // the new instance was never drawn
            self.stowed = true;
        }
        if !slot::is_selectable(&self.slots, self.desired) {
            self.desired = self.current;
        }
        debug!(weapon = %at, catalog_id = dropped.catalog_id, "Weapon picked up");
        Ok(DroppedWeapon::from_instance(&previous))
    }

    /// Advance one tick.
    ///
    /// Quick-use is evaluated before switch, and switch before the current
    /// weapon's own fire and reload logic.
    pub fn update(&mut self, ctx: &mut WeaponContext<'_>) {
        if self.role == Role::Owner {
            self.read_selection_input(&ctx.input);
        }

        if self.holding.is_some() {
            if !self.stowed {
                self.stow(ctx);
            }
            return;
        }
        if self.stowed {
            self.stowed = false;
            self.begin_draw(ctx);
            return;
        }

        if self.quick.active.is_some() {
            self.tick_quick_use(ctx);
        } else if self.quick.requested.is_some() && !self.switch.active {
            self.begin_quick_use(ctx);
        } else if self.switch.active {
            self.tick_switch(ctx);
        } else if self.desired != self.current {
            self.begin_switch(ctx);
        } else {
            let current = self.current;
            drive(&mut self.slots, current, ctx, |b, rt, ctx| b.update(rt, ctx));
        }

        debug_assert!(
            !(self.switch.active && self.quick.active.is_some()),
            "switch and quick-use both in progress"
        );
    }

    /// Edge-detect selection buttons and queue the resulting requests
    fn read_selection_input(&mut self, input: &WeaponInput) {
        for s in 0..self.slots.len() {
            let held = input.slot_pressed(s);
            let pressed = held && !self.slot_edges[s];
            self.slot_edges[s] = held;
            if pressed {
                if let Some(r) = slot::select_in_slot(&self.slots, s as u8, self.desired) {
                    self.desired = r;
                }
            }
        }

        let next = input.next_weapon && !self.next_held;
        let previous = input.previous_weapon && !self.previous_held;
        self.next_held = input.next_weapon;
        self.previous_held = input.previous_weapon;
        if next {
            self.cycle(true);
        } else if previous {
            self.cycle(false);
        }

        for s in 0..self.slots.len() {
            let held = input.quick_use_held(s);
            let was_held = self.quick_edges[s];
            self.quick_edges[s] = held;
            if held && !was_held && self.quick.requested.is_none() {
                self.request_quick_use(s as u8);
            } else if !held && was_held && self.quick.requested.map(|r| r.slot as usize) == Some(s) {
                self.quick.release_observed = true;
            }
        }
    }

    fn cycle(&mut self, forward: bool) {
        match slot::next_selectable(&self.slots, self.desired, forward) {
            Some(r) => self.desired = r,
            None => {
                error!(from = %self.desired, forward, "No next selectable weapon");
                debug_assert!(false, "no next selectable weapon");
            }
        }
    }

    fn stow(&mut self, ctx: &mut WeaponContext<'_>) {
        if let Some(quick) = self.quick.active {
            drive(&mut self.slots, quick, ctx, |b, rt, ctx| b.on_putaway(rt, ctx));
        }
        let current = self.current;
        drive(&mut self.slots, current, ctx, |b, rt, ctx| b.on_putaway(rt, ctx));
        self.switch = SwitchState::default();
        self.quick = QuickUseState::default();
        self.desired = self.current;
        self.stowed = true;
        debug!(actor_id = %ctx.actor, weapon = %current, "Weapon stowed");
    }

    /// Per-actor periodic mirror
    pub fn periodic_state(&self, actor: ActorId, tick: u64, input: &WeaponInput) -> PeriodicState {
        let weapons = slot::refs(&self.slots)
            .filter_map(|r| slot::get(&self.slots, r))
            .map(|w| w.behavior.periodic(&w.runtime))
            .collect();
        PeriodicState {
            actor,
            tick,
            desired: self.desired,
            quick_use_desired: self.quick.requested.unwrap_or_default(),
            quick_use_in_progress: self.quick.requested.is_some(),
            release_observed: self.quick.release_observed,
            aim_origin: input.origin,
            aim_rotation: input.aim_rotation,
            weapons,
        }
    }

    /// Adopt the owner's periodic mirror
    pub fn apply_periodic(&mut self, state: &PeriodicState) {
        if state.desired != self.desired && slot::get(&self.slots, state.desired).is_some() {
            self.desired = state.desired;
        }
        if state.quick_use_in_progress {
            if self.quick.requested.is_none() && slot::get(&self.slots, state.quick_use_desired).is_some() {
                self.quick.requested = Some(state.quick_use_desired);
                self.quick.release_observed = false;
            }
            if self.quick.requested == Some(state.quick_use_desired) {
                self.quick.release_observed |= state.release_observed;
            }
        } else if self.quick.active.is_none() {
            self.quick.requested = None;
        } else {
            // owner finished; our own stages run out on their timers
            self.quick.release_observed = true;
        }

        let refs: Vec<WeaponRef> = slot::refs(&self.slots).collect();
        if refs.len() != state.weapons.len() {
            warn!(
                actor_id = %state.actor,
                expected = refs.len(),
                got = state.weapons.len(),
                "Periodic weapon count mismatch"
            );
        }
        for (r, periodic) in refs.into_iter().zip(&state.weapons) {
            if let Some(w) = slot::get_mut(&mut self.slots, r) {
                w.behavior.apply_periodic(&mut w.runtime, periodic);
            }
        }
    }

    /// Mirror one of the owner's discrete events
    pub fn apply_event(&mut self, event: &DiscreteEvent, ctx: &mut WeaponContext<'_>) {
        let applied = drive(&mut self.slots, event.weapon, ctx, |b, rt, ctx| {
            b.apply_event(rt, &event.event, ctx)
        });
        if applied.is_none() {
            warn!(actor_id = %event.actor, weapon = %event.weapon, seq = event.seq, "Event for unknown weapon");
        }
    }
}

/// Run `f` against one weapon with the context pointed at it
fn drive<'a, R>(
    slots: &mut [WeaponSlot],
    r: WeaponRef,
    ctx: &mut WeaponContext<'a>,
    f: impl FnOnce(&dyn WeaponBehavior, &mut RuntimeState, &mut WeaponContext<'a>) -> R,
) -> Option<R> {
    let instance = slot::get_mut(slots, r)?;
    ctx.weapon = r;
    ctx.catalog_id = instance.catalog_id;
    Some(f(instance.behavior.as_ref(), &mut instance.runtime, ctx))
}
