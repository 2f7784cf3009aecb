//! Weapon slot model: which instances occupy which inventory slots

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::behavior::{AmmoGrant, RuntimeState, WeaponBehavior};

/// Catalog id carried by weapons injected outside the player's loadout
pub const INJECTED_CATALOG_ID: i32 = -1;

/// `(slot, index-in-slot)` address of a weapon instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeaponRef {
    pub slot: u8,
    pub index: u8,
}

impl WeaponRef {
    pub const fn new(slot: u8, index: u8) -> Self {
        Self { slot, index }
    }
}

impl fmt::Display for WeaponRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.slot, self.index)
    }
}

/// A weapon in a player's inventory
pub struct WeaponInstance {
    pub behavior: Arc<dyn WeaponBehavior>,
    pub runtime: RuntimeState,
    pub attachments: Vec<u32>,
    pub catalog_id: i32,
}

impl WeaponInstance {
    pub fn new(behavior: Arc<dyn WeaponBehavior>, catalog_id: i32, attachments: Vec<u32>, grant: AmmoGrant) -> Self {
        let runtime = behavior.create_runtime(grant);
        Self {
            behavior,
            runtime,
            attachments,
            catalog_id,
        }
    }

    pub fn selectable(&self) -> bool {
        self.behavior.selectable()
    }
}

impl fmt::Debug for WeaponInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeaponInstance")
            .field("behavior", &self.behavior.name())
            .field("catalog_id", &self.catalog_id)
            .field("attachments", &self.attachments)
            .field("runtime", &self.runtime)
            .finish()
    }
}

/// One inventory slot
#[derive(Debug, Default)]
pub struct WeaponSlot {
    pub weapons: Vec<WeaponInstance>,
    /// Index of the weapon used by this slot's quick-use button
    pub selected_quick_use: u8,
    /// Added by an external system, never player-selectable
    pub injected: bool,
}

impl WeaponSlot {
    pub fn new(weapons: Vec<WeaponInstance>) -> Self {
        Self {
            weapons,
            selected_quick_use: 0,
            injected: false,
        }
    }

    pub fn injected(weapons: Vec<WeaponInstance>) -> Self {
        Self {
            injected: true,
            ..Self::new(weapons)
        }
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }
}

/// Look up an instance
pub fn get(slots: &[WeaponSlot], r: WeaponRef) -> Option<&WeaponInstance> {
    slots.get(r.slot as usize)?.weapons.get(r.index as usize)
}

pub fn get_mut(slots: &mut [WeaponSlot], r: WeaponRef) -> Option<&mut WeaponInstance> {
    slots.get_mut(r.slot as usize)?.weapons.get_mut(r.index as usize)
}

/// Every instance address in slot order
pub fn refs(slots: &[WeaponSlot]) -> impl Iterator<Item = WeaponRef> + '_ {
    slots.iter().enumerate().flat_map(|(s, slot)| {
        (0..slot.weapons.len()).map(move |i| WeaponRef::new(s as u8, i as u8))
    })
}

/// Whether the player may switch to `r`
pub fn is_selectable(slots: &[WeaponSlot], r: WeaponRef) -> bool {
    let Some(slot) = slots.get(r.slot as usize) else {
        return false;
    };
    !slot.injected
        && slot
            .weapons
            .get(r.index as usize)
            .map(WeaponInstance::selectable)
            .unwrap_or(false)
}

/// Next player-selectable weapon after `from` in slot order, wrapping.
///
/// `forward == false` walks backwards. Returns `from` itself when it is the
/// only selectable weapon, `None` when nothing is selectable.
pub fn next_selectable(slots: &[WeaponSlot], from: WeaponRef, forward: bool) -> Option<WeaponRef> {
    let all: Vec<WeaponRef> = refs(slots).collect();
    if all.is_empty() {
        return None;
    }
    let start = all.iter().position(|r| *r == from).unwrap_or(0);
    let n = all.len();
    (1..=n)
        .map(|step| {
            if forward {
                all[(start + step) % n]
            } else {
                all[(start + n - step % n) % n]
            }
        })
        .find(|r| is_selectable(slots, *r))
}

/// First selectable weapon inside one slot, cycling past `current` when it
/// already lives in that slot
pub fn select_in_slot(slots: &[WeaponSlot], slot: u8, current: WeaponRef) -> Option<WeaponRef> {
    let count = slots.get(slot as usize)?.weapons.len();
    let start = if current.slot == slot { current.index as usize + 1 } else { 0 };
    (0..count)
        .map(|step| WeaponRef::new(slot, ((start + step) % count) as u8))
        .find(|r| is_selectable(slots, *r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weapons::unselectable::Unselectable;
    use crate::weapons::melee::{Melee, MeleeSettings};

    fn melee() -> WeaponInstance {
        WeaponInstance::new(Arc::new(Melee::new(MeleeSettings::default())), 1, vec![], AmmoGrant::default())
    }

    fn placeholder() -> WeaponInstance {
        WeaponInstance::new(Arc::new(Unselectable::new("hands")), INJECTED_CATALOG_ID, vec![], AmmoGrant::default())
    }

    fn slots() -> Vec<WeaponSlot> {
        vec![
            WeaponSlot::new(vec![melee(), melee()]),
            WeaponSlot::new(vec![placeholder()]),
            WeaponSlot::injected(vec![melee()]),
            WeaponSlot::new(vec![melee()]),
        ]
    }

    #[test]
    fn next_skips_unselectable_and_injected() {
        let slots = slots();
        assert_eq!(next_selectable(&slots, WeaponRef::new(0, 1), true), Some(WeaponRef::new(3, 0)));
        assert_eq!(next_selectable(&slots, WeaponRef::new(3, 0), true), Some(WeaponRef::new(0, 0)));
        assert_eq!(next_selectable(&slots, WeaponRef::new(0, 0), false), Some(WeaponRef::new(3, 0)));
    }

    #[test]
    fn nothing_selectable_yields_none() {
        let slots = vec![WeaponSlot::new(vec![placeholder()])];
        assert_eq!(next_selectable(&slots, WeaponRef::new(0, 0), true), None);
    }

    #[test]
    fn slot_button_cycles_inside_slot() {
        let slots = slots();
        assert_eq!(select_in_slot(&slots, 0, WeaponRef::new(3, 0)), Some(WeaponRef::new(0, 0)));
        assert_eq!(select_in_slot(&slots, 0, WeaponRef::new(0, 0)), Some(WeaponRef::new(0, 1)));
        assert_eq!(select_in_slot(&slots, 2, WeaponRef::new(0, 0)), None);
    }
}
