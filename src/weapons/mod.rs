//! Weapon core: slot model, behaviors and the per-player manager

pub mod behavior;
pub mod catalog;
pub mod env;
pub mod grenade;
pub mod gun;
pub mod input;
pub mod manager;
pub mod melee;
pub mod slot;
pub mod unselectable;

#[cfg(test)]
pub(crate) mod testing;

pub use behavior::{AmmoGrant, Role, RuntimeState, WeaponBehavior, WeaponContext, WeaponStatus};
pub use catalog::{CatalogEntry, Loadout, LoadoutSlot, LoadoutWeapon, WeaponCatalog, WeaponDefinition};
pub use env::{GameRules, MotionSample, Movement};
pub use input::WeaponInput;
pub use manager::{DroppedWeapon, InteractableId, WeaponManager};
pub use slot::{WeaponInstance, WeaponRef, WeaponSlot};
