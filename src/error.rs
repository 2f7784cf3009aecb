//! Loadout and catalog errors

use thiserror::Error;

/// Errors raised while turning a loadout into a weapon manager
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadoutError {
    #[error("Unknown weapon catalog id: {0}")]
    UnknownWeapon(i32),

    #[error("Loadout has no slots")]
    EmptyLoadout,

    #[error("Slot {0} has no weapons")]
    EmptySlot(usize),

    #[error("No weapon at slot {slot} index {index}")]
    InvalidRef { slot: u8, index: u8 },

    #[error("Loadout has no selectable weapon")]
    NoSelectableWeapon,

    #[error("Loadout exceeds {max} {what}")]
    TooLarge { what: &'static str, max: usize },
}
