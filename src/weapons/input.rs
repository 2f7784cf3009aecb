//! Already-sampled weapon input for one tick

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Buttons and aim for one simulation step.
///
/// `select_slot` and `quick_use` are indexed by slot; missing entries read
/// as released.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponInput {
    pub fire: bool,
    pub aim: bool,
    pub reload: bool,
    pub toggle_fire_mode: bool,
    pub next_weapon: bool,
    pub previous_weapon: bool,
    pub select_slot: Vec<bool>,
    pub quick_use: Vec<bool>,
    /// Muzzle / view origin in world space
    pub origin: Vec3,
    pub aim_rotation: Quat,
}

impl Default for WeaponInput {
    fn default() -> Self {
        Self {
            fire: false,
            aim: false,
            reload: false,
            toggle_fire_mode: false,
            next_weapon: false,
            previous_weapon: false,
            select_slot: Vec::new(),
            quick_use: Vec::new(),
            origin: Vec3::ZERO,
            aim_rotation: Quat::IDENTITY,
        }
    }
}

impl WeaponInput {
    pub fn slot_pressed(&self, slot: usize) -> bool {
        self.select_slot.get(slot).copied().unwrap_or(false)
    }

    pub fn quick_use_held(&self, slot: usize) -> bool {
        self.quick_use.get(slot).copied().unwrap_or(false)
    }
}
