//! Inventory entries the player cannot switch to, e.g. held tools or empty hands

use super::behavior::{AmmoGrant, RuntimeState, WeaponBehavior, WeaponContext, WeaponStatus};

#[derive(Debug, Clone)]
pub struct Unselectable {
    name: String,
}

impl Unselectable {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl WeaponBehavior for Unselectable {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_runtime(&self, _grant: AmmoGrant) -> RuntimeState {
        RuntimeState::Unselectable
    }

    fn selectable(&self) -> bool {
        false
    }

    fn draw_time(&self) -> f32 {
        0.0
    }

    fn putaway_time(&self) -> f32 {
        0.0
    }

    fn update(&self, _state: &mut RuntimeState, _ctx: &mut WeaponContext<'_>) {}

    fn status(&self, _state: &RuntimeState) -> WeaponStatus {
        WeaponStatus::default()
    }
}
