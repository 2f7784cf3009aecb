//! Ranged weapons: fire control, reload, aim and recoil

pub mod fire;
pub mod recoil;
pub mod reload;
pub mod settings;
pub mod state;

use std::sync::Arc;

use crate::hit::ballistics::BulletSimulationSettings;
use crate::net::events::{WeaponEvent, WeaponPeriodic};

use super::behavior::{AmmoGrant, RuntimeState, WeaponBehavior, WeaponContext, WeaponStatus};

pub use settings::{BulletMode, FireMode, FireType, GunSettings, ReloadMode, ReloadTiming};
pub use state::GunState;

/// Shared gun behavior
#[derive(Debug)]
pub struct Gun {
    pub settings: GunSettings,
    pub(crate) bullet: Arc<BulletSimulationSettings>,
}

impl Gun {
    pub fn new(settings: GunSettings) -> Self {
        let bullet = Arc::new(settings.bullet.clone());
        Self { settings, bullet }
    }

    fn update_aim(&self, state: &mut GunState, ctx: &WeaponContext<'_>) {
        let aim = &self.settings.aim;
        let allowed = ctx.input.aim
            && !ctx.motion.is_running()
            && (aim.allow_while_reloading || !state.is_reloading());
        state.aiming = allowed;

        let (target, time) = if allowed { (1.0, aim.in_time) } else { (0.0, aim.out_time) };
        state.aim_progress = if time <= 0.0 {
            target
        } else {
            let step = ctx.dt / time;
            if target > state.aim_progress {
                (state.aim_progress + step).min(target)
            } else {
                (state.aim_progress - step).max(target)
            }
        };
    }

    fn update_fire_mode(&self, state: &mut GunState, ctx: &mut WeaponContext<'_>) {
        let pressed = ctx.input.toggle_fire_mode && !state.toggle_held;
        state.toggle_held = ctx.input.toggle_fire_mode;
        let modes = self.settings.fire_modes.len();
        if !pressed || modes < 2 || state.burst.remaining > 0 {
            return;
        }
        state.fire_mode_index = ((state.fire_mode_index as usize + 1) % modes) as u8;
        state.is_firing = false;
        ctx.emit(WeaponEvent::FireModeChanged {
            mode_index: state.fire_mode_index,
        });
    }

    fn decay_spray(&self, state: &mut GunState, ctx: &WeaponContext<'_>) {
        if !ctx.input.fire && state.spray > 0.0 {
            let decay = self.settings.bullet.spread.spray_decay * ctx.dt;
            state.spray = (state.spray - decay).max(0.0);
        }
    }
}

impl WeaponBehavior for Gun {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn create_runtime(&self, grant: AmmoGrant) -> RuntimeState {
        RuntimeState::Gun(GunState::new(&self.settings, grant))
    }

    fn draw_time(&self) -> f32 {
        self.settings.draw_time
    }

    fn putaway_time(&self) -> f32 {
        self.settings.putaway_time
    }

    fn on_draw(&self, state: &mut RuntimeState, ctx: &mut WeaponContext<'_>) {
        if let Some(state) = state.as_gun_mut() {
            // a trigger held through the draw is not a fresh pull
            state.trigger_held = ctx.input.fire;
        }
    }

    fn on_putaway(&self, state: &mut RuntimeState, ctx: &mut WeaponContext<'_>) {
        let Some(state) = state.as_gun_mut() else {
            return;
        };
        if ctx.is_owner() {
            reload::cancel(state, ctx);
        }
        state.clear_transient();
    }

    fn update(&self, state: &mut RuntimeState, ctx: &mut WeaponContext<'_>) {
        let Some(state) = state.as_gun_mut() else {
            return;
        };

        self.update_aim(state, ctx);
        if ctx.is_owner() {
            self.update_fire_mode(state, ctx);
            fire::update_timers(state, ctx);
            reload::tick(&self.settings, state, ctx);

            let reload_pressed = ctx.input.reload && !state.reload_held;
            state.reload_held = ctx.input.reload;
            if reload_pressed {
                reload::try_start(&self.settings, state, ctx);
            }

            fire::update_owner(self, state, ctx);
        } else {
            fire::update_replica(self, state, ctx);
        }
        self.decay_spray(state, ctx);
        state.recoil.update(&self.settings.recoil, ctx.dt);
        state.trigger_held = ctx.input.fire;
    }

    fn status(&self, state: &RuntimeState) -> WeaponStatus {
        state
            .as_gun()
            .map(|state| WeaponStatus {
                ready: !state.is_reloading(),
                reloading: state.is_reloading(),
                empty: state.magazine == 0,
            })
            .unwrap_or_default()
    }

    fn sensitivity(&self, state: &RuntimeState) -> f32 {
        state
            .as_gun()
            .map(|state| 1.0 + (self.settings.aim.sensitivity - 1.0) * state.aim_progress)
            .unwrap_or(1.0)
    }

    fn speed_multiplier(&self, state: &RuntimeState) -> f32 {
        state
            .as_gun()
            .map(|state| 1.0 + (self.settings.aim.speed_multiplier - 1.0) * state.aim_progress)
            .unwrap_or(1.0)
    }

    fn apply_event(&self, state: &mut RuntimeState, event: &WeaponEvent, ctx: &mut WeaponContext<'_>) {
        let Some(state) = state.as_gun_mut() else {
            return;
        };
        match event {
            WeaponEvent::Fire { origin, directions, .. } => {
                fire::apply_fire(self, state, ctx, *origin, directions);
            }
            WeaponEvent::BurstBegin { .. } | WeaponEvent::DryFire | WeaponEvent::Impact { .. } => {}
            WeaponEvent::BoltCycled { .. } => fire::apply_bolt_cycled(state, ctx),
            WeaponEvent::ReloadPhase { .. } | WeaponEvent::ProceduralStage { .. } => {
                reload::apply(&self.settings, state, event, ctx.now, ctx.flags.unlimited_reloads);
            }
            WeaponEvent::FireModeChanged { mode_index } => {
                state.fire_mode_index = *mode_index;
                state.is_firing = false;
            }
            WeaponEvent::MeleeStrike { .. } | WeaponEvent::GrenadePinPulled | WeaponEvent::GrenadeThrown { .. } => {}
        }
    }

    fn periodic(&self, state: &RuntimeState) -> WeaponPeriodic {
        state
            .as_gun()
            .map(|state| WeaponPeriodic {
                firing: state.is_firing,
                aiming: state.aiming,
                magazine: state.magazine,
                reserve: state.reserve,
            })
            .unwrap_or_default()
    }

    fn apply_periodic(&self, state: &mut RuntimeState, periodic: &WeaponPeriodic) {
        if let Some(state) = state.as_gun_mut() {
            state.is_firing = periodic.firing;
            state.magazine = periodic.magazine;
            state.reserve = periodic.reserve;
        }
    }

    fn restock(&self, state: &mut RuntimeState) {
        if let Some(state) = state.as_gun_mut() {
            state.reserve = state.reserve.max(self.settings.max_reserve);
        }
    }

    fn ammo(&self, state: &RuntimeState) -> AmmoGrant {
        state
            .as_gun()
            .map(|state| AmmoGrant {
                magazine: Some(state.magazine),
                reserve: Some(state.reserve),
            })
            .unwrap_or_default()
    }
}
