//! Melee weapons, usable as a quick-use knife

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hit::ballistics::BulletSimulationSettings;
use crate::hit::damage::ShotSource;
use crate::hit::physics::HitMask;
use crate::hit::resolve::resolve_hitscan;
use crate::hit::spread::forward;
use crate::net::events::WeaponEvent;
use crate::util::time::reached;

use super::behavior::{AmmoGrant, RuntimeState, WeaponBehavior, WeaponContext, WeaponStatus};
use super::gun::fire::report_impact;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeleeSettings {
    pub name: String,
    pub damage: f32,
    pub range: f32,
    pub force: f32,
    /// Seconds between two attacks
    pub attack_rate: f32,
    /// Swing time until the strike lands
    pub hit_delay: f32,
    pub quick_use: bool,
    pub quick_hit_delay: f32,
    pub quick_duration: f32,
    pub quick_end_duration: f32,
    pub skip_quick_use_putaway: bool,
    pub hit_mask: HitMask,
    pub draw_time: f32,
    pub putaway_time: f32,
}

impl Default for MeleeSettings {
    fn default() -> Self {
        Self {
            name: "knife".to_string(),
            damage: 50.0,
            range: 1.8,
            force: 20.0,
            attack_rate: 0.6,
            hit_delay: 0.15,
            quick_use: true,
            quick_hit_delay: 0.12,
            quick_duration: 0.35,
            quick_end_duration: 0.2,
            skip_quick_use_putaway: true,
            hit_mask: HitMask::all(),
            draw_time: 0.3,
            putaway_time: 0.2,
        }
    }
}

/// Pending strike of a swing in progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingStrike {
    pub at: f64,
    pub quick: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeleeState {
    pub last_attack: f64,
    pub pending: Option<PendingStrike>,
    pub trigger_held: bool,
}

impl Default for MeleeState {
    fn default() -> Self {
        Self {
            last_attack: f64::NEG_INFINITY,
            pending: None,
            trigger_held: false,
        }
    }
}

#[derive(Debug)]
pub struct Melee {
    pub settings: MeleeSettings,
    strike: BulletSimulationSettings,
}

impl Melee {
    pub fn new(settings: MeleeSettings) -> Self {
        let strike = BulletSimulationSettings {
            damage: settings.damage,
            penetration_enabled: false,
            hit_mask: settings.hit_mask,
            force: settings.force,
            ..BulletSimulationSettings::default()
        };
        Self { settings, strike }
    }

    fn swing(&self, state: &mut MeleeState, ctx: &mut WeaponContext<'_>, quick: bool) {
        let delay = if quick { self.settings.quick_hit_delay } else { self.settings.hit_delay };
        state.last_attack = ctx.now;
        state.pending = Some(PendingStrike {
            at: ctx.now + delay as f64,
            quick,
        });
        ctx.emit(WeaponEvent::MeleeStrike { quick });
    }

    /// Land a due strike as a short non-penetrating cast
    fn resolve_pending(&self, state: &mut MeleeState, ctx: &mut WeaponContext<'_>) {
        let Some(pending) = state.pending else {
            return;
        };
        if !reached(ctx.now, pending.at) {
            return;
        }
        state.pending = None;
        if !ctx.resolve_hits {
            return;
        }

        let origin = ctx.input.origin;
        let direction = forward(ctx.input.aim_rotation);
        let trace = resolve_hitscan(ctx.world, &self.strike, ctx.actor, origin, direction, self.settings.range);
        let source = ShotSource {
            attacker: ctx.actor,
            attacker_is_bot: ctx.is_bot,
            weapon_id: ctx.catalog_id,
            position: origin,
            direction,
            force: self.settings.force,
        };
        debug!(actor_id = %ctx.actor, quick = pending.quick, hits = trace.impacts.len(), "Melee strike");
        for impact in &trace.impacts {
            report_impact(&source, impact, ctx);
        }
    }
}

impl WeaponBehavior for Melee {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn create_runtime(&self, _grant: AmmoGrant) -> RuntimeState {
        RuntimeState::Melee(MeleeState::default())
    }

    fn draw_time(&self) -> f32 {
        self.settings.draw_time
    }

    fn putaway_time(&self) -> f32 {
        self.settings.putaway_time
    }

    fn on_putaway(&self, state: &mut RuntimeState, _ctx: &mut WeaponContext<'_>) {
        if let Some(state) = state.as_melee_mut() {
            state.pending = None;
            state.trigger_held = false;
        }
    }

    fn update(&self, state: &mut RuntimeState, ctx: &mut WeaponContext<'_>) {
        let Some(state) = state.as_melee_mut() else {
            return;
        };
        let pressed = ctx.input.fire && !state.trigger_held;
        state.trigger_held = ctx.input.fire;

        self.resolve_pending(state, ctx);
        if ctx.is_owner()
            && pressed
            && state.pending.is_none()
            && ctx.motion.can_fire()
            && reached(ctx.now, state.last_attack + self.settings.attack_rate as f64)
        {
            self.swing(state, ctx, false);
        }
    }

    fn status(&self, state: &RuntimeState) -> WeaponStatus {
        match state {
            RuntimeState::Melee(_) => WeaponStatus {
                ready: true,
                reloading: false,
                empty: false,
            },
            _ => WeaponStatus::default(),
        }
    }

    fn supports_quick_use(&self, state: &RuntimeState) -> bool {
        self.settings.quick_use && matches!(state, RuntimeState::Melee(_))
    }

    fn skip_quick_use_putaway(&self) -> bool {
        self.settings.skip_quick_use_putaway
    }

    fn begin_quick_use(&self, state: &mut RuntimeState, ctx: &mut WeaponContext<'_>) -> f32 {
        let Some(state) = state.as_melee_mut() else {
            return 0.0;
        };
        if ctx.is_owner() {
            self.swing(state, ctx, true);
        }
        self.settings.quick_duration
    }

    fn update_quick_use(&self, state: &mut RuntimeState, ctx: &mut WeaponContext<'_>) {
        if let Some(state) = state.as_melee_mut() {
            self.resolve_pending(state, ctx);
        }
    }

    fn end_quick_use(&self, state: &mut RuntimeState, _ctx: &mut WeaponContext<'_>) -> f32 {
        if let Some(state) = state.as_melee_mut() {
            state.pending = None;
        }
        self.settings.quick_end_duration
    }

    fn apply_event(&self, state: &mut RuntimeState, event: &WeaponEvent, ctx: &mut WeaponContext<'_>) {
        if let (Some(state), WeaponEvent::MeleeStrike { quick }) = (state.as_melee_mut(), event) {
            let delay = if *quick { self.settings.quick_hit_delay } else { self.settings.hit_delay };
            state.last_attack = ctx.now;
            state.pending = Some(PendingStrike {
                at: ctx.now + delay as f64,
                quick: *quick,
            });
        }
    }
}
