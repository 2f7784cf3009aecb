//! Quick use: fire a secondary weapon (knife, grenade) without a full switch

use tracing::debug;

use crate::util::time::reached;
use crate::weapons::behavior::WeaponContext;
use crate::weapons::slot::{self, WeaponRef};

use super::{drive, WeaponManager};

pub const STAGE_PUTAWAY: u8 = 0;
pub const STAGE_BEGIN: u8 = 1;
pub const STAGE_HOLD: u8 = 2;
pub const STAGE_END: u8 = 3;
pub const STAGE_REDRAW: u8 = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QuickUseState {
    /// Requested or running quick-use weapon
    pub requested: Option<WeaponRef>,
    /// Set once the stages are running
    pub active: Option<WeaponRef>,
    pub stage: u8,
    pub deadline: f64,
    pub release_observed: bool,
    /// The current weapon stayed drawn during the use
    pub skipped_putaway: bool,
}

impl WeaponManager {
    /// Queue quick use of the weapon selected for `slot`
    pub fn request_quick_use(&mut self, slot: u8) -> bool {
        if self.quick.requested.is_some() {
            return false;
        }
        let Some(index) = self.slots.get(slot as usize).map(|s| s.selected_quick_use) else {
            return false;
        };
        let r = WeaponRef::new(slot, index);
        let supported = slot::get(&self.slots, r)
            .map(|w| w.behavior.supports_quick_use(&w.runtime))
            .unwrap_or(false);
        if !supported {
            return false;
        }
        self.quick.requested = Some(r);
        self.quick.release_observed = false;
        true
    }

    /// Signal that the quick-use button went up
    pub fn release_quick_use(&mut self) {
        if self.quick.requested.is_some() {
            self.quick.release_observed = true;
        }
    }

    pub(super) fn begin_quick_use(&mut self, ctx: &mut WeaponContext<'_>) {
        let Some(r) = self.quick.requested else {
            return;
        };
        let Some(weapon) = slot::get(&self.slots, r) else {
            self.quick.requested = None;
            return;
        };
        let skip = weapon.behavior.skip_quick_use_putaway() || r == self.current;
        let putaway = if skip {
            0.0
        } else {
            self.current_instance()
                .map(|w| w.behavior.putaway_time())
                .unwrap_or(0.0)
        };

        // quick use pre-empts any pending switch
        self.desired = self.current;
        self.quick.active = Some(r);
        self.quick.stage = STAGE_PUTAWAY;
        self.quick.deadline = ctx.now + putaway as f64;
        self.quick.skipped_putaway = skip;
        debug!(actor_id = %ctx.actor, weapon = %r, skip_putaway = skip, "Quick use started");
    }

    pub(super) fn tick_quick_use(&mut self, ctx: &mut WeaponContext<'_>) {
        let Some(r) = self.quick.active else {
            return;
        };
        if matches!(self.quick.stage, STAGE_BEGIN | STAGE_HOLD | STAGE_END) {
            drive(&mut self.slots, r, ctx, |b, rt, ctx| b.update_quick_use(rt, ctx));
        }

        match self.quick.stage {
            STAGE_PUTAWAY => {
                if !reached(ctx.now, self.quick.deadline) {
                    return;
                }
                if !self.quick.skipped_putaway {
                    let current = self.current;
                    drive(&mut self.slots, current, ctx, |b, rt, ctx| b.on_putaway(rt, ctx));
                }
                let duration = drive(&mut self.slots, r, ctx, |b, rt, ctx| b.begin_quick_use(rt, ctx)).unwrap_or(0.0);
                self.quick.stage = STAGE_BEGIN;
                self.quick.deadline = ctx.now + duration as f64;
            }
            STAGE_BEGIN => {
                if reached(ctx.now, self.quick.deadline) {
                    self.quick.stage = STAGE_HOLD;
                }
            }
            STAGE_HOLD => {
                let (supported, needs_release) = slot::get(&self.slots, r)
                    .map(|w| {
                        (
                            w.behavior.supports_quick_use(&w.runtime),
                            w.behavior.quick_use_requires_release(),
                        )
                    })
                    .unwrap_or((false, false));
                if !supported || !needs_release || self.quick.release_observed {
                    let duration = drive(&mut self.slots, r, ctx, |b, rt, ctx| b.end_quick_use(rt, ctx)).unwrap_or(0.0);
                    self.quick.stage = STAGE_END;
                    self.quick.deadline = ctx.now + duration as f64;
                }
            }
            STAGE_END => {
                if !reached(ctx.now, self.quick.deadline) {
                    return;
                }
                self.quick.stage = STAGE_REDRAW;
                if self.quick.skipped_putaway {
                    self.quick.deadline = ctx.now;
                } else {
                    let draw = self.current_instance().map(|w| w.behavior.draw_time()).unwrap_or(0.0);
                    self.quick.deadline = ctx.now + draw as f64;
                    let current = self.current;
                    drive(&mut self.slots, current, ctx, |b, rt, ctx| b.on_draw(rt, ctx));
                }
            }
            _ => {
                if reached(ctx.now, self.quick.deadline) {
                    debug!(actor_id = %ctx.actor, weapon = %r, "Quick use finished");
                    self.quick = QuickUseState::default();
                }
            }
        }
    }
}
