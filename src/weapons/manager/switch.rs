//! Weapon switch: putaway of the current weapon, then draw of the desired one

use tracing::debug;

use crate::util::time::reached;
use crate::weapons::behavior::WeaponContext;

use super::{drive, WeaponManager};

pub const PHASE_PUTAWAY: u8 = 0;
pub const PHASE_DRAW: u8 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SwitchState {
    pub active: bool,
    pub phase: u8,
    pub deadline: f64,
}

impl WeaponManager {
    pub(super) fn begin_switch(&mut self, ctx: &mut WeaponContext<'_>) {
        let putaway = self
            .current_instance()
            .map(|w| w.behavior.putaway_time())
            .unwrap_or(0.0);
        self.switch = SwitchState {
            active: true,
            phase: PHASE_PUTAWAY,
            deadline: ctx.now + putaway as f64,
        };
        debug!(actor_id = %ctx.actor, from = %self.current, to = %self.desired, "Weapon switch started");
    }

    /// Enter the draw phase for the current weapon
    pub(super) fn begin_draw(&mut self, ctx: &mut WeaponContext<'_>) {
        let draw = self.current_instance().map(|w| w.behavior.draw_time()).unwrap_or(0.0);
        self.switch = SwitchState {
            active: true,
            phase: PHASE_DRAW,
            deadline: ctx.now + draw as f64,
        };
        let current = self.current;
        drive(&mut self.slots, current, ctx, |b, rt, ctx| b.on_draw(rt, ctx));
    }

    pub(super) fn tick_switch(&mut self, ctx: &mut WeaponContext<'_>) {
        if !reached(ctx.now, self.switch.deadline) {
            return;
        }
        match self.switch.phase {
            PHASE_PUTAWAY => {
                let old = self.current;
                drive(&mut self.slots, old, ctx, |b, rt, ctx| b.on_putaway(rt, ctx));
                self.current = self.desired;
                self.begin_draw(ctx);
                debug!(actor_id = %ctx.actor, weapon = %self.current, "Weapon drawing");
            }
            _ => {
                self.switch = SwitchState::default();
                debug!(actor_id = %ctx.actor, weapon = %self.current, "Weapon switch finished");
            }
        }
    }
}
