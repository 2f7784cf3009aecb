//! Fire control state machine and shot dispatch

use glam::{Quat, Vec3};
use tracing::{debug, trace, warn};

use super::reload;
use super::settings::{BulletMode, FireMode};
use super::state::{GunState, BOLT_EJECT_PENDING, BOLT_IDLE, BOLT_LAST_EJECT_PENDING};
use super::Gun;
use crate::hit::damage::ShotSource;
use crate::hit::projectile::Projectile;
use crate::hit::resolve::{resolve_hitscan, Impact};
use crate::hit::spread::{apply_spread, sample_spread};
use crate::net::events::{Cosmetic, WeaponEvent};
use crate::util::time::reached;
use crate::weapons::behavior::WeaponContext;

/// Movement gates shared by every fire mode
fn movement_allows(gun: &Gun, ctx: &WeaponContext<'_>) -> bool {
    ctx.motion.can_fire()
        && !ctx.motion.is_running()
        && reached(ctx.now, ctx.motion.last_run_time() + gun.settings.run_fire_delay as f64)
}

/// Owner-side trigger handling for one tick
pub fn update_owner(gun: &Gun, state: &mut GunState, ctx: &mut WeaponContext<'_>) {
    let settings = &gun.settings;
    let pressed = ctx.input.fire && !state.trigger_held;
    let mode = settings.fire_mode(state.fire_mode_index);

    if state.burst.remaining > 0 {
        state.is_firing = false;
        continue_burst(gun, state, ctx);
        return;
    }

    let wants = match mode {
        FireMode::Auto => ctx.input.fire,
        FireMode::Semi | FireMode::Burst | FireMode::BoltAction => pressed,
    };
    if !wants {
        state.is_firing = false;
        return;
    }

    if !movement_allows(gun, ctx) {
        state.is_firing = false;
        return;
    }

    if let Some(episode) = state.reload {
        // only a shot that actually goes out aborts the episode
        let cancels = settings.reload_mode.is_procedural() && state.magazine > 0 && rate_allows(gun, state, mode, ctx.now);
        if !cancels {
            state.is_firing = false;
            return;
        }
        debug!(actor_id = %ctx.actor, phase = episode.phase, "Shot cancels procedural reload");
        reload::cancel(state, ctx);
    }

    if state.magazine == 0 {
        state.is_firing = false;
        if settings.auto_reload && state.can_reload(settings) {
            reload::try_start(settings, state, ctx);
        } else if reached(ctx.now, state.dry_fire_until) {
            state.dry_fire_until = ctx.now + settings.dry_fire_penalty as f64;
            ctx.emit(WeaponEvent::DryFire);
        }
        return;
    }

    let now = ctx.now;
    let ready = rate_allows(gun, state, mode, now);
    match mode {
        FireMode::Semi | FireMode::BoltAction => {
            if ready {
                shoot(gun, state, ctx, true);
            }
        }
        FireMode::Auto => {
            state.is_firing = true;
            if ready {
                shoot(gun, state, ctx, false);
            }
        }
        FireMode::Burst => {
            if ready {
                let count = settings.burst_count.max(1).min(state.magazine);
                ctx.emit(WeaponEvent::BurstBegin { count: count.min(u8::MAX as u32) as u8 });
                shoot(gun, state, ctx, true);
                state.burst.remaining = count - 1;
                state.burst.next_shot = now + settings.burst_delay as f64;
            }
        }
    }
}

/// Fire-rate gate; bolt action already folds the cycle time into `last_fire`
fn rate_allows(gun: &Gun, state: &GunState, mode: FireMode, now: f64) -> bool {
    match mode {
        FireMode::BoltAction => reached(now, state.last_fire),
        FireMode::Semi | FireMode::Auto | FireMode::Burst => reached(now, state.last_fire + gun.settings.fire_rate()),
    }
}

fn continue_burst(gun: &Gun, state: &mut GunState, ctx: &mut WeaponContext<'_>) {
    if !reached(ctx.now, state.burst.next_shot) {
        return;
    }
    if state.magazine == 0 || !movement_allows(gun, ctx) {
        state.burst.remaining = 0;
        return;
    }
    shoot(gun, state, ctx, true);
    state.burst.remaining -= 1;
    state.burst.next_shot = ctx.now + gun.settings.burst_delay as f64;
}

/// Timers that run after a shot: shell ejection and the bolt cycle
pub fn update_timers(state: &mut GunState, ctx: &mut WeaponContext<'_>) {
    if let Some(at) = state.shell_eject_at {
        if reached(ctx.now, at) {
            state.shell_eject_at = None;
            ctx.out.cosmetics.push(Cosmetic::ShellEjected { weapon: ctx.weapon });
        }
    }
    if state.bolt.stage != BOLT_IDLE && reached(ctx.now, state.bolt.deadline) {
        let last_round = state.bolt.stage == BOLT_LAST_EJECT_PENDING;
        state.bolt.stage = BOLT_IDLE;
        ctx.out.cosmetics.push(Cosmetic::ShellEjected { weapon: ctx.weapon });
        ctx.emit(WeaponEvent::BoltCycled { last_round });
    }
}

/// Fire one accepted shot
fn shoot(gun: &Gun, state: &mut GunState, ctx: &mut WeaponContext<'_>, announce: bool) {
    let settings = &gun.settings;
    let last_round = state.magazine == 1;
    let origin = ctx.input.origin;
    let aim = ctx.input.aim_rotation;
    let directions = sample_directions(gun, state, ctx, aim);

    consume_round(gun, state, ctx.now, ctx.flags.unlimited_ammo);
    state.recoil.kick(&settings.recoil, &mut *ctx.rng);

    trace!(
        actor_id = %ctx.actor,
        weapon = %ctx.weapon,
        magazine = state.magazine,
        pellets = directions.len(),
        "Shot fired"
    );

    if ctx.resolve_hits {
        dispatch(gun, ctx, origin, &directions);
    }
    if announce {
        ctx.emit(WeaponEvent::Fire {
            last_round,
            origin,
            directions,
        });
    }
}

/// Magazine, bolt, spray and shell bookkeeping for a shot
fn consume_round(gun: &Gun, state: &mut GunState, now: f64, unlimited_ammo: bool) {
    let settings = &gun.settings;
    if !unlimited_ammo {
        state.magazine = state.magazine.saturating_sub(1);
    }
    if settings.bullet.spread.spray_active() {
        state.spray += 1.0;
    }
    if settings.fire_mode(state.fire_mode_index) == FireMode::BoltAction {
        state.last_fire = now + settings.bolt_cycle_time as f64;
        state.bolt.stage = if state.magazine == 0 {
            BOLT_LAST_EJECT_PENDING
        } else {
            BOLT_EJECT_PENDING
        };
        state.bolt.deadline = now + settings.bolt_eject_delay as f64;
    } else {
        state.last_fire = now;
        state.shell_eject_at = Some(now + settings.shell_eject_delay as f64);
    }
}

fn sample_directions(gun: &Gun, state: &GunState, ctx: &mut WeaponContext<'_>, aim: Quat) -> Vec<Vec3> {
    let settings = &gun.settings;
    let speed = ctx.motion.current_velocity().length();
    let recoil = state.recoil.offset;
    (0..settings.samples_per_shot())
        .map(|_| {
            let spread = sample_spread(&settings.bullet.spread, state.aim_progress, speed, state.spray, &mut *ctx.rng);
            apply_spread(aim, spread + recoil)
        })
        .collect()
}

/// Resolve the hit samples of one shot on this simulation
pub fn dispatch(gun: &Gun, ctx: &mut WeaponContext<'_>, origin: Vec3, directions: &[Vec3]) {
    let settings = &gun.settings;
    for &direction in directions {
        let direction = direction.normalize_or(Vec3::NEG_Z);
        let source = ShotSource {
            attacker: ctx.actor,
            attacker_is_bot: ctx.is_bot,
            weapon_id: ctx.catalog_id,
            position: origin,
            direction,
            force: settings.bullet.force,
        };
        match settings.bullet_mode {
            BulletMode::Hitscan => {
                let trace = resolve_hitscan(ctx.world, &settings.bullet, ctx.actor, origin, direction, settings.range);
                for impact in &trace.impacts {
                    report_impact(&source, impact, ctx);
                }
            }
            BulletMode::Projectile => {
                let rotation = Quat::from_rotation_arc(Vec3::NEG_Z, direction);
                let handle = ctx.pool.acquire(settings.projectile_prefab, origin, rotation);
                ctx.projectiles
                    .spawn(Projectile::bullet(handle, source, gun.bullet.clone(), ctx.now));
            }
        }
    }
}

/// Queue damage and broadcast the impact of a resolved hit
pub fn report_impact(source: &ShotSource, impact: &Impact, ctx: &mut WeaponContext<'_>) {
    if let Some(request) = source.request_for(impact) {
        ctx.out.damage.push(request);
    }
    ctx.out.cosmetics.push(Cosmetic::ImpactEffect {
        point: impact.point,
        normal: impact.normal,
        surface: impact.surface,
    });
    ctx.emit(WeaponEvent::Impact {
        point: impact.point,
        normal: impact.normal,
        surface: impact.surface,
        target: impact.target,
        damage: impact.damage,
    });
}

/// Replica-side automatic fire, reconstructed from the replicated firing flag
pub fn update_replica(gun: &Gun, state: &mut GunState, ctx: &mut WeaponContext<'_>) {
    let settings = &gun.settings;
    if !state.is_firing
        || state.is_reloading()
        || state.magazine == 0
        || settings.fire_mode(state.fire_mode_index) != FireMode::Auto
    {
        return;
    }
    if reached(ctx.now, state.last_fire + settings.fire_rate()) {
        shoot(gun, state, ctx, false);
    }
}

/// Mirror an owner `Fire` event.
///
/// With hit authority the mirror only resolves shots its own ammo allows,
/// and never more samples than the weapon fires per shot.
pub fn apply_fire(gun: &Gun, state: &mut GunState, ctx: &mut WeaponContext<'_>, origin: Vec3, directions: &[Vec3]) {
    if ctx.resolve_hits && state.magazine == 0 && !ctx.flags.unlimited_ammo {
        warn!(actor_id = %ctx.actor, weapon = %ctx.weapon, "Dropping shot from an empty magazine");
        return;
    }
    consume_round(gun, state, ctx.now, ctx.flags.unlimited_ammo);
    if ctx.resolve_hits {
        let samples = (gun.settings.samples_per_shot() as usize).min(directions.len());
        if samples < directions.len() {
            warn!(
                actor_id = %ctx.actor,
                weapon = %ctx.weapon,
                sent = directions.len(),
                samples,
                "Truncating shot samples"
            );
        }
        dispatch(gun, ctx, origin, &directions[..samples]);
    }
}

/// Mirror an owner `BoltCycled` event
pub fn apply_bolt_cycled(state: &mut GunState, ctx: &mut WeaponContext<'_>) {
    state.bolt.stage = BOLT_IDLE;
    ctx.out.cosmetics.push(Cosmetic::ShellEjected { weapon: ctx.weapon });
}
