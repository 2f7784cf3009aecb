//! Reload state machine

use tracing::debug;

use super::settings::GunSettings;
use super::state::{kind_for, BoltState, BurstState, GunState, ReloadEpisode, ReloadKind};
use crate::net::events::WeaponEvent;
use crate::util::time::reached;
use crate::weapons::behavior::WeaponContext;

pub const STAGE_START: u8 = 0;
pub const STAGE_DECIDE: u8 = 1;
pub const STAGE_INSERT_BEGIN: u8 = 2;
pub const STAGE_INSERT_END: u8 = 3;
pub const STAGE_END: u8 = 4;

/// Begin a reload episode if the entry guard passes
pub fn try_start(settings: &GunSettings, state: &mut GunState, ctx: &mut WeaponContext<'_>) -> bool {
    if state.is_reloading() || !state.can_reload(settings) {
        return false;
    }

    let now = ctx.now;
    let empty = state.magazine == 0;
    let kind = kind_for(settings.reload_mode);
    state.bolt = BoltState::default();
    state.burst = BurstState::default();
    state.is_firing = false;

    match kind {
        ReloadKind::Magazine => {
            let timing = settings.timing_for(empty);
            state.reload = Some(ReloadEpisode {
                kind,
                phase: 1,
                deadline: now + timing.ammo_at as f64,
                empty,
                started_at: now,
            });
            ctx.emit(WeaponEvent::ReloadPhase { phase: 1, empty });
        }
        ReloadKind::Procedural => {
            state.reload = Some(ReloadEpisode {
                kind,
                phase: STAGE_START,
                deadline: now + settings.procedural.start as f64,
                empty,
                started_at: now,
            });
            ctx.emit(WeaponEvent::ProceduralStage { stage: STAGE_START });
        }
    }

    debug!(
        actor_id = %ctx.actor,
        weapon = %ctx.weapon,
        empty,
        magazine = state.magazine,
        reserve = state.reserve,
        "Reload started"
    );
    true
}

/// Advance the running episode by at most one phase
pub fn tick(settings: &GunSettings, state: &mut GunState, ctx: &mut WeaponContext<'_>) {
    let Some(mut episode) = state.reload else {
        return;
    };
    if !reached(ctx.now, episode.deadline) {
        return;
    }
    let now = ctx.now;

    match (episode.kind, episode.phase) {
        (ReloadKind::Magazine, 1) => {
            let amount = state.transfer_amount(settings);
            state.transfer(amount, ctx.flags.unlimited_reloads);
            let timing = settings.timing_for(episode.empty);
            episode.phase = 2;
            episode.deadline = (episode.started_at + timing.duration as f64).max(now);
            state.reload = Some(episode);
            ctx.emit(WeaponEvent::ReloadPhase { phase: 2, empty: episode.empty });
        }
        (ReloadKind::Magazine, _) => finish(state, ctx),
        (ReloadKind::Procedural, STAGE_START) => {
            episode.phase = STAGE_DECIDE;
            episode.deadline = now;
            state.reload = Some(episode);
            ctx.emit(WeaponEvent::ProceduralStage { stage: STAGE_DECIDE });
        }
        (ReloadKind::Procedural, STAGE_DECIDE) => {
            if state.can_insert(settings) {
                episode.phase = STAGE_INSERT_BEGIN;
                episode.deadline = now + settings.procedural.insert as f64;
            } else {
                episode.phase = STAGE_END;
                episode.deadline = now + settings.procedural.end as f64;
            }
            state.reload = Some(episode);
            ctx.emit(WeaponEvent::ProceduralStage { stage: episode.phase });
        }
        (ReloadKind::Procedural, STAGE_INSERT_BEGIN) => {
            insert_round(state, ctx.flags.unlimited_reloads);
            episode.phase = STAGE_INSERT_END;
            episode.deadline = now + settings.procedural.insert as f64;
            state.reload = Some(episode);
            ctx.emit(WeaponEvent::ProceduralStage { stage: STAGE_INSERT_END });
        }
        (ReloadKind::Procedural, STAGE_INSERT_END) => {
            if state.can_insert(settings) {
                insert_round(state, ctx.flags.unlimited_reloads);
                episode.deadline = now + settings.procedural.insert as f64;
                state.reload = Some(episode);
                ctx.emit(WeaponEvent::ProceduralStage { stage: STAGE_INSERT_END });
            } else {
                episode.phase = STAGE_END;
                episode.deadline = now + settings.procedural.end as f64;
                state.reload = Some(episode);
                ctx.emit(WeaponEvent::ProceduralStage { stage: STAGE_END });
            }
        }
        (ReloadKind::Procedural, _) => finish(state, ctx),
    }
}

/// Abort a procedural episode so the pending shot can fire
pub fn cancel(state: &mut GunState, ctx: &mut WeaponContext<'_>) {
    if let Some(episode) = state.reload.take() {
        debug!(actor_id = %ctx.actor, weapon = %ctx.weapon, phase = episode.phase, "Reload cancelled");
        ctx.emit(WeaponEvent::ReloadPhase { phase: 0, empty: episode.empty });
    }
}

fn finish(state: &mut GunState, ctx: &mut WeaponContext<'_>) {
    if let Some(episode) = state.reload.take() {
        debug!(
            actor_id = %ctx.actor,
            weapon = %ctx.weapon,
            magazine = state.magazine,
            reserve = state.reserve,
            "Reload finished"
        );
        ctx.emit(WeaponEvent::ReloadPhase { phase: 0, empty: episode.empty });
    }
}

fn insert_round(state: &mut GunState, unlimited_reloads: bool) {
    if state.reserve > 0 {
        state.transfer(1, unlimited_reloads);
    }
}

/// Mirror an owner reload event
pub fn apply(settings: &GunSettings, state: &mut GunState, event: &WeaponEvent, now: f64, unlimited_reloads: bool) {
    match *event {
        WeaponEvent::ReloadPhase { phase: 0, .. } => state.reload = None,
        WeaponEvent::ReloadPhase { phase: 1, empty } => {
            state.bolt = BoltState::default();
            state.burst = BurstState::default();
            state.reload = Some(ReloadEpisode {
                kind: ReloadKind::Magazine,
                phase: 1,
                deadline: f64::INFINITY,
                empty,
                started_at: now,
            });
        }
        WeaponEvent::ReloadPhase { phase, empty } => {
            let amount = state.transfer_amount(settings);
            state.transfer(amount, unlimited_reloads);
            state.reload = Some(ReloadEpisode {
                kind: ReloadKind::Magazine,
                phase,
                deadline: f64::INFINITY,
                empty,
                started_at: state.reload.map(|e| e.started_at).unwrap_or(now),
            });
        }
        WeaponEvent::ProceduralStage { stage } => {
            if stage == STAGE_START {
                state.bolt = BoltState::default();
                state.burst = BurstState::default();
            }
            if stage == STAGE_INSERT_END {
                insert_round(state, unlimited_reloads);
            }
            let empty = state.reload.map(|e| e.empty).unwrap_or(state.magazine == 0);
            state.reload = Some(ReloadEpisode {
                kind: ReloadKind::Procedural,
                phase: stage,
                deadline: f64::INFINITY,
                empty,
                started_at: state.reload.map(|e| e.started_at).unwrap_or(now),
            });
        }
        _ => {}
    }
}
