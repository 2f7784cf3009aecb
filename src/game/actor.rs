//! Player actors hosted by a session

use bytes::Bytes;
use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::config::SimFlags;
use crate::error::LoadoutError;
use crate::hit::damage::{DamageRequest, DamageTarget};
use crate::hit::physics::{ActorId, ColliderId, CollisionWorld};
use crate::hit::pool::HandlePool;
use crate::hit::projectile::ProjectileSystem;
use crate::net::authority::{resolves_hits, HitAuthority, Host};
use crate::net::codec::Frame;
use crate::net::events::{Outbox, WeaponEvent};
use crate::net::replica::Replica;
use crate::weapons::behavior::{Role, WeaponContext};
use crate::weapons::catalog::{Loadout, WeaponCatalog};
use crate::weapons::env::MotionSample;
use crate::weapons::input::WeaponInput;
use crate::weapons::manager::WeaponManager;
use crate::weapons::slot::{WeaponRef, INJECTED_CATALOG_ID};
use crate::ws::protocol::ActorInfo;

pub const MAX_HEALTH: f32 = 100.0;
/// Eye height above the body's feet; input origins are eye positions
pub const EYE_HEIGHT: f32 = 1.6;
pub const HITBOX_HALF_EXTENTS: Vec3 = Vec3::new(0.35, 0.9, 0.35);

/// Which simulation drives an actor's weapons
#[derive(Debug)]
pub enum ActorWeapons {
    /// Simulated here from the client's input
    Owned(WeaponManager),
    /// Simulated by the client, mirrored here from its frames
    Mirrored(Replica),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActorStats {
    pub kills: u32,
    pub damage_dealt: f32,
    pub damage_taken: f32,
}

#[derive(Debug)]
pub struct PlayerActor {
    pub id: ActorId,
    pub display_name: String,
    pub team: Option<u8>,
    pub is_bot: bool,
    pub loadout: Loadout,
    pub health: f32,
    pub alive: bool,
    pub input: WeaponInput,
    pub motion: MotionSample,
    pub last_input_seq: Option<u32>,
    pub weapons: ActorWeapons,
    pub rng: ChaCha8Rng,
    /// Last sequence number stamped on this actor's events
    pub next_seq: u32,
    pub collider: ColliderId,
    /// Frames received from a client-owned simulation, applied next tick
    pub pending_frames: Vec<(Frame, Bytes)>,
    pub stats: ActorStats,
}

impl PlayerActor {
    pub fn new(
        id: ActorId,
        display_name: String,
        team: Option<u8>,
        loadout: Loadout,
        catalog: &WeaponCatalog,
        client_owned: bool,
        session_seed: u64,
        collider: ColliderId,
    ) -> Result<Self, LoadoutError> {
        let weapons = if client_owned {
            ActorWeapons::Mirrored(Replica::from_loadout(id, &loadout, catalog)?)
        } else {
            ActorWeapons::Owned(WeaponManager::from_loadout(&loadout, catalog, Role::Owner)?)
        };
        let (hi, lo) = id.as_u64_pair();
        Ok(Self {
            id,
            display_name,
            team,
            is_bot: false,
            loadout,
            health: MAX_HEALTH,
            alive: true,
            input: WeaponInput::default(),
            motion: MotionSample::default(),
            last_input_seq: None,
            weapons,
            rng: ChaCha8Rng::seed_from_u64(session_seed ^ hi ^ lo.rotate_left(17)),
            next_seq: 0,
            collider,
            pending_frames: Vec::new(),
            stats: ActorStats::default(),
        })
    }

    pub fn info(&self) -> ActorInfo {
        ActorInfo {
            actor_id: self.id,
            display_name: self.display_name.clone(),
            team: self.team,
            client_owned: self.is_client_owned(),
            loadout: self.loadout.clone(),
        }
    }

    pub fn is_client_owned(&self) -> bool {
        matches!(self.weapons, ActorWeapons::Mirrored(_))
    }

    pub fn role(&self) -> Role {
        match self.weapons {
            ActorWeapons::Owned(_) => Role::Owner,
            ActorWeapons::Mirrored(_) => Role::Replica,
        }
    }

    pub fn manager(&self) -> &WeaponManager {
        match &self.weapons {
            ActorWeapons::Owned(manager) => manager,
            ActorWeapons::Mirrored(replica) => replica.manager(),
        }
    }

    pub fn manager_mut(&mut self) -> &mut WeaponManager {
        match &mut self.weapons {
            ActorWeapons::Owned(manager) => manager,
            ActorWeapons::Mirrored(replica) => replica.manager_mut(),
        }
    }

    /// Center of the body hitbox
    pub fn body_center(&self) -> Vec3 {
        let eye = match &self.weapons {
            ActorWeapons::Owned(_) => self.input.origin,
            ActorWeapons::Mirrored(replica) => replica.input().origin,
        };
        eye - Vec3::Y * (EYE_HEIGHT - HITBOX_HALF_EXTENTS.y)
    }

    /// Accept a newer input sample. Returns false for stale or duplicate ones.
    pub fn accept_input(&mut self, seq: u32, input: WeaponInput, velocity: Vec3, running: bool, can_fire: bool) -> bool {
        if !self.alive || self.last_input_seq.is_some_and(|last| seq <= last) {
            return false;
        }
        self.last_input_seq = Some(seq);
        self.input = input;
        self.motion.velocity = velocity;
        self.motion.running = running;
        self.motion.can_fire = can_fire;
        true
    }
}

/// Session-wide state one actor tick borrows
pub struct TickEnv<'a> {
    pub tick: u64,
    pub now: f64,
    pub dt: f32,
    pub flags: SimFlags,
    pub authority: HitAuthority,
    pub world: &'a CollisionWorld,
    pub pool: &'a mut HandlePool,
    pub projectiles: &'a mut ProjectileSystem,
}

impl PlayerActor {
    /// Run this actor's weapons for one tick.
    ///
    /// Owned actors are driven by their latest input. Mirrored actors first
    /// apply the frames their client sent since the last tick; the accepted
    /// raw frames are returned for relay to the other peers.
    pub fn simulate(&mut self, env: &mut TickEnv<'_>, out: &mut Outbox) -> Vec<Bytes> {
        if self.motion.running {
            self.motion.last_run_time = env.now;
        }
        let role = self.role();
        let resolve_hits = resolves_hits(env.authority, role, Host::Server);
        let PlayerActor {
            id,
            is_bot,
            input,
            motion,
            rng,
            weapons,
            pending_frames,
            ..
        } = self;

        let mut ctx = WeaponContext {
            actor: *id,
            is_bot: *is_bot,
            role,
            resolve_hits,
            now: env.now,
            dt: env.dt,
            flags: env.flags,
            input: input.clone(),
            motion: &*motion,
            world: env.world,
            pool: &mut *env.pool,
            projectiles: &mut *env.projectiles,
            rng,
            out,
            weapon: WeaponRef::default(),
            catalog_id: INJECTED_CATALOG_ID,
        };

        let mut relay = Vec::new();
        match weapons {
            ActorWeapons::Owned(manager) => manager.update(&mut ctx),
            ActorWeapons::Mirrored(replica) => {
                for (frame, bytes) in pending_frames.drain(..) {
                    let applied = match &frame {
                        Frame::Event(event) => {
                            let applied = replica.apply_event(event, &mut ctx);
                            if applied && !resolve_hits {
                                if let Some(request) = reported_damage(replica, event.weapon, &event.event) {
                                    ctx.out.damage.push(request);
                                }
                            }
                            applied
                        }
                        Frame::Periodic(state) => replica.apply_periodic(state),
                    };
                    if applied {
                        relay.push(bytes);
                    }
                }
                replica.update(&mut ctx);
                // the client's own frames carry whatever it announced
                ctx.out.events.clear();
            }
        }
        trace!(actor_id = %self.id, tick = env.tick, relayed = relay.len(), "Actor simulated");
        relay
    }
}

/// Damage a firing client reports through its own impact events
fn reported_damage(replica: &Replica, weapon: WeaponRef, event: &WeaponEvent) -> Option<DamageRequest> {
    let WeaponEvent::Impact {
        point,
        target: Some(target),
        damage,
        ..
    } = *event
    else {
        return None;
    };
    if damage <= 0.0 {
        return None;
    }
    let origin = replica.input().origin;
    let weapon_id = replica
        .manager()
        .weapon(weapon)
        .map(|w| w.catalog_id)
        .unwrap_or(INJECTED_CATALOG_ID);
    Some(DamageRequest {
        target,
        amount: damage,
        weapon_id,
        source_position: origin,
        direction: (point - origin).normalize_or_zero(),
        force: 0.0,
        hit_point: point,
        attacker_is_bot: false,
        attacker: replica.actor(),
    })
}

impl DamageTarget for PlayerActor {
    fn apply_damage(&mut self, request: &DamageRequest) -> bool {
        if !self.alive || request.amount <= 0.0 {
            return false;
        }
        self.health = (self.health - request.amount).max(0.0);
        self.stats.damage_taken += request.amount;
        if self.health <= 0.0 {
            self.alive = false;
            debug!(actor_id = %self.id, attacker = %request.attacker, "Actor killed");
        }
        true
    }
}
