//! Session state and the fixed-step tick loop

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use glam::Vec3;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{Config, SimFlags};
use crate::hit::damage::{DamageRequest, DamageTarget};
use crate::hit::physics::{ActorId, ColliderInfo, CollisionWorld, HitMask, Shape};
use crate::hit::pool::HandlePool;
use crate::hit::projectile::ProjectileSystem;
use crate::net::authority::HitAuthority;
use crate::net::cadence::{PeriodicCadence, ReplicationStats};
use crate::net::codec::{decode_frame, encode_event, encode_periodic, Frame};
use crate::net::events::{Outbox, WeaponEvent};
use crate::util::time::SimClock;
use crate::weapons::catalog::{Loadout, WeaponCatalog};
use crate::weapons::manager::DroppedWeapon;
use crate::weapons::slot::{self, WeaponRef};
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::actor::{PlayerActor, TickEnv, HITBOX_HALF_EXTENTS};
use super::rules::{should_damage, TeamRules};
use super::{Inbound, PlayerInput};

pub const DEFAULT_MAX_PLAYERS: usize = 16;
/// Furthest a dropped weapon can be picked up from
pub const PICKUP_RANGE: f32 = 3.0;
/// Client frames buffered per actor between two ticks
pub const MAX_PENDING_FRAMES: usize = 128;

/// Everything a session sends towards its connections
#[derive(Debug, Clone)]
pub enum Outbound {
    /// JSON control message, to one actor or everyone
    Control { to: Option<ActorId>, msg: ServerMsg },
    /// Binary replication frame, skipped for `except`
    Frame { except: Option<ActorId>, bytes: Bytes },
}

impl Outbound {
    /// Whether the connection of `actor` should receive this
    pub fn is_for(&self, actor: ActorId) -> bool {
        match self {
            Outbound::Control { to, .. } => to.map_or(true, |to| to == actor),
            Outbound::Frame { except, .. } => *except != Some(actor),
        }
    }
}

/// Per-session tuning, derived from the server config
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub tick_rate: u32,
    /// Ticks between periodic state frames
    pub snapshot_interval: u32,
    pub max_players: usize,
    pub flags: SimFlags,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick_rate: config.simulation_tps,
            snapshot_interval: config.snapshot_interval() as u32,
            max_players: config.max_players,
            flags: config.flags,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tick_rate: crate::util::time::DEFAULT_SIMULATION_TPS,
            snapshot_interval: 3,
            max_players: DEFAULT_MAX_PLAYERS,
            flags: SimFlags {
                allow_weapon_drop: true,
                ..SimFlags::default()
            },
        }
    }
}

/// A weapon lying in the world
#[derive(Debug, Clone, PartialEq)]
pub struct WorldDrop {
    pub position: Vec3,
    pub weapon: DroppedWeapon,
}

/// Session state (owned by the session task)
pub struct SessionState {
    pub id: Uuid,
    pub seed: u64,
    pub clock: SimClock,
    pub settings: SessionSettings,
    pub authority: HitAuthority,
    pub catalog: Arc<WeaponCatalog>,
    pub rules: TeamRules,
    pub actors: HashMap<ActorId, PlayerActor>,
    /// Join order, so every tick walks actors the same way
    order: Vec<ActorId>,
    pub world: CollisionWorld,
    pub pool: HandlePool,
    pub projectiles: ProjectileSystem,
    pub drops: HashMap<u64, WorldDrop>,
    next_drop_id: u64,
    pub stats: ReplicationStats,
}

impl SessionState {
    pub fn new(id: Uuid, seed: u64, settings: SessionSettings, catalog: Arc<WeaponCatalog>) -> Self {
        Self {
            id,
            seed,
            clock: SimClock::new(settings.tick_rate),
            settings,
            authority: HitAuthority::from_flags(settings.flags),
            catalog,
            rules: TeamRules::new(settings.flags.allow_weapon_drop),
            actors: HashMap::new(),
            order: Vec::new(),
            world: CollisionWorld::new(),
            pool: HandlePool::new(),
            projectiles: ProjectileSystem::new(),
            drops: HashMap::new(),
            next_drop_id: 1,
            stats: ReplicationStats::default(),
        }
    }

    pub fn actor(&self, id: &ActorId) -> Option<&PlayerActor> {
        self.actors.get(id)
    }

    pub fn actor_mut(&mut self, id: &ActorId) -> Option<&mut PlayerActor> {
        self.actors.get_mut(id)
    }

    fn add_drop(&mut self, position: Vec3, weapon: DroppedWeapon) -> u64 {
        let drop_id = self.next_drop_id;
        self.next_drop_id += 1;
        self.drops.insert(drop_id, WorldDrop { position, weapon });
        drop_id
    }
}

/// Handle to a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<PlayerInput>,
    pub out_tx: broadcast::Sender<Outbound>,
    pub player_count: Arc<AtomicUsize>,
    pub created_at: DateTime<Utc>,
}

impl SessionHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }
}

/// Registry of all active sessions
pub struct SessionRegistry {
    sessions: DashMap<Uuid, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    pub fn insert(&self, handle: SessionHandle) {
        self.sessions.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.remove(id).map(|(_, h)| h)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn total_players(&self) -> usize {
        self.sessions.iter().map(|s| s.value().player_count()).sum()
    }

    pub fn handles(&self) -> Vec<SessionHandle> {
        let mut handles: Vec<SessionHandle> = self.sessions.iter().map(|s| s.value().clone()).collect();
        handles.sort_by_key(|h| h.created_at);
        handles
    }

    /// Find a session with available slots
    pub fn find_available(&self, max_players: usize) -> Option<SessionHandle> {
        self.sessions
            .iter()
            .find(|s| s.value().player_count() < max_players)
            .map(|s| s.value().clone())
    }

    /// Start a new session task; it unregisters itself when it ends
    pub fn spawn(self: &Arc<Self>, settings: SessionSettings, catalog: Arc<WeaponCatalog>) -> SessionHandle {
        let (session, handle) = WeaponSession::new(Uuid::new_v4(), rand::random(), settings, catalog);
        self.insert(handle.clone());
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let id = session.id();
            session.run().await;
            registry.remove(&id);
        });
        handle
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative weapon session
pub struct WeaponSession {
    state: SessionState,
    input_rx: mpsc::Receiver<PlayerInput>,
    out_tx: broadcast::Sender<Outbound>,
    cadence: PeriodicCadence,
    player_count: Arc<AtomicUsize>,
    had_players: bool,
}

impl WeaponSession {
    pub fn new(id: Uuid, seed: u64, settings: SessionSettings, catalog: Arc<WeaponCatalog>) -> (Self, SessionHandle) {
        let (input_tx, input_rx) = mpsc::channel(1024);
        let (out_tx, _) = broadcast::channel(512);
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = SessionHandle {
            id,
            input_tx,
            out_tx: out_tx.clone(),
            player_count: player_count.clone(),
            created_at: Utc::now(),
        };

        let session = Self {
            state: SessionState::new(id, seed, settings, catalog),
            input_rx,
            out_tx,
            cadence: PeriodicCadence::new(settings.snapshot_interval),
            player_count,
            had_players: false,
        };

        (session, handle)
    }

    pub fn id(&self) -> Uuid {
        self.state.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    /// Run the fixed-step loop until every player has left
    pub async fn run(mut self) {
        info!(session_id = %self.state.id, tick_rate = self.state.clock.tick_rate(), "Session started");

        let mut tick_interval = interval(self.state.clock.step_duration());
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;
            self.step();

            if self.had_players && self.state.actors.is_empty() {
                info!(session_id = %self.state.id, "All players left, ending session");
                break;
            }
        }

        info!(
            session_id = %self.state.id,
            ticks = self.state.clock.tick(),
            event_frames = self.state.stats.event_frames,
            periodic_frames = self.state.stats.periodic_frames,
            total_bytes = self.state.stats.total_bytes,
            "Session ended"
        );
    }

    /// Drain pending inputs, then advance one tick
    pub fn step(&mut self) {
        self.process_inputs();
        self.run_tick();
    }

    fn send(&self, to: Option<ActorId>, msg: ServerMsg) {
        let _ = self.out_tx.send(Outbound::Control { to, msg });
    }

    fn send_frame(&mut self, except: Option<ActorId>, bytes: Bytes, periodic: bool) {
        if periodic {
            self.state.stats.record_periodic(bytes.len());
        } else {
            self.state.stats.record_event(bytes.len());
        }
        let _ = self.out_tx.send(Outbound::Frame { except, bytes });
    }

    /// Process all pending inputs from players
    fn process_inputs(&mut self) {
        while let Ok(input) = self.input_rx.try_recv() {
            let actor_id = input.actor_id;
            match input.msg {
                Inbound::Frame(bytes) => self.handle_frame(actor_id, bytes),
                Inbound::Client(msg) => self.handle_client(actor_id, msg),
            }
        }
    }

    fn handle_client(&mut self, actor_id: ActorId, msg: ClientMsg) {
        match msg {
            ClientMsg::Join {
                display_name,
                loadout,
                team,
                client_owned,
                ..
            } => {
                let name = display_name.unwrap_or_else(|| format!("Player_{}", &actor_id.to_string()[..8]));
                self.handle_join(actor_id, name, loadout.unwrap_or_else(Loadout::standard), team, client_owned);
            }
            ClientMsg::Input {
                seq,
                input,
                velocity,
                running,
                can_fire,
            } => {
                if let Some(actor) = self.state.actors.get_mut(&actor_id) {
                    actor.accept_input(seq, input, velocity, running, can_fire);
                }
            }
            ClientMsg::SelectWeapon { weapon } => {
                let accepted = self
                    .state
                    .actors
                    .get_mut(&actor_id)
                    .filter(|a| a.alive)
                    .map(|a| a.manager_mut().set_desired_weapon(weapon));
                if accepted == Some(false) {
                    self.send(Some(actor_id), ServerMsg::error("invalid_weapon", format!("Cannot select {weapon}")));
                }
            }
            ClientMsg::Restock { catalog_id } => {
                if let Some(actor) = self.state.actors.get_mut(&actor_id) {
                    let refilled = actor.manager_mut().restock_ammo(catalog_id);
                    debug!(actor_id = %actor_id, catalog_id, refilled, "Ammo restocked");
                }
            }
            ClientMsg::Interact { interactable } => {
                if let Some(actor) = self.state.actors.get_mut(&actor_id).filter(|a| a.alive) {
                    match interactable {
                        Some(id) => actor.manager_mut().hold_interactable(id),
                        None => {
                            actor.manager_mut().release_interactable();
                        }
                    }
                }
            }
            ClientMsg::Pickup { drop_id, weapon } => self.handle_pickup(actor_id, drop_id, weapon),
            ClientMsg::Ping { t } => self.send(Some(actor_id), ServerMsg::Pong { t }),
            ClientMsg::Leave => self.handle_leave(actor_id),
        }
    }

    /// Handle a join request
    fn handle_join(&mut self, actor_id: ActorId, display_name: String, loadout: Loadout, team: Option<u8>, client_owned: bool) {
        if self.state.actors.contains_key(&actor_id) {
            warn!(actor_id = %actor_id, "Actor already in session");
            return;
        }
        if self.state.actors.len() >= self.state.settings.max_players {
            self.send(Some(actor_id), ServerMsg::error("session_full", "Session is full"));
            return;
        }

        let state = &mut self.state;
        let collider = state.world.insert(
            Shape::cuboid(Vec3::ZERO, HITBOX_HALF_EXTENTS),
            ColliderInfo::solid(0)
                .on_layer(HitMask::ACTORS)
                .with_root(actor_id)
                .with_target(actor_id),
        );
        let actor = match PlayerActor::new(
            actor_id,
            display_name,
            team,
            loadout,
            &state.catalog,
            client_owned,
            state.seed,
            collider,
        ) {
            Ok(actor) => actor,
            Err(e) => {
                state.world.remove(collider);
                warn!(actor_id = %actor_id, error = %e, "Rejected loadout");
                self.send(Some(actor_id), ServerMsg::error("invalid_loadout", e.to_string()));
                return;
            }
        };

        let info = actor.info();
        state.rules.assign(actor_id, team);
        state.actors.insert(actor_id, actor);
        state.order.push(actor_id);
        self.player_count.store(state.actors.len(), Ordering::Relaxed);
        self.had_players = true;
        self.cadence.force_next();

        self.send(None, ServerMsg::ActorJoined { actor: info });

        let actors = self
            .state
            .order
            .iter()
            .filter_map(|id| self.state.actors.get(id))
            .map(PlayerActor::info)
            .collect();
        self.send(
            Some(actor_id),
            ServerMsg::Joined {
                session_id: self.state.id,
                seed: self.state.seed,
                tick_rate: self.state.clock.tick_rate(),
                actors,
            },
        );

        info!(
            session_id = %self.state.id,
            actor_id = %actor_id,
            client_owned,
            player_count = self.state.actors.len(),
            "Actor joined session"
        );
    }

    /// Handle an actor leaving
    fn handle_leave(&mut self, actor_id: ActorId) {
        let Some(actor) = self.state.actors.remove(&actor_id) else {
            return;
        };
        self.state.order.retain(|id| *id != actor_id);
        self.state.rules.remove(&actor_id);
        self.state.world.remove(actor.collider);
        self.player_count.store(self.state.actors.len(), Ordering::Relaxed);

        self.send(
            None,
            ServerMsg::ActorLeft {
                actor_id,
                reason: "disconnected".to_string(),
            },
        );
        info!(session_id = %self.state.id, actor_id = %actor_id, "Actor left session");
    }

    /// Queue a replication frame from a client-owned simulation
    fn handle_frame(&mut self, actor_id: ActorId, bytes: Bytes) {
        let Some(actor) = self.state.actors.get_mut(&actor_id) else {
            return;
        };
        if !actor.is_client_owned() {
            warn!(actor_id = %actor_id, "Replication frame from a server-simulated actor");
            return;
        }
        let frame = match decode_frame(&bytes) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(actor_id = %actor_id, error = %e, "Malformed replication frame");
                return;
            }
        };
        let sender = match &frame {
            Frame::Event(event) => event.actor,
            Frame::Periodic(state) => state.actor,
        };
        if sender != actor_id {
            warn!(actor_id = %actor_id, claimed = %sender, "Dropping frame for another actor");
            return;
        }
        if actor.pending_frames.len() >= MAX_PENDING_FRAMES {
            warn!(actor_id = %actor_id, "Too many pending frames, dropping");
            return;
        }
        actor.pending_frames.push((frame, bytes));
    }

    /// Take a dropped weapon, leaving the replaced one in its place
    fn handle_pickup(&mut self, actor_id: ActorId, drop_id: u64, weapon: WeaponRef) {
        let state = &mut self.state;
        let Some(actor) = state.actors.get_mut(&actor_id).filter(|a| a.alive) else {
            return;
        };
        let position = actor.body_center();
        let Some(drop) = state.drops.get(&drop_id) else {
            self.send(Some(actor_id), ServerMsg::error("unknown_drop", format!("No dropped weapon {drop_id}")));
            return;
        };
        if drop.position.distance(position) > PICKUP_RANGE {
            self.send(Some(actor_id), ServerMsg::error("out_of_range", "Dropped weapon is too far away"));
            return;
        }

        match actor.manager_mut().pickup(weapon, &drop.weapon, &state.catalog) {
            Ok(previous) => {
                let drop_position = drop.position;
                state.drops.remove(&drop_id);
                let new_id = state.add_drop(drop_position, previous.clone());
                self.send(None, ServerMsg::WeaponPickedUp { drop_id, actor_id });
                self.send(
                    None,
                    ServerMsg::WeaponDropped {
                        drop_id: new_id,
                        position: drop_position,
                        weapon: previous,
                    },
                );
            }
            Err(e) => {
                self.send(Some(actor_id), ServerMsg::error("invalid_pickup", e.to_string()));
            }
        }
    }

    /// Run a single simulation tick
    fn run_tick(&mut self) {
        let tick = self.state.clock.advance();
        let now = self.state.clock.now();
        let dt = self.state.clock.dt();

        let order = self.state.order.clone();
        let mut outboxes: Vec<(ActorId, Outbox)> = Vec::with_capacity(order.len());
        let mut relays: Vec<(ActorId, Bytes)> = Vec::new();

        {
            let state = &mut self.state;
            let mut env = TickEnv {
                tick,
                now,
                dt,
                flags: state.settings.flags,
                authority: state.authority,
                world: &state.world,
                pool: &mut state.pool,
                projectiles: &mut state.projectiles,
            };
            for id in &order {
                let Some(actor) = state.actors.get_mut(id).filter(|a| a.alive) else {
                    continue;
                };
                let mut out = Outbox::new();
                for bytes in actor.simulate(&mut env, &mut out) {
                    relays.push((*id, bytes));
                }
                outboxes.push((*id, out));
            }
        }

        // projectiles spawned this tick fly from the next one
        let reports = {
            let state = &mut self.state;
            state.projectiles.step_all(now, dt, &state.world, &mut state.pool)
        };
        for report in reports {
            let attacker = report.source.attacker;
            let Some(index) = outboxes.iter().position(|(id, _)| *id == attacker) else {
                // shooter already gone; the damage still lands
                outboxes.push((
                    attacker,
                    Outbox {
                        damage: report.damage,
                        ..Outbox::default()
                    },
                ));
                continue;
            };
            {
                let out = &mut outboxes[index].1;
                let weapon = self
                    .state
                    .actors
                    .get(&attacker)
                    .filter(|a| !a.is_client_owned())
                    .and_then(|a| {
                        let slots = a.manager().slots();
                        slot::refs(slots).find(|r| {
                            slot::get(slots, *r).is_some_and(|w| w.catalog_id == report.source.weapon_id)
                        })
                    });
                if let Some(weapon) = weapon {
                    for impact in &report.impacts {
                        out.emit(
                            weapon,
                            WeaponEvent::Impact {
                                point: impact.point,
                                normal: impact.normal,
                                surface: impact.surface,
                                target: impact.target,
                                damage: impact.damage,
                            },
                        );
                    }
                }
                out.damage.extend(report.damage);
            }
        }

        for (_, out) in outboxes.iter_mut() {
            for request in std::mem::take(&mut out.damage) {
                self.apply_damage(&request);
            }
        }

        for (id, mut out) in outboxes {
            let Some(actor) = self.state.actors.get_mut(&id) else {
                continue;
            };
            if actor.is_client_owned() {
                continue;
            }
            let events = out.stamp(id, tick, &mut actor.next_seq);
            for event in &events {
                match encode_event(event) {
                    Ok(bytes) => self.send_frame(None, bytes, false),
                    Err(e) => warn!(actor_id = %id, seq = event.seq, error = %e, "Failed to encode event"),
                }
            }
        }
        for (id, bytes) in relays {
            self.send_frame(Some(id), bytes, false);
        }

        for actor in self.state.actors.values() {
            if actor.alive {
                self.state.world.move_collider(actor.collider, actor.body_center());
            }
        }

        if self.cadence.should_send() {
            self.send_periodic(tick);
        }
    }

    /// Apply one damage request under the session rules
    fn apply_damage(&mut self, request: &DamageRequest) {
        let state = &mut self.state;
        if !should_damage(&state.rules, state.settings.flags, request.attacker, request.target) {
            return;
        }
        let Some(target) = state.actors.get_mut(&request.target) else {
            return;
        };
        if !target.apply_damage(request) {
            return;
        }
        let (health, killed) = (target.health, !target.alive);

        if let Some(attacker) = state.actors.get_mut(&request.attacker) {
            attacker.stats.damage_dealt += request.amount;
            if killed {
                attacker.stats.kills += 1;
            }
        }

        self.send(
            None,
            ServerMsg::Damage {
                attacker: request.attacker,
                target: request.target,
                amount: request.amount,
                weapon_id: request.weapon_id,
                health,
                killed,
            },
        );

        if killed {
            self.handle_death(request.target);
        }
    }

    /// Drop a dead actor's weapons and take it out of hit resolution
    fn handle_death(&mut self, actor_id: ActorId) {
        let state = &mut self.state;
        let Some(actor) = state.actors.get(&actor_id) else {
            return;
        };
        let position = actor.body_center();
        let collider = actor.collider;
        let dropped = actor.manager().drop_weapons(&state.rules, state.settings.flags);
        state.world.remove(collider);

        for weapon in dropped {
            let drop_id = self.state.add_drop(position, weapon.clone());
            debug!(actor_id = %actor_id, drop_id, catalog_id = weapon.catalog_id, "Weapon dropped");
            self.send(
                None,
                ServerMsg::WeaponDropped {
                    drop_id,
                    position,
                    weapon,
                },
            );
        }
    }

    /// Periodic state frames for server-simulated actors, status for all
    fn send_periodic(&mut self, tick: u64) {
        let mut frames = Vec::new();
        let mut statuses = Vec::new();
        for id in &self.state.order {
            let Some(actor) = self.state.actors.get(id) else {
                continue;
            };
            let manager = actor.manager();
            if !actor.is_client_owned() {
                let periodic = manager.periodic_state(*id, tick, &actor.input);
                match encode_periodic(&periodic) {
                    Ok(bytes) => frames.push(bytes),
                    Err(e) => warn!(actor_id = %id, error = %e, "Failed to encode periodic state"),
                }
            }
            let status = manager.weapon_state();
            statuses.push(ServerMsg::Status {
                actor_id: *id,
                tick,
                current: manager.current_weapon(),
                ready: status.ready,
                reloading: status.reloading,
                empty: status.empty,
            });
        }
        for bytes in frames {
            self.send_frame(None, bytes, true);
        }
        for msg in statuses {
            self.send(None, msg);
        }
    }
}
