//! Session hosting: actors, rules and the tick loop

pub mod actor;
pub mod rules;
pub mod session;

pub use actor::{ActorWeapons, PlayerActor};
pub use rules::{should_damage, TeamRules};
pub use session::{Outbound, SessionHandle, SessionRegistry, SessionSettings, WeaponSession};

use bytes::Bytes;

use crate::hit::physics::ActorId;
use crate::ws::protocol::ClientMsg;

/// Player traffic received from a WebSocket
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub actor_id: ActorId,
    pub msg: Inbound,
    pub received_at: u64,
}

#[derive(Debug, Clone)]
pub enum Inbound {
    /// JSON control message
    Client(ClientMsg),
    /// Binary replication frame from a client-owned simulation
    Frame(Bytes),
}
