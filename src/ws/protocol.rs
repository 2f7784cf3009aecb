//! WebSocket protocol message definitions
//!
//! Control traffic is JSON text; replication frames travel as binary
//! messages encoded by [`crate::net::codec`].

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::weapons::catalog::Loadout;
use crate::weapons::input::WeaponInput;
use crate::weapons::manager::DroppedWeapon;
use crate::weapons::slot::WeaponRef;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Join a session
    Join {
        /// Specific session, otherwise the first one with room
        session_id: Option<Uuid>,
        display_name: Option<String>,
        /// Standard loadout when absent
        loadout: Option<Loadout>,
        team: Option<u8>,
        /// The client simulates its own weapons and streams binary frames
        #[serde(default)]
        client_owned: bool,
    },

    /// Sampled input for one tick
    Input {
        /// Monotonic per-connection sequence, stale inputs are dropped
        seq: u32,
        input: WeaponInput,
        #[serde(default)]
        velocity: Vec3,
        #[serde(default)]
        running: bool,
        #[serde(default = "default_true")]
        can_fire: bool,
    },

    /// Explicit weapon selection
    SelectWeapon { weapon: WeaponRef },

    /// Refill reserves of one catalog weapon
    Restock { catalog_id: i32 },

    /// Start or stop holding an interactable
    Interact { interactable: Option<u64> },

    /// Take a dropped weapon into a slot
    Pickup { drop_id: u64, weapon: WeaponRef },

    /// Ping for latency measurement
    Ping { t: u64 },

    /// Leave the current session
    Leave,
}

fn default_true() -> bool {
    true
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome { actor_id: Uuid, server_time: u64 },

    /// Confirmation of a session join
    Joined {
        session_id: Uuid,
        seed: u64,
        tick_rate: u32,
        actors: Vec<ActorInfo>,
    },

    ActorJoined { actor: ActorInfo },

    ActorLeft { actor_id: Uuid, reason: String },

    /// Damage applied by the session
    Damage {
        attacker: Uuid,
        target: Uuid,
        amount: f32,
        weapon_id: i32,
        health: f32,
        killed: bool,
    },

    WeaponDropped {
        drop_id: u64,
        position: Vec3,
        weapon: DroppedWeapon,
    },

    WeaponPickedUp { drop_id: u64, actor_id: Uuid },

    /// Weapon status of one actor, sent with every periodic block
    Status {
        actor_id: Uuid,
        tick: u64,
        current: WeaponRef,
        ready: bool,
        reloading: bool,
        empty: bool,
    },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong { t: u64 },
}

/// Actor info for join notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorInfo {
    pub actor_id: Uuid,
    pub display_name: String,
    pub team: Option<u8>,
    pub client_owned: bool,
    pub loadout: Loadout,
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_message_parses_with_defaults() {
        let json = r#"{ "type": "input", "seq": 4, "input": { "fire": true, "select_slot": [false, true] } }"#;
        match serde_json::from_str::<ClientMsg>(json).unwrap() {
            ClientMsg::Input {
                seq,
                input,
                can_fire,
                running,
                ..
            } => {
                assert_eq!(seq, 4);
                assert!(input.fire);
                assert!(input.slot_pressed(1));
                assert!(can_fire);
                assert!(!running);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn join_accepts_inline_loadout() {
        let json = r#"{
            "type": "join",
            "session_id": null,
            "display_name": "Vex",
            "loadout": { "slots": [ { "weapons": [ { "catalog_id": 3, "magazine": 2 } ] } ] },
            "team": 1
        }"#;
        match serde_json::from_str::<ClientMsg>(json).unwrap() {
            ClientMsg::Join {
                loadout: Some(loadout),
                client_owned,
                ..
            } => {
                assert_eq!(loadout.slots[0].weapons[0].catalog_id, 3);
                assert_eq!(loadout.slots[0].weapons[0].magazine, Some(2));
                assert!(!client_owned);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn server_messages_are_tagged() {
        let json = serde_json::to_string(&ServerMsg::error("full", "Session is full")).unwrap();
        assert!(json.contains(r#""type":"error""#));
    }
}
