//! Team rules and damage filtering for a session

use std::collections::HashMap;

use crate::config::SimFlags;
use crate::hit::physics::ActorId;
use crate::weapons::env::GameRules;

/// Team membership; actors without a team are everyone's enemy
#[derive(Debug, Clone, Default)]
pub struct TeamRules {
    teams: HashMap<ActorId, u8>,
    allow_drop: bool,
}

impl TeamRules {
    pub fn new(allow_drop: bool) -> Self {
        Self {
            teams: HashMap::new(),
            allow_drop,
        }
    }

    pub fn assign(&mut self, actor: ActorId, team: Option<u8>) {
        match team {
            Some(team) => {
                self.teams.insert(actor, team);
            }
            None => {
                self.teams.remove(&actor);
            }
        }
    }

    pub fn remove(&mut self, actor: &ActorId) {
        self.teams.remove(actor);
    }

    pub fn team_of(&self, actor: &ActorId) -> Option<u8> {
        self.teams.get(actor).copied()
    }
}

impl GameRules for TeamRules {
    fn are_enemies(&self, a: ActorId, b: ActorId) -> bool {
        if a == b {
            return false;
        }
        match (self.teams.get(&a), self.teams.get(&b)) {
            (Some(ta), Some(tb)) => ta != tb,
            _ => true,
        }
    }

    fn can_drop_weapons(&self) -> bool {
        self.allow_drop
    }
}

/// Whether `attacker` may damage `target` under the session rules
pub fn should_damage(rules: &dyn GameRules, flags: SimFlags, attacker: ActorId, target: ActorId) -> bool {
    attacker != target && (flags.friendly_fire || rules.are_enemies(attacker, target))
}
