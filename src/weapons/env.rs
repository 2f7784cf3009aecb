//! Predicates the weapon core queries from the rest of the game

use glam::Vec3;

use crate::hit::physics::ActorId;

/// Movement facts about the actor holding the weapons
pub trait Movement {
    /// Movement-side gate, e.g. false while vaulting or sprinting
    fn can_fire(&self) -> bool;
    fn current_velocity(&self) -> Vec3;
    fn is_running(&self) -> bool;
    /// Simulation time the actor last ran
    fn last_run_time(&self) -> f64;
}

/// Game-mode rules
pub trait GameRules {
    fn are_enemies(&self, a: ActorId, b: ActorId) -> bool;
    fn can_drop_weapons(&self) -> bool;
}

/// Plain movement sample, refreshed by the host every tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub can_fire: bool,
    pub velocity: Vec3,
    pub running: bool,
    pub last_run_time: f64,
}

impl Default for MotionSample {
    fn default() -> Self {
        Self {
            can_fire: true,
            velocity: Vec3::ZERO,
            running: false,
            last_run_time: f64::NEG_INFINITY,
        }
    }
}

impl Movement for MotionSample {
    fn can_fire(&self) -> bool {
        self.can_fire
    }

    fn current_velocity(&self) -> Vec3 {
        self.velocity
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn last_run_time(&self) -> f64 {
        self.last_run_time
    }
}
