//! Damage requests and the damage-receiver seam

use glam::Vec3;

use super::physics::{ActorId, TargetId};
use super::resolve::Impact;

/// One application of damage, in the shape damage receivers consume
#[derive(Debug, Clone, PartialEq)]
pub struct DamageRequest {
    pub target: TargetId,
    pub amount: f32,
    /// Catalog id of the weapon that caused it (-1 for injected weapons)
    pub weapon_id: i32,
    pub source_position: Vec3,
    pub direction: Vec3,
    pub force: f32,
    pub hit_point: Vec3,
    pub attacker_is_bot: bool,
    pub attacker: ActorId,
}

/// Attacker-side facts attached to every request from one shot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotSource {
    pub attacker: ActorId,
    pub attacker_is_bot: bool,
    pub weapon_id: i32,
    pub position: Vec3,
    pub direction: Vec3,
    pub force: f32,
}

impl ShotSource {
    /// Damage request for an impact, `None` for non-damageable colliders
    pub fn request_for(&self, impact: &Impact) -> Option<DamageRequest> {
        let target = impact.target?;
        (impact.damage > 0.0).then(|| DamageRequest {
            target,
            amount: impact.damage,
            weapon_id: self.weapon_id,
            source_position: self.position,
            direction: self.direction,
            force: self.force,
            hit_point: impact.point,
            attacker_is_bot: self.attacker_is_bot,
            attacker: self.attacker,
        })
    }
}

/// Something that can take damage
pub trait DamageTarget {
    /// Returns whether the hit was accepted
    fn apply_damage(&mut self, request: &DamageRequest) -> bool;
}
