//! Bullet simulation settings shared by hit-scan and projectile resolution

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::physics::HitMask;

/// Piecewise-linear distance → damage multiplier curve.
///
/// Keys are `(distance, multiplier)` sorted by distance. Outside the key range
/// the nearest end value holds. An empty curve is a constant 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DropoffCurve {
    keys: Vec<(f32, f32)>,
}

impl DropoffCurve {
    pub fn new(mut keys: Vec<(f32, f32)>) -> Self {
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    pub fn constant() -> Self {
        Self::default()
    }

    pub fn evaluate(&self, distance: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 1.0,
        };
        if distance <= first.0 {
            return first.1;
        }
        if distance >= last.0 {
            return last.1;
        }
        for pair in self.keys.windows(2) {
            let (d0, m0) = pair[0];
            let (d1, m1) = pair[1];
            if distance >= d0 && distance <= d1 {
                let span = d1 - d0;
                if span <= f32::EPSILON {
                    return m1;
                }
                let t = (distance - d0) / span;
                return m0 + (m1 - m0) * t;
            }
        }
        last.1
    }
}

/// Spread configuration.
///
/// Each axis of a sample is `uniform(-base, +base)` plus
/// `uniform(-add, +add) × speed / reference_velocity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadSettings {
    pub hip_base: f32,
    pub hip_velocity_add: f32,
    pub aim_base: f32,
    pub aim_velocity_add: f32,
    pub reference_velocity: f32,
    /// Optional per-shot offset table for automatic weapons
    pub spray_pattern: Vec<Vec2>,
    /// Accumulator units recovered per second while not firing
    pub spray_decay: f32,
}

impl SpreadSettings {
    pub fn spray_active(&self) -> bool {
        !self.spray_pattern.is_empty()
    }
}

impl Default for SpreadSettings {
    fn default() -> Self {
        Self {
            hip_base: 0.03,
            hip_velocity_add: 0.04,
            aim_base: 0.005,
            aim_velocity_add: 0.01,
            reference_velocity: 6.0,
            spray_pattern: Vec::new(),
            spray_decay: 8.0,
        }
    }
}

/// Everything a bullet needs once it leaves the barrel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletSimulationSettings {
    pub damage: f32,
    pub dropoff: DropoffCurve,
    /// Physical projectile speed in m/s
    pub speed: f32,
    pub gravity_multiplier: f32,
    pub penetration_enabled: bool,
    pub penetration_budget: u32,
    pub spread: SpreadSettings,
    /// Physical projectile life time in seconds
    pub life_time: f32,
    pub stick_after_death: bool,
    pub stick_duration: f32,
    pub hit_mask: HitMask,
    /// Impulse handed to damage receivers
    pub force: f32,
}

impl Default for BulletSimulationSettings {
    fn default() -> Self {
        Self {
            damage: 25.0,
            dropoff: DropoffCurve::constant(),
            speed: 400.0,
            gravity_multiplier: 1.0,
            penetration_enabled: false,
            penetration_budget: 0,
            spread: SpreadSettings::default(),
            life_time: 3.0,
            stick_after_death: false,
            stick_duration: 0.0,
            hit_mask: HitMask::all(),
            force: 50.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_curve_is_identity() {
        assert_eq!(DropoffCurve::constant().evaluate(123.0), 1.0);
    }

    #[test]
    fn curve_interpolates_and_clamps() {
        let curve = DropoffCurve::new(vec![(50.0, 0.5), (10.0, 1.0)]);
        assert_eq!(curve.evaluate(0.0), 1.0);
        assert!((curve.evaluate(30.0) - 0.75).abs() < 1e-6);
        assert_eq!(curve.evaluate(500.0), 0.5);
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let json = r#"{ "damage": 40.0, "penetration_enabled": true, "penetration_budget": 4 }"#;
        let settings: BulletSimulationSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.damage, 40.0);
        assert!(settings.penetration_enabled);
        assert_eq!(settings.life_time, 3.0);
    }
}
