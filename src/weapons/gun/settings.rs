//! Gun definition data

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::hit::ballistics::BulletSimulationSettings;
use crate::hit::pool::PrefabId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireMode {
    Semi,
    Auto,
    Burst,
    BoltAction,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireType {
    #[default]
    Simple,
    Pellets,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulletMode {
    #[default]
    Hitscan,
    Projectile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadMode {
    #[default]
    Simple,
    FullEmpty,
    Chambered,
    Procedural,
    ProceduralChambered,
}

impl ReloadMode {
    pub fn is_procedural(self) -> bool {
        matches!(self, ReloadMode::Procedural | ReloadMode::ProceduralChambered)
    }

    pub fn is_chambered(self) -> bool {
        matches!(self, ReloadMode::Chambered | ReloadMode::ProceduralChambered)
    }
}

/// Ammo transfer point and total length of one reload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReloadTiming {
    pub ammo_at: f32,
    pub duration: f32,
}

impl ReloadTiming {
    pub const fn new(ammo_at: f32, duration: f32) -> Self {
        Self { ammo_at, duration }
    }
}

/// Stage durations of a round-by-round reload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProceduralTiming {
    pub start: f32,
    /// One round inserted per `insert`
    pub insert: f32,
    pub end: f32,
}

impl Default for ProceduralTiming {
    fn default() -> Self {
        Self {
            start: 0.4,
            insert: 0.5,
            end: 0.4,
        }
    }
}

/// Randomized recoil impulse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoilSettings {
    pub min: Vec2,
    pub max: Vec2,
    /// Time over which one impulse is applied
    pub ramp_time: f32,
    /// Radians per second back towards rest
    pub return_speed: f32,
}

impl Default for RecoilSettings {
    fn default() -> Self {
        Self {
            min: Vec2::new(-0.004, 0.008),
            max: Vec2::new(0.004, 0.014),
            ramp_time: 0.06,
            return_speed: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimSettings {
    pub in_time: f32,
    pub out_time: f32,
    /// Look sensitivity at full aim
    pub sensitivity: f32,
    /// Movement speed multiplier at full aim
    pub speed_multiplier: f32,
    pub allow_while_reloading: bool,
}

impl Default for AimSettings {
    fn default() -> Self {
        Self {
            in_time: 0.2,
            out_time: 0.15,
            sensitivity: 0.6,
            speed_multiplier: 0.7,
            allow_while_reloading: false,
        }
    }
}

/// Everything that defines one gun model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GunSettings {
    pub name: String,
    /// Selectable modes, the first is the default
    pub fire_modes: Vec<FireMode>,
    pub rpm: f32,
    pub burst_count: u32,
    pub burst_delay: f32,
    /// Time the bolt blocks the next shot
    pub bolt_cycle_time: f32,
    /// Delay from the shot until the bolt ejects the case
    pub bolt_eject_delay: f32,
    pub dry_fire_penalty: f32,
    pub auto_reload: bool,
    /// No shot until this long after the actor stopped running
    pub run_fire_delay: f32,
    pub fire_type: FireType,
    pub pellets: u32,
    pub bullet_mode: BulletMode,
    pub range: f32,
    pub bullet: BulletSimulationSettings,
    pub projectile_prefab: PrefabId,
    pub shell_eject_delay: f32,
    pub magazine_size: u32,
    pub max_reserve: u32,
    pub reload_mode: ReloadMode,
    /// Reload with rounds left in the magazine
    pub reload: ReloadTiming,
    /// Reload from an empty magazine (`FullEmpty`, `Chambered`)
    pub reload_empty: ReloadTiming,
    pub procedural: ProceduralTiming,
    pub recoil: RecoilSettings,
    pub aim: AimSettings,
    pub draw_time: f32,
    pub putaway_time: f32,
}

impl Default for GunSettings {
    fn default() -> Self {
        Self {
            name: "gun".to_string(),
            fire_modes: vec![FireMode::Semi],
            rpm: 600.0,
            burst_count: 3,
            burst_delay: 0.07,
            bolt_cycle_time: 1.0,
            bolt_eject_delay: 0.5,
            dry_fire_penalty: 0.3,
            auto_reload: true,
            run_fire_delay: 0.1,
            fire_type: FireType::Simple,
            pellets: 1,
            bullet_mode: BulletMode::Hitscan,
            range: 300.0,
            bullet: BulletSimulationSettings::default(),
            projectile_prefab: 0,
            shell_eject_delay: 0.05,
            magazine_size: 30,
            max_reserve: 90,
            reload_mode: ReloadMode::Simple,
            reload: ReloadTiming::new(1.2, 2.0),
            reload_empty: ReloadTiming::new(1.5, 2.5),
            procedural: ProceduralTiming::default(),
            recoil: RecoilSettings::default(),
            aim: AimSettings::default(),
            draw_time: 0.5,
            putaway_time: 0.4,
        }
    }
}

impl GunSettings {
    /// Seconds between two shots
    pub fn fire_rate(&self) -> f64 {
        if self.rpm > 0.0 {
            60.0 / self.rpm as f64
        } else {
            f64::INFINITY
        }
    }

    pub fn fire_mode(&self, index: u8) -> FireMode {
        self.fire_modes
            .get(index as usize)
            .or_else(|| self.fire_modes.first())
            .copied()
            .unwrap_or(FireMode::Semi)
    }

    /// Most rounds the magazine may hold after a reload
    pub fn reload_cap(&self) -> u32 {
        if self.reload_mode.is_chambered() {
            self.magazine_size + 1
        } else {
            self.magazine_size
        }
    }

    /// Hit samples per shot
    pub fn samples_per_shot(&self) -> u32 {
        match self.fire_type {
            FireType::Simple => 1,
            FireType::Pellets => self.pellets.max(1),
        }
    }

    pub fn timing_for(&self, empty: bool) -> ReloadTiming {
        match self.reload_mode {
            ReloadMode::FullEmpty | ReloadMode::Chambered if empty => self.reload_empty,
            _ => self.reload,
        }
    }
}
