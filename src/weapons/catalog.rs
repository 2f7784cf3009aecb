//! Weapon catalog and loadouts

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ConfigError;
use crate::error::LoadoutError;
use crate::hit::ballistics::{BulletSimulationSettings, DropoffCurve, SpreadSettings};

use super::behavior::WeaponBehavior;
use super::grenade::{Grenade, GrenadeSettings};
use super::gun::{BulletMode, FireMode, FireType, Gun, GunSettings, ReloadMode, ReloadTiming};
use super::melee::{Melee, MeleeSettings};

/// Serialized weapon definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WeaponDefinition {
    Gun(GunSettings),
    Melee(MeleeSettings),
    Grenade(GrenadeSettings),
}

impl WeaponDefinition {
    pub fn build(&self) -> Arc<dyn WeaponBehavior> {
        match self {
            WeaponDefinition::Gun(settings) => Arc::new(Gun::new(settings.clone())),
            WeaponDefinition::Melee(settings) => Arc::new(Melee::new(settings.clone())),
            WeaponDefinition::Grenade(settings) => Arc::new(Grenade::new(settings.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: i32,
    pub weapon: WeaponDefinition,
}

/// Catalog id → shared behavior
#[derive(Debug, Default, Clone)]
pub struct WeaponCatalog {
    behaviors: HashMap<i32, Arc<dyn WeaponBehavior>>,
}

impl WeaponCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: &[CatalogEntry]) -> Self {
        let mut catalog = Self::new();
        for entry in entries {
            catalog.insert(entry.id, entry.weapon.build());
        }
        catalog
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
        Ok(Self::from_entries(&entries))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        info!(path = %path.display(), weapons = catalog.len(), "Weapon catalog loaded");
        Ok(catalog)
    }

    pub fn insert(&mut self, id: i32, behavior: Arc<dyn WeaponBehavior>) {
        self.behaviors.insert(id, behavior);
    }

    pub fn get(&self, id: i32) -> Result<Arc<dyn WeaponBehavior>, LoadoutError> {
        self.behaviors
            .get(&id)
            .cloned()
            .ok_or(LoadoutError::UnknownWeapon(id))
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    pub fn ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.behaviors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Catalog shipped with the server
    pub fn builtin() -> Self {
        Self::from_entries(&builtin_entries())
    }
}

pub const RIFLE: i32 = 1;
pub const PISTOL: i32 = 2;
pub const SHOTGUN: i32 = 3;
pub const SNIPER: i32 = 4;
pub const SMG: i32 = 5;
pub const CROSSBOW: i32 = 6;
pub const KNIFE: i32 = 10;
pub const FRAG: i32 = 20;

pub fn builtin_entries() -> Vec<CatalogEntry> {
    let rifle = GunSettings {
        name: "rifle".to_string(),
        fire_modes: vec![FireMode::Auto, FireMode::Burst, FireMode::Semi],
        rpm: 700.0,
        magazine_size: 30,
        max_reserve: 120,
        reload_mode: ReloadMode::FullEmpty,
        reload: ReloadTiming::new(1.3, 2.1),
        reload_empty: ReloadTiming::new(1.6, 2.6),
        bullet: BulletSimulationSettings {
            damage: 28.0,
            dropoff: DropoffCurve::new(vec![(30.0, 1.0), (120.0, 0.6)]),
            ..BulletSimulationSettings::default()
        },
        ..GunSettings::default()
    };
    let pistol = GunSettings {
        name: "pistol".to_string(),
        fire_modes: vec![FireMode::Semi],
        rpm: 450.0,
        magazine_size: 12,
        max_reserve: 48,
        reload: ReloadTiming::new(0.9, 1.4),
        draw_time: 0.3,
        putaway_time: 0.25,
        bullet: BulletSimulationSettings {
            damage: 22.0,
            dropoff: DropoffCurve::new(vec![(15.0, 1.0), (60.0, 0.5)]),
            ..BulletSimulationSettings::default()
        },
        ..GunSettings::default()
    };
    let shotgun = GunSettings {
        name: "shotgun".to_string(),
        fire_modes: vec![FireMode::Semi],
        rpm: 80.0,
        fire_type: FireType::Pellets,
        pellets: 8,
        range: 60.0,
        magazine_size: 6,
        max_reserve: 24,
        reload_mode: ReloadMode::ProceduralChambered,
        bullet: BulletSimulationSettings {
            damage: 12.0,
            dropoff: DropoffCurve::new(vec![(5.0, 1.0), (25.0, 0.2)]),
            spread: SpreadSettings {
                hip_base: 0.07,
                aim_base: 0.05,
                ..SpreadSettings::default()
            },
            ..BulletSimulationSettings::default()
        },
        ..GunSettings::default()
    };
    let sniper = GunSettings {
        name: "sniper".to_string(),
        fire_modes: vec![FireMode::BoltAction],
        bolt_cycle_time: 1.2,
        bolt_eject_delay: 0.6,
        magazine_size: 5,
        max_reserve: 20,
        range: 800.0,
        reload_mode: ReloadMode::Chambered,
        reload: ReloadTiming::new(1.8, 2.8),
        reload_empty: ReloadTiming::new(2.2, 3.4),
        bullet: BulletSimulationSettings {
            damage: 95.0,
            penetration_enabled: true,
            penetration_budget: 4,
            spread: SpreadSettings {
                hip_base: 0.05,
                aim_base: 0.0,
                aim_velocity_add: 0.002,
                ..SpreadSettings::default()
            },
            ..BulletSimulationSettings::default()
        },
        ..GunSettings::default()
    };
    let smg = GunSettings {
        name: "smg".to_string(),
        fire_modes: vec![FireMode::Auto, FireMode::Semi],
        rpm: 900.0,
        magazine_size: 32,
        max_reserve: 160,
        range: 120.0,
        bullet: BulletSimulationSettings {
            damage: 18.0,
            spread: SpreadSettings {
                spray_pattern: vec![
                    Vec2::new(0.0, 0.0),
                    Vec2::new(0.0, 0.01),
                    Vec2::new(0.004, 0.02),
                    Vec2::new(-0.004, 0.03),
                    Vec2::new(0.008, 0.035),
                    Vec2::new(0.0, 0.04),
                ],
                ..SpreadSettings::default()
            },
            ..BulletSimulationSettings::default()
        },
        ..GunSettings::default()
    };
    let crossbow = GunSettings {
        name: "crossbow".to_string(),
        fire_modes: vec![FireMode::Semi],
        rpm: 40.0,
        bullet_mode: BulletMode::Projectile,
        projectile_prefab: 6,
        magazine_size: 1,
        max_reserve: 12,
        reload: ReloadTiming::new(1.0, 1.6),
        bullet: BulletSimulationSettings {
            damage: 80.0,
            speed: 70.0,
            gravity_multiplier: 0.5,
            life_time: 4.0,
            stick_after_death: true,
            stick_duration: 10.0,
            ..BulletSimulationSettings::default()
        },
        ..GunSettings::default()
    };

    vec![
        CatalogEntry { id: RIFLE, weapon: WeaponDefinition::Gun(rifle) },
        CatalogEntry { id: PISTOL, weapon: WeaponDefinition::Gun(pistol) },
        CatalogEntry { id: SHOTGUN, weapon: WeaponDefinition::Gun(shotgun) },
        CatalogEntry { id: SNIPER, weapon: WeaponDefinition::Gun(sniper) },
        CatalogEntry { id: SMG, weapon: WeaponDefinition::Gun(smg) },
        CatalogEntry { id: CROSSBOW, weapon: WeaponDefinition::Gun(crossbow) },
        CatalogEntry { id: KNIFE, weapon: WeaponDefinition::Melee(MeleeSettings::default()) },
        CatalogEntry { id: FRAG, weapon: WeaponDefinition::Grenade(GrenadeSettings::default()) },
    ]
}

/// One weapon of a loadout slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadoutWeapon {
    pub catalog_id: i32,
    #[serde(default)]
    pub attachments: Vec<u32>,
    #[serde(default)]
    pub magazine: Option<u32>,
    #[serde(default)]
    pub reserve: Option<u32>,
}

impl LoadoutWeapon {
    pub fn new(catalog_id: i32) -> Self {
        Self {
            catalog_id,
            attachments: Vec::new(),
            magazine: None,
            reserve: None,
        }
    }

    pub fn with_ammo(mut self, magazine: u32, reserve: u32) -> Self {
        self.magazine = Some(magazine);
        self.reserve = Some(reserve);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadoutSlot {
    pub weapons: Vec<LoadoutWeapon>,
}

/// Server-supplied slot/weapon/attachment/ammo data for one player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loadout {
    pub slots: Vec<LoadoutSlot>,
}

impl Loadout {
    pub fn from_slots(slots: Vec<Vec<LoadoutWeapon>>) -> Self {
        Self {
            slots: slots.into_iter().map(|weapons| LoadoutSlot { weapons }).collect(),
        }
    }

    /// Loadout handed to players that join without one
    pub fn standard() -> Self {
        Self::from_slots(vec![
            vec![LoadoutWeapon::new(RIFLE)],
            vec![LoadoutWeapon::new(PISTOL)],
            vec![LoadoutWeapon::new(KNIFE)],
            vec![LoadoutWeapon::new(FRAG)],
        ])
    }
}
