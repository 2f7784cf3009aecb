//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::util::time::{DEFAULT_SIMULATION_TPS, DEFAULT_SNAPSHOT_TPS};

/// Simulation switches shared by every actor in a session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimFlags {
    /// Firing client computes damage instead of the session authority
    pub fire_shots_locally: bool,
    /// Shots never consume magazine ammo
    pub unlimited_ammo: bool,
    /// Reloads never consume reserve ammo
    pub unlimited_reloads: bool,
    /// Damage between actors that are not enemies
    pub friendly_fire: bool,
    /// Dying actors drop their weapons
    pub allow_weapon_drop: bool,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed CORS origins, comma separated
    pub client_origin: String,

    /// Path to a JSON weapon catalog; the built-in catalog is used when unset
    pub weapon_catalog: Option<PathBuf>,

    /// Fixed simulation rate
    pub simulation_tps: u32,
    /// Periodic replication rate
    pub snapshot_tps: u32,
    /// Actors per session
    pub max_players: usize,

    pub flags: SimFlags,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let simulation_tps = parse_or("SIMULATION_TPS", DEFAULT_SIMULATION_TPS)?;
        let snapshot_tps = parse_or("SNAPSHOT_TPS", DEFAULT_SNAPSHOT_TPS)?;
        if simulation_tps == 0 || snapshot_tps == 0 || snapshot_tps > simulation_tps {
            return Err(ConfigError::InvalidRate {
                simulation_tps,
                snapshot_tps,
            });
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string()),

            weapon_catalog: env::var("WEAPON_CATALOG").ok().map(PathBuf::from),

            simulation_tps,
            snapshot_tps,
            max_players: parse_or("MAX_PLAYERS", 16usize)?.max(1),

            flags: SimFlags {
                fire_shots_locally: flag("FIRE_SHOTS_LOCALLY", false)?,
                unlimited_ammo: flag("DEBUG_UNLIMITED_AMMO", false)?,
                unlimited_reloads: flag("DEBUG_UNLIMITED_RELOADS", false)?,
                friendly_fire: flag("FRIENDLY_FIRE", false)?,
                allow_weapon_drop: flag("ALLOW_WEAPON_DROP", true)?,
            },
        })
    }

    /// Simulation ticks between two periodic state frames
    pub fn snapshot_interval(&self) -> u64 {
        (self.simulation_tps / self.snapshot_tps).max(1) as u64
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidNumber(key)),
        Err(_) => Ok(default),
    }
}

fn flag(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidFlag(key)),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid number in environment variable: {0}")]
    InvalidNumber(&'static str),

    #[error("Invalid boolean in environment variable: {0}")]
    InvalidFlag(&'static str),

    #[error("Invalid tick rates: simulation {simulation_tps}, snapshot {snapshot_tps}")]
    InvalidRate { simulation_tps: u32, snapshot_tps: u32 },

    #[error("Failed to read weapon catalog: {0}")]
    CatalogIo(#[from] std::io::Error),

    #[error("Failed to parse weapon catalog: {0}")]
    CatalogParse(#[from] serde_json::Error),
}
