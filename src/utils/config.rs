use std::path::{Path, PathBuf};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::domain::trail_pool::DEFAULT_TRAIL_CAPACITY;
use crate::utils::weapondb::WeaponDb;

/// Server configuration - immutable after load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http_port: u16,
    pub udp_port: u16,
    pub tick_rate_hz: u32,
    pub player_inactivity_timeout_secs: u64,
    pub max_lobbies: usize,
    pub command_queue_capacity: usize,

    // Weapons
    pub default_loadout: Vec<u32>,
    pub weapons_path: Option<PathBuf>,
    pub pull_out_timeout_secs: f32,
    pub trail_pool_capacity: usize,

    // Replication
    pub multiplier_broadcast_interval_secs: f32,
    pub multiplier_broadcast_min_delta: f32,

    // Authority
    pub max_health: f32,
    pub respawn_delay_secs: f32,
    /// Extra fire packets honoured back to back when they arrive bunched
    pub fire_burst_shots: u32,
    /// Factor over the weapon's max per-hit damage a request may claim
    pub damage_tolerance: f32,
    pub validate_line_of_sight: bool,

    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            udp_port: 8081,
            tick_rate_hz: 50, // 20ms per tick
            player_inactivity_timeout_secs: 15,
            max_lobbies: 1000,
            command_queue_capacity: 1000,
            default_loadout: WeaponDb::default_loadout().to_vec(),
            weapons_path: None,
            pull_out_timeout_secs: 1.0,
            trail_pool_capacity: DEFAULT_TRAIL_CAPACITY,
            multiplier_broadcast_interval_secs: 0.1,
            multiplier_broadcast_min_delta: 0.05,
            max_health: 100.0,
            respawn_delay_secs: 3.0,
            fire_burst_shots: 2,
            damage_tolerance: 1.1,
            validate_line_of_sight: true,
            log_level: "debug".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load from `path`, falling back to defaults when missing or invalid
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("Could not read config {}: {}, using defaults", path.display(), e);
                return Self::default();
            }
        };
        match Self::from_json(&contents) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Invalid config {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn tick_interval_ms(&self) -> u64 {
        1000 / u64::from(self.tick_rate_hz.max(1))
    }

    /// Simulation step matching the tick interval
    pub fn tick_dt(&self) -> f32 {
        self.tick_interval_ms() as f32 / 1000.0
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        log::LevelFilter::from_str(&self.log_level).unwrap_or(log::LevelFilter::Info)
    }
}
