use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use serde::{Deserialize, Serialize};

/// Linear damage falloff between two ranges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageFalloff {
    /// Full damage up to this distance
    pub max_damage_range: f32,
    /// Floor damage from this distance on
    pub min_damage_range: f32,
    pub min_damage: f32,
}

/// Shotgun-style pellet settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PelletSpread {
    pub pellet_count: u32,
    pub pellet_damage_multiplier: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageProfile {
    pub base_damage: f32,
    pub damage_cap: f32,
    #[serde(default)]
    pub falloff: Option<DamageFalloff>,
    #[serde(default)]
    pub pellets: Option<PelletSpread>,
    /// Spread cone half-angle in degrees
    #[serde(default)]
    pub bullet_spread: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReloadProfile {
    pub reload_time: f32,
    /// Full magazine at once, otherwise one round at a time
    pub use_mag_reload: bool,
    #[serde(default)]
    pub per_round_reload_time: f32,
}

/// Speed based damage multiplier tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierTuning {
    pub min_speed_threshold: f32,
    pub max_speed_threshold: f32,
    pub max_damage_multiplier: f32,
    pub gain_rate: f32,
    pub decay_rate: f32,
    pub grace_period: f32,
}

impl Default for MultiplierTuning {
    fn default() -> Self {
        Self {
            min_speed_threshold: 15.0,
            max_speed_threshold: 28.0,
            max_damage_multiplier: 2.0,
            gain_rate: 4.0,
            decay_rate: 0.5,
            grace_period: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailAsset {
    pub id: u32,
    /// Seconds a tracer stays visible
    pub lifetime: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponAssets {
    pub trail: TrailAsset,
    #[serde(default)]
    pub muzzle_light: Option<String>,
    #[serde(default)]
    pub world_model_socket: Option<String>,
}

/// Immutable weapon definition, shared by every weapon instance of its type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponDefinition {
    pub id: u32,
    pub name: String,
    pub slot: usize,
    pub mag_size: u32,
    /// Shots per second
    pub fire_rate: f32,
    pub damage: DamageProfile,
    pub reload: ReloadProfile,
    #[serde(default)]
    pub multiplier: MultiplierTuning,
    pub assets: WeaponAssets,
}

impl WeaponDefinition {
    /// Minimum seconds between two accepted shots
    pub fn fire_interval(&self) -> f64 {
        if self.fire_rate <= 0.0 {
            return f64::INFINITY;
        }
        1.0 / f64::from(self.fire_rate)
    }

    /// Pellets per trigger pull, never below one
    pub fn pellet_count(&self) -> u32 {
        self.damage.pellets.map(|p| p.pellet_count.max(1)).unwrap_or(1)
    }

    /// Largest damage a single hit can legitimately deal at `multiplier`
    pub fn max_hit_damage(&self, multiplier: f32) -> f32 {
        let pellet_factor = self.damage.pellets
            .map(|p| p.pellet_damage_multiplier)
            .unwrap_or(1.0);
        (self.damage.base_damage * pellet_factor * multiplier).min(self.damage.damage_cap)
    }
}

/// Weapon file layout: `{ "weapons": [ ... ] }`
#[derive(Debug, Deserialize)]
struct WeaponFile {
    weapons: Vec<WeaponDefinition>,
}

/// Immutable weapon database - loaded once at startup
/// Zero contention, passed by Arc reference
#[derive(Debug, Clone)]
pub struct WeaponDb {
    weapons: HashMap<u32, Arc<WeaponDefinition>>,
}

impl WeaponDb {
    /// Built-in weapon table
    pub fn load() -> Self {
        Self::from_definitions(vec![
            WeaponDefinition {
                id: 1,
                name: "Vector Rifle".to_string(),
                slot: 0,
                mag_size: 30,
                fire_rate: 10.0,
                damage: DamageProfile {
                    base_damage: 20.0,
                    damage_cap: 60.0,
                    falloff: Some(DamageFalloff {
                        max_damage_range: 30.0,
                        min_damage_range: 80.0,
                        min_damage: 12.0,
                    }),
                    pellets: None,
                    bullet_spread: 0.5,
                },
                reload: ReloadProfile {
                    reload_time: 1.8,
                    use_mag_reload: true,
                    per_round_reload_time: 0.0,
                },
                multiplier: MultiplierTuning::default(),
                assets: WeaponAssets {
                    trail: TrailAsset { id: 1, lifetime: 0.08 },
                    muzzle_light: Some("rifle_muzzle_light".to_string()),
                    world_model_socket: Some("rifle_socket".to_string()),
                },
            },
            WeaponDefinition {
                id: 2,
                name: "Sidearm".to_string(),
                slot: 1,
                mag_size: 12,
                fire_rate: 4.0,
                damage: DamageProfile {
                    base_damage: 25.0,
                    damage_cap: 70.0,
                    falloff: None,
                    pellets: None,
                    bullet_spread: 0.0,
                },
                reload: ReloadProfile {
                    reload_time: 1.2,
                    use_mag_reload: true,
                    per_round_reload_time: 0.0,
                },
                multiplier: MultiplierTuning::default(),
                assets: WeaponAssets {
                    trail: TrailAsset { id: 2, lifetime: 0.06 },
                    muzzle_light: None,
                    world_model_socket: None,
                },
            },
            WeaponDefinition {
                id: 3,
                name: "Scattergun".to_string(),
                slot: 0,
                mag_size: 6,
                fire_rate: 1.25,
                damage: DamageProfile {
                    base_damage: 20.0,
                    damage_cap: 40.0,
                    falloff: Some(DamageFalloff {
                        max_damage_range: 8.0,
                        min_damage_range: 25.0,
                        min_damage: 5.0,
                    }),
                    pellets: Some(PelletSpread {
                        pellet_count: 8,
                        pellet_damage_multiplier: 0.15,
                    }),
                    bullet_spread: 6.0,
                },
                reload: ReloadProfile {
                    reload_time: 0.0,
                    use_mag_reload: false,
                    per_round_reload_time: 0.5,
                },
                multiplier: MultiplierTuning::default(),
                assets: WeaponAssets {
                    trail: TrailAsset { id: 3, lifetime: 0.1 },
                    muzzle_light: Some("scatter_muzzle_light".to_string()),
                    world_model_socket: Some("scatter_socket".to_string()),
                },
            },
        ])
    }

    pub fn from_definitions(definitions: Vec<WeaponDefinition>) -> Self {
        let weapons = definitions.into_iter()
            .map(|def| (def.id, Arc::new(def)))
            .collect();
        Self { weapons }
    }

    /// Parse a weapon file
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: WeaponFile = serde_json::from_str(json)?;
        Ok(Self::from_definitions(file.weapons))
    }

    /// Load weapons from a JSON file, falling back to the built-in table
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::load();
        };
        let loaded = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| Self::from_json(&text).map_err(|e| e.to_string()));
        match loaded {
            Ok(db) if !db.weapons.is_empty() => {
                log::info!("Loaded {} weapons from {}", db.weapons.len(), path.display());
                db
            }
            Ok(_) => {
                log::warn!("Weapon file {} is empty, using built-in weapons", path.display());
                Self::load()
            }
            Err(e) => {
                log::warn!("Failed to load weapons from {}: {}, using built-in weapons", path.display(), e);
                Self::load()
            }
        }
    }

    /// Get weapon by ID
    pub fn get(&self, id: u32) -> Option<&Arc<WeaponDefinition>> {
        self.weapons.get(&id)
    }

    /// Check if weapon exists
    pub fn contains(&self, id: u32) -> bool {
        self.weapons.contains_key(&id)
    }

    /// Resolve a list of weapon ids, skipping unknown ones
    pub fn loadout(&self, ids: &[u32]) -> Vec<Arc<WeaponDefinition>> {
        ids.iter()
            .filter_map(|id| {
                let def = self.get(*id).cloned();
                if def.is_none() {
                    log::warn!("Loadout references unknown weapon {}", id);
                }
                def
            })
            .collect()
    }

    /// Primary + secondary
    pub fn default_loadout() -> [u32; 2] {
        [1, 2]
    }
}
