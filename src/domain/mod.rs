pub mod controller;
pub mod inventory;
pub mod lobbies;
pub mod logic;
pub mod multiplier;
pub mod relay;
pub mod replication;
pub mod shot;
pub mod simulator;
pub mod trail_pool;
pub mod weapon;

use serde::{Deserialize, Serialize};

pub type PlayerId = u32;
pub type TeamId = u8;

/// Hit region tag carried on damage submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Head,
    Torso,
    Legs,
}
