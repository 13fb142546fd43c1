//! Boundary contracts with the collaborators the weapon code calls into.
//!
//! Implementations are injected into `WeaponController`; nothing here is a
//! global. `protocol::PacketOutbox` implements the network-facing relays.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use crate::domain::inventory::PullOutToken;
use crate::domain::{BodyPart, PlayerId, TeamId};

/// Authoritative damage submission for one confirmed, non-suppressed hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageRequest {
    pub target: PlayerId,
    pub damage: f32,
    pub hit_point: Vec3,
    pub hit_direction: Vec3,
    #[serde(default)]
    pub body_part: Option<BodyPart>,
    #[serde(default)]
    pub is_headshot: bool,
    pub weapon_index: usize,
    /// Receiver de-duplicates on (shooter, shot_seq)
    pub shot_seq: u64,
}

/// Cosmetic data for one pellet, fanned out to observers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotFx {
    pub start: Vec3,
    pub end_point: Vec3,
    pub hit_normal: Vec3,
    pub made_impact: bool,
    pub hit_player: bool,
    pub play_muzzle_flash: bool,
}

/// Accepted trigger pull, mirrored by the server's copy of the weapon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FireAction {
    pub weapon_index: usize,
    pub origin: Vec3,
    pub direction: Vec3,
    pub first_shot_seq: u64,
    pub pellet_count: u32,
    /// Shooter's clock when the trigger was pulled
    pub fired_at: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundKey {
    Shoot,
    DryFire,
    Reload,
    Impact,
    Hit,
    Kill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    FreeForAll,
    TeamDeathmatch,
    CaptureTheFlag,
}

impl GameMode {
    pub fn is_team_based(self) -> bool {
        !matches!(self, GameMode::FreeForAll)
    }
}

pub trait DamageRelay {
    fn request_damage(&mut self, request: DamageRequest);
}

pub trait FxRelay {
    fn request_shot_fx(&mut self, fx: ShotFx);
}

pub trait SfxRelay {
    fn request_world_sfx(&mut self, key: SoundKey, attach_to_self: bool, allow_overlap: bool);
    fn stop_world_sfx(&mut self, key: SoundKey);
}

/// Weapon inputs the owner forwards so the server can replay them
pub trait ActionRelay {
    fn send_fire(&mut self, action: FireAction);
    fn send_reload(&mut self);
    fn send_weapon_switch(&mut self, slot: usize, force: bool);
    fn send_pull_out_complete(&mut self, token: PullOutToken);
}

pub trait Hud {
    fn update_ammo(&mut self, current: u32, max: u32);
}

pub trait MatchSettings {
    fn game_mode(&self) -> GameMode;
}

pub trait TeamRoster {
    fn team_of(&self, player: PlayerId) -> Option<TeamId>;
}

/// Damage between two players is allowed unless the mode is team based and
/// both are on the same team
pub fn damage_allowed(
    mode: GameMode,
    shooter_team: Option<TeamId>,
    target_team: Option<TeamId>,
) -> bool {
    if !mode.is_team_based() {
        return true;
    }
    match (shooter_team, target_team) {
        (Some(a), Some(b)) => a != b,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_for_all_allows_everything() {
        assert!(damage_allowed(GameMode::FreeForAll, Some(1), Some(1)));
        assert!(damage_allowed(GameMode::FreeForAll, None, None));
    }

    #[test]
    fn test_team_mode_blocks_teammates() {
        assert!(!damage_allowed(GameMode::TeamDeathmatch, Some(2), Some(2)));
        assert!(damage_allowed(GameMode::TeamDeathmatch, Some(1), Some(2)));
        assert!(damage_allowed(GameMode::CaptureTheFlag, Some(1), None));
    }

    #[test]
    fn test_sound_key_wire_names() {
        assert_eq!(serde_json::to_string(&SoundKey::DryFire).unwrap(), "\"dry_fire\"");
        let mode: GameMode = serde_json::from_str("\"team_deathmatch\"").unwrap();
        assert!(mode.is_team_based());
    }
}
