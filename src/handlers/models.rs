use serde::{Deserialize, Serialize};
use crate::domain::relay::GameMode;
use crate::domain::{PlayerId, TeamId};

/// HTTP Request/Response DTOs

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CreateLobbyRequest {
    /// Generated when missing
    #[serde(default)]
    pub code: Option<String>,
    pub max_players: Option<u32>,
    pub scene: Option<String>,
    #[serde(default)]
    pub game_mode: Option<GameMode>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JoinLobbyRequest {
    pub player_name: String,
    #[serde(default)]
    pub team: Option<TeamId>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JoinLobbyResponse {
    pub lobby: LobbyInfo,
    pub player_id: PlayerId,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LobbyInfo {
    pub code: String,
    pub player_count: usize,
    pub max_players: u32,
    pub players: Vec<PlayerInfo>,
    pub server_ip: String,
    pub udp_port: u16,
    pub scene: String,
    pub game_mode: GameMode,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub team: Option<TeamId>,
    pub health: f32,
    pub kills: u32,
    pub deaths: u32,
}
