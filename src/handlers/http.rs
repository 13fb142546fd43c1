use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use crate::handlers::models::{CreateLobbyRequest, JoinLobbyRequest, JoinLobbyResponse, LobbyInfo, PlayerInfo};
use crate::state::lobby::Lobby;
use crate::state::server_state::ServerState;
use crate::domain::lobbies;
use crate::utils::weapondb::WeaponDb;
use crate::utils::config::Config;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// App state for HTTP handlers (includes server state and dependencies)
#[derive(Clone)]
pub struct AppState {
    pub state: Arc<ServerState>,
    pub weapons: Arc<WeaponDb>,
    pub config: Arc<Config>,
    pub udp_socket: Arc<UdpSocket>,
}

fn lobby_info(lobby: &Lobby, udp_port: u16) -> LobbyInfo {
    LobbyInfo {
        code: lobby.code.clone(),
        player_count: lobby.players.len(),
        max_players: lobby.max_players,
        players: lobby.players.values().map(|p| PlayerInfo {
            id: p.id,
            name: p.name.clone(),
            team: p.team,
            health: p.health,
            kills: p.kills,
            deaths: p.deaths,
        }).collect(),
        server_ip: "127.0.0.1".to_string(),
        udp_port,
        scene: lobby.scene.clone(),
        game_mode: lobby.game_mode,
    }
}

/// Short uppercase code for lobbies created without one
fn generate_code() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..6].to_uppercase()
}

/// Thin HTTP handler: Create lobby
pub async fn create_lobby(
    State(app_state): State<AppState>,
    Json(request): Json<CreateLobbyRequest>,
) -> Result<Json<LobbyInfo>, StatusCode> {
    if app_state.state.lobby_count() >= app_state.config.max_lobbies {
        log::warn!("Lobby limit of {} reached", app_state.config.max_lobbies);
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let code = request.code.unwrap_or_else(generate_code);
    if app_state.state.lobby_exists(&code) {
        return Err(StatusCode::CONFLICT);
    }

    let max_players = request.max_players.unwrap_or(4);
    let scene = request.scene.unwrap_or_else(|| "world".to_string());
    let game_mode = request.game_mode.unwrap_or_default();

    // Create lobby and spawn tick loop
    if let Err(e) = crate::server::create_lobby_with_tick(
        app_state.state.clone(),
        code.clone(),
        max_players,
        scene,
        game_mode,
        app_state.weapons.clone(),
        app_state.config.clone(),
        app_state.udp_socket.clone(),
    ).await {
        log::error!("Failed to create lobby: {}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let lobby_arc = app_state.state.get_lobby(&code)
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    let lobby = lobby_arc.read().await;
    log::info!("Created lobby {} ({:?})", lobby.code, lobby.game_mode);
    Ok(Json(lobby_info(&lobby, app_state.config.udp_port)))
}

/// Thin HTTP handler: Join lobby
pub async fn join_lobby(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
    Json(request): Json<JoinLobbyRequest>,
) -> Result<Json<JoinLobbyResponse>, StatusCode> {
    let lobby_arc = app_state.state.get_lobby(&code)
        .ok_or(StatusCode::NOT_FOUND)?;

    let player_id = app_state.state.next_player_id();

    // Acquire lock, add player
    let mut lobby = lobby_arc.write().await;

    match lobbies::add_player(
        &mut lobby,
        player_id,
        request.player_name,
        request.team,
        &app_state.weapons,
        &app_state.config,
    ) {
        Ok(()) => Ok(Json(JoinLobbyResponse {
            lobby: lobby_info(&lobby, app_state.config.udp_port),
            player_id,
        })),
        Err(e) => {
            log::debug!("Join to lobby {} rejected: {}", code, e);
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

/// Thin HTTP handler: Get lobby info
pub async fn get_lobby(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<LobbyInfo>, StatusCode> {
    let lobby_arc = app_state.state.get_lobby(&code)
        .ok_or(StatusCode::NOT_FOUND)?;

    let lobby = lobby_arc.read().await;
    Ok(Json(lobby_info(&lobby, app_state.config.udp_port)))
}

/// Thin HTTP handler: List all lobbies
pub async fn list_lobbies(
    State(app_state): State<AppState>,
) -> Json<Vec<LobbyInfo>> {
    let mut lobbies_info = Vec::new();

    for lobby_arc in app_state.state.lobby_list() {
        let lobby = lobby_arc.read().await;
        lobbies_info.push(lobby_info(&lobby, app_state.config.udp_port));
    }

    Json(lobbies_info)
}

/// Thin HTTP handler: Close a lobby and stop its tick loop
pub async fn delete_lobby(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
) -> StatusCode {
    match app_state.state.remove_lobby(&code) {
        Some(_) => {
            log::info!("Closed lobby {}", code);
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}
