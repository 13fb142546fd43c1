use axum::{
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use log::info;
use tokio::net::{TcpListener, UdpSocket};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use crate::domain::relay::GameMode;
use crate::state::server_state::{ServerState, LobbyHandle};
use crate::state::lobby::Lobby;
use crate::state::commands::LobbyCommand;
use crate::handlers::http::{create_lobby, delete_lobby, list_lobbies, join_lobby, get_lobby, AppState};
use crate::handlers::udp::handle_udp_packet;
use crate::tick::lobby_tick::lobby_tick_loop;
use crate::utils::weapondb::WeaponDb;
use crate::utils::config::Config;

/// Largest datagram the receive loop accepts
const MAX_DATAGRAM: usize = 2048;

/// Start HTTP and UDP servers
pub async fn start_servers(
    state: Arc<ServerState>,
    weapons: Arc<WeaponDb>,
    config: Arc<Config>,
    udp_socket: Arc<UdpSocket>,
) -> Result<(), Box<dyn std::error::Error>> {
    let http_server = init_http_server(state.clone(), weapons, config, udp_socket.clone());
    let udp_server = init_udp_server(state, udp_socket);

    tokio::try_join!(http_server, udp_server)?;
    Ok(())
}

/// HTTP routes over shared app state
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/lobbies", get(list_lobbies).post(create_lobby))
        .route("/lobbies/:code/join", axum::routing::post(join_lobby))
        .route("/lobbies/:code", get(get_lobby).delete(delete_lobby))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Initialize HTTP server
fn init_http_server(
    state: Arc<ServerState>,
    weapons: Arc<WeaponDb>,
    config: Arc<Config>,
    udp_socket: Arc<UdpSocket>,
) -> tokio::task::JoinHandle<()> {
    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let app = router(AppState {
        state,
        weapons,
        config,
        udp_socket,
    });

    info!("Starting HTTP server on {}", http_addr);

    tokio::spawn(async move {
        let listener = match TcpListener::bind(&http_addr).await {
            Ok(listener) => {
                info!("HTTP server successfully bound to {}", http_addr);
                listener
            }
            Err(e) => {
                log::error!("Failed to bind HTTP server to {}: {}", http_addr, e);
                return;
            }
        };

        if let Err(e) = axum::serve(listener, app).await {
            log::error!("HTTP server error: {}", e);
        }
    })
}

/// Initialize UDP server
fn init_udp_server(
    state: Arc<ServerState>,
    socket: Arc<UdpSocket>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = [0u8; MAX_DATAGRAM];

        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, addr)) => {
                    handle_udp_packet(&buf[..len], addr, &state).await;
                }
                Err(e) => {
                    log::error!("UDP recv error: {}", e);
                }
            }
        }
    })
}

/// Create a new lobby and spawn its tick loop
#[allow(clippy::too_many_arguments)]
pub async fn create_lobby_with_tick(
    state: Arc<ServerState>,
    code: String,
    max_players: u32,
    scene: String,
    game_mode: GameMode,
    weapons: Arc<WeaponDb>,
    config: Arc<Config>,
    socket: Arc<UdpSocket>,
) -> Result<(), Box<dyn std::error::Error>> {
    if state.lobby_exists(&code) {
        return Err("Lobby already exists".into());
    }

    // Create lobby
    let lobby = Arc::new(RwLock::new(Lobby::new(code.clone(), max_players, scene, game_mode)));

    // Create command channel
    let (tx, rx) = mpsc::channel::<LobbyCommand>(config.command_queue_capacity);

    // Spawn tick loop
    let tick_lobby = lobby.clone();
    let task_handle = tokio::spawn(async move {
        lobby_tick_loop(tick_lobby, rx, socket, weapons, config).await;
    });

    // Create handle
    let handle = LobbyHandle {
        lobby,
        command_tx: tx,
        task_handle,
    };

    // Insert into state
    state.insert_lobby(code, handle);

    Ok(())
}
