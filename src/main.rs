use std::path::{Path, PathBuf};
use std::sync::Arc;
use gunsync::domain::relay::GameMode;
use gunsync::server;
use gunsync::state::server_state::ServerState;
use gunsync::utils::logging;
use gunsync::utils::weapondb::WeaponDb;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::setup_logging(Path::new("gunsync.log"))?;

    // Config path: first argument, then GUNSYNC_CONFIG
    let config_path = std::env::args().nth(1)
        .or_else(|| std::env::var("GUNSYNC_CONFIG").ok())
        .map(PathBuf::from);
    let config = logging::load_config(config_path.as_deref());

    // Load immutable globals (zero contention)
    let weapons = Arc::new(WeaponDb::load_or_default(config.weapons_path.as_deref()));
    let config = Arc::new(config);

    // Create server state (partitioned by lobby)
    let state = Arc::new(ServerState::new());

    // Create UDP socket for lobby tick loops
    let udp_socket = Arc::new(
        tokio::net::UdpSocket::bind(format!("0.0.0.0:{}", config.udp_port)).await?
    );

    // Create default test lobby
    server::create_lobby_with_tick(
        state.clone(),
        "test".to_string(),
        8,
        "test_world".to_string(),
        GameMode::FreeForAll,
        weapons.clone(),
        config.clone(),
        udp_socket.clone(),
    ).await?;

    log::info!("Created test lobby 'test'");

    // Start HTTP and UDP servers
    server::start_servers(state, weapons, config, udp_socket).await?;

    Ok(())
}
