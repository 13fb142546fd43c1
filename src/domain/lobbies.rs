use std::time::SystemTime;
use std::net::SocketAddr;
use glam::Vec3;
use crate::domain::inventory::WeaponInventory;
use crate::domain::replication::{BroadcastGate, FireBudget};
use crate::domain::{PlayerId, TeamId};
use crate::state::lobby::{Lobby, Player};
use crate::utils::config::Config;
use crate::utils::weapondb::WeaponDb;

/// Add a player to a lobby with the configured loadout
pub fn add_player(
    lobby: &mut Lobby,
    player_id: PlayerId,
    name: String,
    team: Option<TeamId>,
    weapons: &WeaponDb,
    config: &Config,
) -> Result<(), &'static str> {
    if lobby.players.len() >= lobby.max_players as usize {
        return Err("Lobby is full");
    }

    if lobby.players.contains_key(&player_id) {
        return Err("Player already exists");
    }

    let inventory = WeaponInventory::new(
        weapons.loadout(&config.default_loadout),
        config.pull_out_timeout_secs,
    )?;

    let team = match team {
        Some(team) => Some(team),
        None if lobby.game_mode.is_team_based() => Some(lobby.smallest_team()),
        None => None,
    };

    let gate = BroadcastGate::new(
        config.multiplier_broadcast_interval_secs,
        config.multiplier_broadcast_min_delta,
        1.0,
    );
    let player = Player::new(
        player_id,
        name,
        team,
        config.max_health,
        inventory,
        FireBudget::new(config.fire_burst_shots),
        gate,
    );

    lobby.players.insert(player_id, player);
    lobby.mark_dirty(player_id);
    Ok(())
}

/// Remove a player from a lobby
pub fn remove_player(lobby: &mut Lobby, player_id: PlayerId) {
    lobby.players.remove(&player_id);
    lobby.client_addresses.remove(&player_id);
    lobby.last_sync_state.remove(&player_id);
}

/// Update player position, rotation and velocity
pub fn update_position(
    lobby: &mut Lobby,
    player_id: PlayerId,
    position: Vec3,
    rotation: Vec3,
    velocity: Vec3,
) -> Result<(), &'static str> {
    let player = lobby.players.get_mut(&player_id)
        .ok_or("Player not found")?;

    if !position.is_finite() || !velocity.is_finite() {
        return Err("Non-finite movement");
    }

    player.position = position;
    player.rotation = rotation;
    player.velocity = velocity;
    player.last_update = SystemTime::now();

    Ok(())
}

/// Set player's UDP address
pub fn set_player_address(
    lobby: &mut Lobby,
    player_id: PlayerId,
    addr: SocketAddr,
) -> Result<(), &'static str> {
    if !lobby.players.contains_key(&player_id) {
        return Err("Player not found");
    }
    lobby.client_addresses.insert(player_id, addr);
    Ok(())
}

/// Refresh the activity timestamp
pub fn touch(lobby: &mut Lobby, player_id: PlayerId) {
    if let Some(player) = lobby.players.get_mut(&player_id) {
        player.last_update = SystemTime::now();
    }
}

/// Clean up inactive players
/// Returns list of removed player IDs
pub fn cleanup_inactive(
    lobby: &mut Lobby,
    timeout_secs: u64,
) -> Vec<PlayerId> {
    let now = SystemTime::now();
    let mut inactive_players = Vec::new();

    for (player_id, player) in &lobby.players {
        if let Ok(duration) = now.duration_since(player.last_update) {
            if duration.as_secs() > timeout_secs {
                inactive_players.push(*player_id);
            }
        }
    }

    for player_id in &inactive_players {
        log::info!("Removing inactive player {} from lobby {}", player_id, lobby.code);
        remove_player(lobby, *player_id);
    }

    inactive_players
}
