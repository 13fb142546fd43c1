use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio::net::UdpSocket;
use tokio::time::{interval, Duration, MissedTickBehavior};
use crate::domain::{lobbies, logic, PlayerId};
use crate::protocol::{self, ServerPacket};
use crate::state::lobby::Lobby;
use crate::state::commands::{LobbyCommand, drain_and_coalesce};
use crate::tick::delta_sync;
use crate::utils::buffers::{PacketBuffer, Route, SyncEvent};
use crate::utils::config::Config;
use crate::utils::weapondb::WeaponDb;

/// What happened this tick that needs a membership or movement broadcast
#[derive(Debug, Default)]
pub struct TickActivity {
    pub joined: Vec<(PlayerId, SocketAddr)>,
    pub left: Vec<PlayerId>,
    pub moved: Vec<PlayerId>,
}

/// Per-lobby tick loop - processes commands and broadcasts updates
/// Runs at fixed tick rate (50Hz by default)
pub async fn lobby_tick_loop(
    lobby: Arc<RwLock<Lobby>>,
    mut command_rx: mpsc::Receiver<LobbyCommand>,
    socket: Arc<UdpSocket>,
    weapons: Arc<WeaponDb>,
    config: Arc<Config>,
) {
    let tick_interval = Duration::from_millis(config.tick_interval_ms());
    let dt = config.tick_dt();
    let mut tick_timer = interval(tick_interval);
    tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut send_buffer = PacketBuffer::default();

    loop {
        tick_timer.tick().await;

        // 1. Drain commands (coalesce positions - keep only latest)
        let commands = drain_and_coalesce(&mut command_rx);

        // 2. Acquire lock ONCE per tick
        let mut lobby_guard = lobby.write().await;

        // 3. Process all commands
        let mut activity = TickActivity::default();
        for cmd in commands {
            process_command(&mut lobby_guard, &weapons, &config, cmd, &mut activity);
        }

        // 4. Advance simulation: timers, respawns, multipliers
        simulate(&mut lobby_guard, dt);

        // 5. Cleanup inactive players
        let removed = lobbies::cleanup_inactive(
            &mut lobby_guard,
            config.player_inactivity_timeout_secs,
        );
        activity.left.extend(removed);

        // 6. Membership and movement broadcasts
        for (player_id, addr) in &activity.joined {
            send_welcome_message(&lobby_guard, &socket, &mut send_buffer, *player_id, *addr).await;
        }
        broadcast_membership(&lobby_guard, &socket, &mut send_buffer, &activity).await;
        if !activity.moved.is_empty() {
            broadcast_position_updates(&lobby_guard, &socket, &mut send_buffer, &activity.moved).await;
        }

        // 7. Delta sync plus events raised while processing
        let mut events: Vec<SyncEvent> = delta_sync::collect_dirty_events(&mut lobby_guard).into_vec();
        events.extend(lobby_guard.take_events());

        // 8. Broadcast state events (reuse buffer)
        if !events.is_empty() {
            broadcast_state_events(&lobby_guard, &socket, &events, &mut send_buffer).await;
        }

        // 9. Clear dirty flags
        lobby_guard.clear_dirty();
    }
}

/// Advance lobby time by one tick
pub fn simulate(lobby: &mut Lobby, dt: f32) {
    lobby.advance_clock(dt);
    logic::update_weapon_timers(lobby);
    logic::update_respawns(lobby);
    logic::update_multipliers(lobby, dt);
}

/// Process a single command
pub fn process_command(
    lobby: &mut Lobby,
    weapons: &WeaponDb,
    config: &Config,
    cmd: LobbyCommand,
    activity: &mut TickActivity,
) {
    match cmd {
        LobbyCommand::PlayerJoin { player_id, name, team, addr } => {
            match lobbies::add_player(lobby, player_id, name, team, weapons, config) {
                Ok(()) => {}
                // joined over HTTP first, this is the UDP hello
                Err("Player already exists") => {}
                Err(e) => {
                    log::warn!("Failed to add player {}: {}", player_id, e);
                    return;
                }
            }
            if let Err(e) = lobbies::set_player_address(lobby, player_id, addr) {
                log::warn!("Failed to set address for player {}: {}", player_id, e);
                return;
            }
            activity.joined.push((player_id, addr));
        }
        LobbyCommand::PlayerLeave { player_id } => {
            lobbies::remove_player(lobby, player_id);
            activity.left.push(player_id);
        }
        LobbyCommand::PositionUpdate { player_id, position, rotation, velocity, addr } => {
            // Update client address (ensures HTTP-joined players get their UDP address tracked)
            if lobby.players.contains_key(&player_id) {
                lobby.client_addresses.insert(player_id, addr);
            }
            match lobbies::update_position(lobby, player_id, position, rotation, velocity) {
                Ok(()) => activity.moved.push(player_id),
                Err(e) => log::debug!("Position update failed for player {}: {}", player_id, e),
            }
        }
        LobbyCommand::Fire { player_id, action } => {
            lobbies::touch(lobby, player_id);
            if let Err(e) = logic::handle_fire(lobby, player_id, &action) {
                log::debug!("Fire failed for player {}: {}", player_id, e);
            }
        }
        LobbyCommand::Reload { player_id } => {
            if let Err(e) = logic::start_reload(lobby, player_id) {
                log::debug!("Reload failed for player {}: {}", player_id, e);
            }
        }
        LobbyCommand::WeaponSwitch { player_id, slot, force } => {
            if let Err(e) = logic::switch_weapon(lobby, player_id, slot, force) {
                log::debug!("Weapon switch failed for player {}: {}", player_id, e);
            }
        }
        LobbyCommand::PullOutComplete { player_id, token } => {
            match logic::complete_pull_out(lobby, player_id, token) {
                Ok(true) => {}
                Ok(false) => log::debug!("Stale pull-out token {:?} from player {}", token, player_id),
                Err(e) => log::debug!("Pull-out failed for player {}: {}", player_id, e),
            }
        }
        LobbyCommand::Damage { player_id, request } => {
            if let Err(e) = logic::apply_damage(lobby, player_id, &request, config) {
                log::debug!(
                    "Damage from player {} to {} (seq {}) rejected: {}",
                    player_id, request.target, request.shot_seq, e
                );
            }
        }
        LobbyCommand::ShotFx { player_id, fx } => {
            if let Err(e) = logic::relay_shot_fx(lobby, player_id, fx) {
                log::debug!("Shot FX from player {} dropped: {}", player_id, e);
            }
        }
        LobbyCommand::WorldSfx { player_id, key, attach_to_self, allow_overlap } => {
            if let Err(e) = logic::relay_world_sfx(lobby, player_id, key, attach_to_self, allow_overlap) {
                log::debug!("SFX from player {} dropped: {}", player_id, e);
            }
        }
        LobbyCommand::StopSfx { player_id, key } => {
            if let Err(e) = logic::relay_stop_sfx(lobby, player_id, key) {
                log::debug!("Stop SFX from player {} dropped: {}", player_id, e);
            }
        }
        LobbyCommand::Heartbeat { player_id, addr } => {
            // Update client address (ensures HTTP-joined players get their UDP address tracked)
            if lobby.players.contains_key(&player_id) {
                lobby.client_addresses.insert(player_id, addr);
            }
            lobbies::touch(lobby, player_id);
        }
    }
}

async fn send_packet(
    socket: &UdpSocket,
    buffer: &mut PacketBuffer,
    packet: &ServerPacket,
    addrs: &[SocketAddr],
) {
    if addrs.is_empty() {
        return;
    }
    let data = match protocol::encode(packet, buffer.as_bytes_mut()) {
        Ok(data) => data,
        Err(e) => {
            log::error!("Failed to encode packet: {}", e);
            return;
        }
    };
    for addr in addrs {
        if let Err(e) = socket.send_to(&data, *addr).await {
            log::debug!("Failed to send packet to {}: {:?}", addr, e);
        }
    }
}

/// Send welcome message to joining player with current lobby state
async fn send_welcome_message(
    lobby: &Lobby,
    socket: &UdpSocket,
    buffer: &mut PacketBuffer,
    player_id: PlayerId,
    addr: SocketAddr,
) {
    let welcome = ServerPacket::Welcome {
        player_id,
        message: "Connected to lobby".to_string(),
    };
    send_packet(socket, buffer, &welcome, &[addr]).await;

    // Send current player list to joining player
    let players = lobby.players.values()
        .filter(|p| p.id != player_id)
        .map(|p| p.snapshot())
        .collect();
    send_packet(socket, buffer, &ServerPacket::PlayerList { players }, &[addr]).await;
}

/// Broadcast player join / leave events to all clients
async fn broadcast_membership(
    lobby: &Lobby,
    socket: &UdpSocket,
    buffer: &mut PacketBuffer,
    activity: &TickActivity,
) {
    for (player_id, _) in &activity.joined {
        let Some(player) = lobby.players.get(player_id) else {
            continue;
        };
        let packet = ServerPacket::PlayerJoined { player: player.snapshot() };
        let addrs = delta_sync::recipients(lobby, Route::AllExcept(*player_id));
        send_packet(socket, buffer, &packet, &addrs).await;
    }

    for player_id in &activity.left {
        let packet = ServerPacket::PlayerLeft { player_id: *player_id };
        let addrs = delta_sync::recipients(lobby, Route::All);
        send_packet(socket, buffer, &packet, &addrs).await;
    }
}

/// Broadcast position updates for players that moved
async fn broadcast_position_updates(
    lobby: &Lobby,
    socket: &UdpSocket,
    buffer: &mut PacketBuffer,
    player_ids: &[PlayerId],
) {
    for player_id in player_ids {
        if let Some(player) = lobby.players.get(player_id) {
            let packet = ServerPacket::PositionUpdate {
                player_id: *player_id,
                position: player.position,
                rotation: player.rotation,
                velocity: player.velocity,
            };
            // Send to all clients except the moving player
            let addrs = delta_sync::recipients(lobby, Route::AllExcept(*player_id));
            send_packet(socket, buffer, &packet, &addrs).await;
        }
    }
}

/// Broadcast state events to the clients each one is routed to
async fn broadcast_state_events(
    lobby: &Lobby,
    socket: &UdpSocket,
    events: &[SyncEvent],
    buffer: &mut PacketBuffer,
) {
    for event in events {
        let packet = delta_sync::to_packet(event);
        let addrs = delta_sync::recipients(lobby, event.route());
        send_packet(socket, buffer, &packet, &addrs).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::relay::{FireAction, GameMode, SoundKey};
    use glam::Vec3;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    fn join(lobby: &mut Lobby, player_id: PlayerId, activity: &mut TickActivity) {
        let cmd = LobbyCommand::PlayerJoin {
            player_id,
            name: format!("Player{}", player_id),
            team: None,
            addr: addr(9000 + player_id as u16),
        };
        process_command(lobby, &WeaponDb::load(), &Config::default(), cmd, activity);
    }

    #[test]
    fn test_process_command_player_join() {
        let mut lobby = Lobby::new("TEST".to_string(), 4, "world".to_string(), GameMode::FreeForAll);
        let mut activity = TickActivity::default();
        join(&mut lobby, 1, &mut activity);

        assert!(lobby.players.contains_key(&1));
        assert!(lobby.client_addresses.contains_key(&1));
        assert_eq!(activity.joined, vec![(1, addr(9001))]);

        // repeated hello from an HTTP-joined player keeps the player
        join(&mut lobby, 1, &mut activity);
        assert_eq!(lobby.players.len(), 1);
    }

    #[test]
    fn test_process_command_fire_and_damage() {
        let mut lobby = Lobby::new("TEST".to_string(), 4, "flat".to_string(), GameMode::FreeForAll);
        let weapons = WeaponDb::load();
        let config = Config::default();
        let mut activity = TickActivity::default();
        join(&mut lobby, 1, &mut activity);
        join(&mut lobby, 2, &mut activity);

        let position = LobbyCommand::PositionUpdate {
            player_id: 2,
            position: Vec3::new(0.0, 0.0, 10.0),
            rotation: Vec3::ZERO,
            velocity: Vec3::ZERO,
            addr: addr(9002),
        };
        process_command(&mut lobby, &weapons, &config, position, &mut activity);
        assert_eq!(activity.moved, vec![2]);

        let fire = LobbyCommand::Fire {
            player_id: 1,
            action: FireAction {
                weapon_index: 0,
                origin: Vec3::new(0.0, 1.65, 0.0),
                direction: Vec3::Z,
                first_shot_seq: 1,
                pellet_count: 1,
                fired_at: 0.0,
            },
        };
        process_command(&mut lobby, &weapons, &config, fire, &mut activity);

        let damage = LobbyCommand::Damage {
            player_id: 1,
            request: crate::domain::relay::DamageRequest {
                target: 2,
                damage: 20.0,
                hit_point: Vec3::new(0.0, 1.15, 9.55),
                hit_direction: Vec3::Z,
                body_part: None,
                is_headshot: false,
                weapon_index: 0,
                shot_seq: 1,
            },
        };
        process_command(&mut lobby, &weapons, &config, damage.clone(), &mut activity);
        process_command(&mut lobby, &weapons, &config, damage, &mut activity);

        assert_eq!(lobby.players[&1].inventory.current().ammo(), 29);
        assert_eq!(lobby.players[&2].health, 80.0);
    }

    #[test]
    fn test_cosmetics_skip_owner() {
        let mut lobby = Lobby::new("TEST".to_string(), 4, "world".to_string(), GameMode::FreeForAll);
        let mut activity = TickActivity::default();
        join(&mut lobby, 1, &mut activity);
        join(&mut lobby, 2, &mut activity);

        let cmd = LobbyCommand::StopSfx { player_id: 1, key: SoundKey::Reload };
        process_command(&mut lobby, &WeaponDb::load(), &Config::default(), cmd, &mut activity);

        let events = lobby.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(delta_sync::recipients(&lobby, events[0].route()), vec![addr(9002)]);
    }

    #[test]
    fn test_simulate_advances_clock_and_respawns() {
        let mut lobby = Lobby::new("TEST".to_string(), 4, "world".to_string(), GameMode::FreeForAll);
        let mut activity = TickActivity::default();
        join(&mut lobby, 1, &mut activity);
        {
            let player = lobby.players.get_mut(&1).unwrap();
            player.is_dead = true;
            player.health = 0.0;
            player.respawn_at = Some(0.05);
        }
        for _ in 0..3 {
            simulate(&mut lobby, 0.02);
        }
        assert!(lobby.clock > 0.05);
        assert!(!lobby.players[&1].is_dead);
    }

    #[test]
    fn test_leave_records_activity() {
        let mut lobby = Lobby::new("TEST".to_string(), 4, "world".to_string(), GameMode::FreeForAll);
        let mut activity = TickActivity::default();
        join(&mut lobby, 1, &mut activity);
        process_command(
            &mut lobby,
            &WeaponDb::load(),
            &Config::default(),
            LobbyCommand::PlayerLeave { player_id: 1 },
            &mut activity,
        );
        assert!(lobby.players.is_empty());
        assert_eq!(activity.left, vec![1]);
    }

    #[tokio::test]
    async fn test_welcome_reaches_client() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client_addr = client.local_addr().unwrap();

        let mut lobby = Lobby::new("TEST".to_string(), 4, "world".to_string(), GameMode::FreeForAll);
        let mut activity = TickActivity::default();
        process_command(
            &mut lobby,
            &WeaponDb::load(),
            &Config::default(),
            LobbyCommand::PlayerJoin { player_id: 1, name: "A".to_string(), team: None, addr: client_addr },
            &mut activity,
        );

        let mut buffer = PacketBuffer::default();
        send_welcome_message(&lobby, &server, &mut buffer, 1, client_addr).await;

        let mut buf = [0u8; 1024];
        let (len, _) = client.recv_from(&mut buf).await.unwrap();
        let packet: ServerPacket = serde_json::from_slice(&buf[..len]).unwrap();
        assert!(matches!(packet, ServerPacket::Welcome { player_id: 1, .. }));
    }
}
