use std::net::SocketAddr;
use std::sync::Arc;
use crate::protocol::{ClientEnvelope, ClientPacket};
use crate::state::server_state::ServerState;
use crate::state::commands::LobbyCommand;

/// Ultra-thin UDP packet handler - no locks in hot path
/// Parses packet and enqueues command to lobby's command queue
pub async fn handle_udp_packet(
    data: &[u8],
    addr: SocketAddr,
    state: &Arc<ServerState>,
) {
    let envelope: ClientEnvelope = match serde_json::from_slice(data) {
        Ok(envelope) => envelope,
        Err(e) => {
            log::debug!("Malformed packet from {}: {}", addr, e);
            return;
        }
    };

    // Get command sender for lobby (read-only DashMap lookup, no lock)
    let Some(tx) = state.get_lobby_tx(&envelope.lobby_code) else {
        log::debug!("UDP packet for unknown lobby: {}", envelope.lobby_code);
        return;
    };

    let lobby_code = envelope.lobby_code.clone();
    let cmd = into_command(envelope, addr);

    // Non-blocking send - drop if queue is full (prevents backpressure)
    if tx.try_send(cmd).is_err() {
        log::debug!("Command queue full for lobby {}, dropping packet", lobby_code);
    }
}

/// Map a decoded packet onto the lobby command it requests
pub fn into_command(envelope: ClientEnvelope, addr: SocketAddr) -> LobbyCommand {
    let player_id = envelope.player_id;

    match envelope.packet {
        ClientPacket::Join { player_name, team } => {
            LobbyCommand::PlayerJoin { player_id, name: player_name, team, addr }
        }
        ClientPacket::Leave => LobbyCommand::PlayerLeave { player_id },
        ClientPacket::PositionUpdate { position, rotation, velocity } => {
            LobbyCommand::PositionUpdate { player_id, position, rotation, velocity, addr }
        }
        ClientPacket::Fire(action) => LobbyCommand::Fire { player_id, action },
        ClientPacket::Reload => LobbyCommand::Reload { player_id },
        ClientPacket::WeaponSwitch { slot, force } => {
            LobbyCommand::WeaponSwitch { player_id, slot, force }
        }
        ClientPacket::PullOutComplete { token } => {
            LobbyCommand::PullOutComplete { player_id, token }
        }
        ClientPacket::Damage(request) => LobbyCommand::Damage { player_id, request },
        ClientPacket::ShotFx(fx) => LobbyCommand::ShotFx { player_id, fx },
        ClientPacket::WorldSfx { key, attach_to_self, allow_overlap } => {
            LobbyCommand::WorldSfx { player_id, key, attach_to_self, allow_overlap }
        }
        ClientPacket::StopSfx { key } => LobbyCommand::StopSfx { player_id, key },
        ClientPacket::Heartbeat => LobbyCommand::Heartbeat { player_id, addr },
    }
}
