use std::collections::HashMap;
use std::net::SocketAddr;
use glam::Vec3;
use tokio::sync::mpsc;
use crate::domain::inventory::PullOutToken;
use crate::domain::relay::{DamageRequest, FireAction, ShotFx, SoundKey};
use crate::domain::{PlayerId, TeamId};

/// Command sent from network handlers to lobby tick loop
#[derive(Debug, Clone)]
pub enum LobbyCommand {
    // Player management
    PlayerJoin {
        player_id: PlayerId,
        name: String,
        team: Option<TeamId>,
        addr: SocketAddr,
    },
    PlayerLeave {
        player_id: PlayerId,
    },

    // Position (only latest kept per player)
    PositionUpdate {
        player_id: PlayerId,
        position: Vec3,
        rotation: Vec3,
        velocity: Vec3,
        addr: SocketAddr,  // Track UDP address for broadcasting
    },

    // Weapon inputs, replayed against the server's copy
    Fire {
        player_id: PlayerId,
        action: FireAction,
    },
    Reload {
        player_id: PlayerId,
    },
    WeaponSwitch {
        player_id: PlayerId,
        slot: usize,
        force: bool,
    },
    PullOutComplete {
        player_id: PlayerId,
        token: PullOutToken,
    },

    // Combat
    Damage {
        player_id: PlayerId,
        request: DamageRequest,
    },

    // Cosmetics relayed to observers
    ShotFx {
        player_id: PlayerId,
        fx: ShotFx,
    },
    WorldSfx {
        player_id: PlayerId,
        key: SoundKey,
        attach_to_self: bool,
        allow_overlap: bool,
    },
    StopSfx {
        player_id: PlayerId,
        key: SoundKey,
    },

    // Keepalive
    Heartbeat {
        player_id: PlayerId,
        addr: SocketAddr,  // Track UDP address for broadcasting
    },
}

/// Coalesce commands from queue, keeping only latest position per player
/// This drops stale position packets and prevents queue overflow
pub fn drain_and_coalesce(
    rx: &mut mpsc::Receiver<LobbyCommand>
) -> Vec<LobbyCommand> {
    let mut latest_positions: HashMap<PlayerId, LobbyCommand> = HashMap::new();
    let mut other_commands: Vec<LobbyCommand> = Vec::new();

    // Drain all available commands
    while let Ok(cmd) = rx.try_recv() {
        match cmd {
            LobbyCommand::PositionUpdate { player_id, .. } => {
                // Keep only the LATEST position per player
                latest_positions.insert(player_id, cmd);
            }
            _ => other_commands.push(cmd),
        }
    }

    // Return: other commands first, then latest positions
    other_commands.extend(latest_positions.into_values());
    other_commands
}
