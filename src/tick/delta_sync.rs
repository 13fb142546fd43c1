use std::net::SocketAddr;
use crate::protocol::ServerPacket;
use crate::state::lobby::Lobby;
use crate::utils::buffers::{Route, SmallEventVec, SyncEvent};

/// Collect dirty events for delta-based state sync
/// Only includes changed fields compared to last sync state
pub fn collect_dirty_events(lobby: &mut Lobby) -> SmallEventVec {
    let mut events = SmallEventVec::new();

    for &player_id in &lobby.dirty_players {
        if let Some(player) = lobby.players.get(&player_id) {
            let current = player.to_sync_state();
            let last = lobby.last_sync_state.get(&player_id);

            // Only include changed fields
            if last.map(|l| l.health != current.health).unwrap_or(true) {
                events.push(SyncEvent::HealthChanged {
                    player_id,
                    health: current.health,
                });
            }

            if last.map(|l| l.current_ammo != current.current_ammo).unwrap_or(true) {
                events.push(SyncEvent::AmmoChanged {
                    player_id,
                    ammo: current.current_ammo,
                });
            }

            if last.map(|l| l.max_ammo != current.max_ammo).unwrap_or(true) {
                events.push(SyncEvent::MaxAmmoChanged {
                    player_id,
                    max_ammo: current.max_ammo,
                });
            }

            let weapon_changed = last
                .map(|l| l.current_slot != current.current_slot || l.current_weapon_id != current.current_weapon_id)
                .unwrap_or(true);
            if weapon_changed {
                events.push(SyncEvent::WeaponChanged {
                    player_id,
                    slot: current.current_slot,
                    weapon_id: current.current_weapon_id,
                });
            }

            if last.map(|l| l.is_reloading != current.is_reloading).unwrap_or(true) {
                events.push(SyncEvent::ReloadStateChanged {
                    player_id,
                    is_reloading: current.is_reloading,
                });
            }

            // Update last sync state
            lobby.last_sync_state.insert(player_id, current);
        }
    }

    events
}

/// Wire packet for a sync event
pub fn to_packet(event: &SyncEvent) -> ServerPacket {
    match *event {
        SyncEvent::HealthChanged { player_id, health } => ServerPacket::PlayerStateUpdate {
            player_id,
            health: Some(health),
            ammo: None,
            max_ammo: None,
        },
        SyncEvent::AmmoChanged { player_id, ammo } => ServerPacket::PlayerStateUpdate {
            player_id,
            health: None,
            ammo: Some(ammo),
            max_ammo: None,
        },
        SyncEvent::MaxAmmoChanged { player_id, max_ammo } => ServerPacket::PlayerStateUpdate {
            player_id,
            health: None,
            ammo: None,
            max_ammo: Some(max_ammo),
        },
        SyncEvent::WeaponChanged { player_id, slot, weapon_id } => {
            ServerPacket::WeaponSwitched { player_id, slot, weapon_id }
        }
        SyncEvent::ReloadStateChanged { player_id, is_reloading } => {
            if is_reloading {
                ServerPacket::ReloadStarted { player_id }
            } else {
                ServerPacket::ReloadFinished { player_id }
            }
        }
        SyncEvent::MultiplierChanged { player_id, multiplier } => {
            ServerPacket::MultiplierUpdate { player_id, multiplier }
        }
        SyncEvent::ShotFx { player_id, fx } => ServerPacket::ShotFx { player_id, fx },
        SyncEvent::WorldSfx { player_id, key, attach_to_self, allow_overlap } => {
            ServerPacket::WorldSfx { player_id, key, attach_to_self, allow_overlap }
        }
        SyncEvent::StopSfx { player_id, key } => ServerPacket::StopSfx { player_id, key },
        SyncEvent::HitConfirm { target, damage, was_kill, shot_seq, .. } => {
            ServerPacket::HitConfirm { target, damage, was_kill, shot_seq }
        }
        SyncEvent::PlayerKilled { victim, killer } => ServerPacket::PlayerKilled { victim, killer },
        SyncEvent::PlayerRespawned { player_id, position } => {
            ServerPacket::PlayerRespawned { player_id, position }
        }
        SyncEvent::AmmoSync { weapon_index, ammo, .. } => {
            ServerPacket::AmmoSync { weapon_index, ammo }
        }
    }
}

/// Addresses a routed event goes to
pub fn recipients(lobby: &Lobby, route: Route) -> Vec<SocketAddr> {
    lobby.client_addresses
        .iter()
        .filter(|(id, _)| match route {
            Route::All => true,
            Route::AllExcept(excluded) => **id != excluded,
            Route::Only(only) => **id == only,
        })
        .map(|(_, addr)| *addr)
        .collect()
}
