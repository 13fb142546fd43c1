use std::collections::HashMap;
use std::time::SystemTime;
use std::net::SocketAddr;
use glam::Vec3;
use crate::domain::inventory::WeaponInventory;
use crate::domain::relay::{GameMode, MatchSettings, TeamRoster};
use crate::domain::replication::{BroadcastGate, FireBudget, SeqWindow};
use crate::domain::simulator::ArenaWorld;
use crate::domain::{PlayerId, TeamId};
use crate::protocol::PlayerSnapshot;
use crate::utils::buffers::{SmallPlayerVec, SyncEvent};

pub type LobbyCode = String;

/// Player state in a lobby
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: Option<TeamId>,
    /// Feet position
    pub position: Vec3,
    pub rotation: Vec3,
    pub velocity: Vec3,
    pub last_update: SystemTime,

    // Health state
    pub health: f32,
    pub max_health: f32,
    pub is_dead: bool,
    pub respawn_at: Option<f64>,
    pub kills: u32,
    pub deaths: u32,

    /// Authoritative copy of the client's weapons
    pub inventory: WeaponInventory,
    /// One past the highest shot sequence this player actually fired
    pub fired_seq_limit: u64,
    pub damage_window: SeqWindow,
    /// Server-time allowance for fire packets
    pub fire_budget: FireBudget,
    pub multiplier_gate: BroadcastGate,
}

/// Player sync state for delta tracking
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSyncState {
    pub id: PlayerId,
    pub health: f32,
    pub max_health: f32,
    pub current_slot: usize,
    pub current_weapon_id: u32,
    pub current_ammo: u32,
    pub max_ammo: u32,
    pub is_reloading: bool,
}

impl Player {
    pub fn new(
        id: PlayerId,
        name: String,
        team: Option<TeamId>,
        max_health: f32,
        inventory: WeaponInventory,
        fire_budget: FireBudget,
        multiplier_gate: BroadcastGate,
    ) -> Self {
        Self {
            id,
            name,
            team,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            velocity: Vec3::ZERO,
            last_update: SystemTime::now(),
            health: max_health,
            max_health,
            is_dead: false,
            respawn_at: None,
            kills: 0,
            deaths: 0,
            inventory,
            fired_seq_limit: 1,
            damage_window: SeqWindow::new(),
            fire_budget,
            multiplier_gate,
        }
    }

    pub fn to_sync_state(&self) -> PlayerSyncState {
        let weapon = self.inventory.current();
        PlayerSyncState {
            id: self.id,
            health: self.health,
            max_health: self.max_health,
            current_slot: self.inventory.current_index(),
            current_weapon_id: weapon.definition().id,
            current_ammo: weapon.ammo(),
            max_ammo: weapon.mag_size(),
            is_reloading: weapon.is_reloading(),
        }
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            name: self.name.clone(),
            team: self.team,
            position: self.position,
            rotation: self.rotation,
            health: self.health,
            is_dead: self.is_dead,
        }
    }
}

/// Lobby state - per-lobby partitioned state
#[derive(Debug)]
pub struct Lobby {
    pub code: LobbyCode,
    pub players: HashMap<PlayerId, Player>,
    pub client_addresses: HashMap<PlayerId, SocketAddr>,
    pub max_players: u32,
    pub scene: String,
    pub game_mode: GameMode,
    pub world: ArenaWorld,
    /// Seconds of simulated time, advanced once per tick
    pub clock: f64,

    // Delta tracking for efficient state sync
    pub dirty_players: SmallPlayerVec,  // Players with state changes
    pub last_sync_state: HashMap<PlayerId, PlayerSyncState>,
    /// Notifications produced while processing this tick
    pub pending_events: Vec<SyncEvent>,
}

impl Lobby {
    pub fn new(code: LobbyCode, max_players: u32, scene: String, game_mode: GameMode) -> Self {
        let world = ArenaWorld::for_scene(&scene);
        Self {
            code,
            players: HashMap::new(),
            client_addresses: HashMap::new(),
            max_players,
            scene,
            game_mode,
            world,
            clock: 0.0,
            dirty_players: SmallPlayerVec::new(),
            last_sync_state: HashMap::new(),
            pending_events: Vec::new(),
        }
    }

    /// Mark a player as dirty (state changed)
    pub fn mark_dirty(&mut self, player_id: PlayerId) {
        if !self.dirty_players.contains(&player_id) {
            self.dirty_players.push(player_id);
        }
    }

    /// Clear all dirty flags
    pub fn clear_dirty(&mut self) {
        self.dirty_players.clear();
    }

    pub fn emit(&mut self, event: SyncEvent) {
        self.pending_events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<SyncEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn advance_clock(&mut self, dt: f32) {
        self.clock += f64::from(dt.max(0.0));
    }

    /// Team with the fewest members, for auto-assignment in team modes
    pub fn smallest_team(&self) -> TeamId {
        let count = |team: TeamId| self.players.values().filter(|p| p.team == Some(team)).count();
        if count(1) < count(0) { 1 } else { 0 }
    }
}

impl MatchSettings for Lobby {
    fn game_mode(&self) -> GameMode {
        self.game_mode
    }
}

impl TeamRoster for Lobby {
    fn team_of(&self, player: PlayerId) -> Option<TeamId> {
        self.players.get(&player).and_then(|p| p.team)
    }
}
