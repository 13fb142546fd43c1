use bytes::BytesMut;
use glam::Vec3;
use smallvec::SmallVec;
use crate::domain::relay::{ShotFx, SoundKey};
use crate::domain::PlayerId;

/// Type alias for small collections that avoid allocations
pub type SmallPlayerVec = SmallVec<[PlayerId; 8]>;
pub type SmallEventVec = SmallVec<[SyncEvent; 16]>;

/// Who receives an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    All,
    AllExcept(PlayerId),
    Only(PlayerId),
}

/// Sync event for delta-based state updates and lobby notifications
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    HealthChanged { player_id: PlayerId, health: f32 },
    AmmoChanged { player_id: PlayerId, ammo: u32 },
    MaxAmmoChanged { player_id: PlayerId, max_ammo: u32 },
    WeaponChanged { player_id: PlayerId, slot: usize, weapon_id: u32 },
    ReloadStateChanged { player_id: PlayerId, is_reloading: bool },
    MultiplierChanged { player_id: PlayerId, multiplier: f32 },
    ShotFx { player_id: PlayerId, fx: ShotFx },
    WorldSfx { player_id: PlayerId, key: SoundKey, attach_to_self: bool, allow_overlap: bool },
    StopSfx { player_id: PlayerId, key: SoundKey },
    HitConfirm { shooter: PlayerId, target: PlayerId, damage: f32, was_kill: bool, shot_seq: u64 },
    PlayerKilled { victim: PlayerId, killer: PlayerId },
    PlayerRespawned { player_id: PlayerId, position: Vec3 },
    AmmoSync { player_id: PlayerId, weapon_index: usize, ammo: u32 },
}

impl SyncEvent {
    pub fn route(&self) -> Route {
        match *self {
            // cosmetics were already played locally by the owner
            SyncEvent::ShotFx { player_id, .. }
            | SyncEvent::WorldSfx { player_id, .. }
            | SyncEvent::StopSfx { player_id, .. } => Route::AllExcept(player_id),
            SyncEvent::HitConfirm { shooter, .. } => Route::Only(shooter),
            SyncEvent::AmmoSync { player_id, .. } => Route::Only(player_id),
            _ => Route::All,
        }
    }
}

/// Pre-allocated buffer for packet serialization
pub struct PacketBuffer {
    buffer: BytesMut,
}

impl PacketBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn as_bytes_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new(1024)
    }
}
