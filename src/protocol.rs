//! UDP wire packets (JSON, `type` tagged) and the client-side outbox.

use bytes::{BufMut, Bytes, BytesMut};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use crate::domain::inventory::PullOutToken;
use crate::domain::relay::{
    ActionRelay, DamageRelay, DamageRequest, FireAction, FxRelay, SfxRelay, ShotFx, SoundKey,
};
use crate::domain::{PlayerId, TeamId};

/// Client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientPacket {
    Join {
        player_name: String,
        #[serde(default)]
        team: Option<TeamId>,
    },
    Leave,
    PositionUpdate {
        position: Vec3,
        #[serde(default)]
        rotation: Vec3,
        #[serde(default)]
        velocity: Vec3,
    },
    Fire(FireAction),
    Reload,
    WeaponSwitch {
        slot: usize,
        #[serde(default)]
        force: bool,
    },
    PullOutComplete {
        token: PullOutToken,
    },
    Damage(DamageRequest),
    ShotFx(ShotFx),
    WorldSfx {
        key: SoundKey,
        attach_to_self: bool,
        allow_overlap: bool,
    },
    StopSfx {
        key: SoundKey,
    },
    #[serde(alias = "keepalive")]
    Heartbeat,
}

/// Every client packet is addressed to one lobby and signed with the sender id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    pub lobby_code: String,
    pub player_id: PlayerId,
    #[serde(flatten)]
    pub packet: ClientPacket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub team: Option<TeamId>,
    pub position: Vec3,
    pub rotation: Vec3,
    pub health: f32,
    pub is_dead: bool,
}

/// Server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerPacket {
    Welcome {
        player_id: PlayerId,
        message: String,
    },
    PlayerList {
        players: Vec<PlayerSnapshot>,
    },
    PlayerJoined {
        player: PlayerSnapshot,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    PositionUpdate {
        player_id: PlayerId,
        position: Vec3,
        rotation: Vec3,
        velocity: Vec3,
    },
    PlayerStateUpdate {
        player_id: PlayerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        health: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ammo: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_ammo: Option<u32>,
    },
    WeaponSwitched {
        player_id: PlayerId,
        slot: usize,
        weapon_id: u32,
    },
    ReloadStarted {
        player_id: PlayerId,
    },
    ReloadFinished {
        player_id: PlayerId,
    },
    MultiplierUpdate {
        player_id: PlayerId,
        multiplier: f32,
    },
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
    HitConfirm {
        target: PlayerId,
        damage: f32,
        was_kill: bool,
        shot_seq: u64,
    },
    PlayerKilled {
        victim: PlayerId,
        killer: PlayerId,
    },
    PlayerRespawned {
        player_id: PlayerId,
        position: Vec3,
    },
    /// Authoritative ammo for one of the receiver's weapon slots
    AmmoSync {
        weapon_index: usize,
        ammo: u32,
    },
}

/// Serialize `value` into the reusable buffer and split it off as one datagram
pub fn encode<T: Serialize>(value: &T, buffer: &mut BytesMut) -> Result<Bytes, serde_json::Error> {
    buffer.clear();
    serde_json::to_writer((&mut *buffer).writer(), value)?;
    Ok(buffer.split().freeze())
}

/// Outbound queue implementing the network relays for the local player.
/// The transport drains it once per frame.
#[derive(Debug, Clone)]
pub struct PacketOutbox {
    lobby_code: String,
    player_id: PlayerId,
    queue: Vec<ClientPacket>,
}

impl PacketOutbox {
    pub fn new(lobby_code: impl Into<String>, player_id: PlayerId) -> Self {
        Self {
            lobby_code: lobby_code.into(),
            player_id,
            queue: Vec::new(),
        }
    }

    pub fn push(&mut self, packet: ClientPacket) {
        self.queue.push(packet);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> &[ClientPacket] {
        &self.queue
    }

    /// Take everything queued, in send order
    pub fn drain(&mut self) -> Vec<ClientEnvelope> {
        self.queue
            .drain(..)
            .map(|packet| ClientEnvelope {
                lobby_code: self.lobby_code.clone(),
                player_id: self.player_id,
                packet,
            })
            .collect()
    }

    /// Drain and serialize every queued packet
    pub fn flush(&mut self, buffer: &mut BytesMut) -> Result<Vec<Bytes>, serde_json::Error> {
        self.drain().iter().map(|envelope| encode(envelope, buffer)).collect()
    }
}

impl DamageRelay for PacketOutbox {
    fn request_damage(&mut self, request: DamageRequest) {
        self.push(ClientPacket::Damage(request));
    }
}

impl FxRelay for PacketOutbox {
    fn request_shot_fx(&mut self, fx: ShotFx) {
        self.push(ClientPacket::ShotFx(fx));
    }
}

impl SfxRelay for PacketOutbox {
    fn request_world_sfx(&mut self, key: SoundKey, attach_to_self: bool, allow_overlap: bool) {
        self.push(ClientPacket::WorldSfx { key, attach_to_self, allow_overlap });
    }

    fn stop_world_sfx(&mut self, key: SoundKey) {
        self.push(ClientPacket::StopSfx { key });
    }
}

impl ActionRelay for PacketOutbox {
    fn send_fire(&mut self, action: FireAction) {
        self.push(ClientPacket::Fire(action));
    }

    fn send_reload(&mut self) {
        self.push(ClientPacket::Reload);
    }

    fn send_weapon_switch(&mut self, slot: usize, force: bool) {
        self.push(ClientPacket::WeaponSwitch { slot, force });
    }

    fn send_pull_out_complete(&mut self, token: PullOutToken) {
        self.push(ClientPacket::PullOutComplete { token });
    }
}
