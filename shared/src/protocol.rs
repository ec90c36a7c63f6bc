//! Wire messages exchanged between the predicting client and the authority.
//!
//! All packets are bincode-encoded and sent as single UDP datagrams.
//! Positions and velocities travel as full `f32` values so that the client can
//! compare authoritative snapshots against its own predictions exactly.

use crate::error::NetcodeResult;
use crate::math::{Quat, Vec3};
use crate::movement::{MoveCommand, MoveInput, PhysicalState};
use crate::stats::TeamId;
use crate::tick::Tick;
use bincode::{deserialize, serialize};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub type EntityId = u32;
pub type ClientId = u32;

/// Bumped whenever a packet layout changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Upper bound for one encoded datagram.
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// One tick of player intent, produced once per tick by the owning client.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InputSample {
    pub tick: Tick,
    pub entity_id: EntityId,
    /// Wall-clock send time in milliseconds since the Unix epoch.
    pub sent_at: u64,
    pub movement: MoveInput,
    pub look_yaw: f32,
    pub jump: bool,
    /// Client's own position when the sample was taken. Informational only.
    pub reported_position: Vec3,
}

impl InputSample {
    pub fn command(&self) -> MoveCommand {
        MoveCommand {
            movement: self.movement,
            look_yaw: self.look_yaw,
            jump: self.jump,
        }
    }
}

/// Physical state of one entity after simulating one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub tick: Tick,
    pub entity_id: EntityId,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl StateSnapshot {
    pub fn from_state(tick: Tick, entity_id: EntityId, state: &PhysicalState) -> Self {
        Self {
            tick,
            entity_id,
            position: state.position,
            rotation: state.rotation,
            velocity: state.velocity,
            angular_velocity: state.angular_velocity,
        }
    }

    pub fn physical_state(&self) -> PhysicalState {
        PhysicalState {
            position: self.position,
            rotation: self.rotation,
            velocity: self.velocity,
            angular_velocity: self.angular_velocity,
        }
    }
}

/// A single discrete shot, consumed once by the server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotRecord {
    pub tick: Tick,
    pub shooter_id: EntityId,
    pub origin: Vec3,
    pub direction: Vec3,
    pub sent_at: u64,
    pub weapon_index: usize,
}

/// Cosmetic impact marker broadcast to every client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitEffect {
    pub point: Vec3,
    pub normal: Vec3,
    pub shooter_id: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageApplied {
    pub target_id: EntityId,
    pub shooter_id: EntityId,
    pub amount: f32,
    pub new_health: f32,
    pub is_dead: bool,
}

/// Compact replicated view of an entity for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub position: Vec3,
    pub rotation: Quat,
    pub team: TeamId,
    pub health: f32,
    pub is_dead: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    // Client -> server
    Connect {
        client_version: u32,
    },
    Input(InputSample),
    Shot(ShotRecord),
    Disconnect,

    // Server -> client
    Connected {
        client_id: ClientId,
        entity_id: EntityId,
        team: TeamId,
        spawn: Vec3,
        tick: Tick,
    },
    /// Authoritative result of the owner's latest input this tick, with the
    /// latency measured for that input in seconds.
    Snapshot {
        snapshot: StateSnapshot,
        latency: f32,
    },
    HitEffect(HitEffect),
    DamageApplied(DamageApplied),
    WorldState {
        tick: Tick,
        entities: Vec<EntityView>,
    },
    /// Whether a round is in progress. Sent on connect and whenever it changes.
    RoundState {
        active: bool,
    },
    Disconnected {
        reason: String,
    },
}

impl Packet {
    pub fn encode(&self) -> NetcodeResult<Vec<u8>> {
        Ok(serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> NetcodeResult<Packet> {
        Ok(deserialize(bytes)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Packet::Connect { .. } => "Connect",
            Packet::Input(_) => "Input",
            Packet::Shot(_) => "Shot",
            Packet::Disconnect => "Disconnect",
            Packet::Connected { .. } => "Connected",
            Packet::Snapshot { .. } => "Snapshot",
            Packet::HitEffect(_) => "HitEffect",
            Packet::DamageApplied(_) => "DamageApplied",
            Packet::WorldState { .. } => "WorldState",
            Packet::RoundState { .. } => "RoundState",
            Packet::Disconnected { .. } => "Disconnected",
        }
    }
}

/// Milliseconds since the Unix epoch, saturating at `u64::MAX`.
pub fn timestamp_millis() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    millis.min(u64::MAX as u128) as u64
}

/// Seconds elapsed between a sender timestamp and `now`, never negative.
pub fn latency_seconds(sent_at: u64, now: u64) -> f32 {
    now.saturating_sub(sent_at) as f32 / 1000.0
}
