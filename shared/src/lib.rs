//! Deterministic netcode core shared by the client and the server.
//!
//! Everything in this crate that touches simulation state is a plain,
//! synchronous function of its inputs. Transport and scheduling live in the
//! `client` and `server` crates.

pub mod bus;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod extrapolation;
pub mod gate;
pub mod history;
pub mod math;
pub mod movement;
pub mod protocol;
pub mod registry;
pub mod ring_buffer;
pub mod stats;
pub mod tick;
pub mod weapon;
pub mod world;

pub use bus::{Envelope, Outbox, Recipient, Role};
pub use config::{CombatConfig, NetcodeConfig};
pub use cooldown::{AuthorityMode, CooldownTimer, CorrectionPhase, CorrectionState, Transition};
pub use error::{NetcodeError, NetcodeResult};
pub use extrapolation::{ExtrapolatedState, ExtrapolationController};
pub use gate::{AlwaysOpen, CombatGate, RoundGate};
pub use history::SnapshotHistory;
pub use math::{Quat, Vec3};
pub use movement::{simulate, GroundSensor, MoveCommand, MoveInput, MovementConfig, PhysicalState};
pub use protocol::{
    ClientId, DamageApplied, EntityId, EntityView, HitEffect, InputSample, Packet, ShotRecord,
    StateSnapshot,
};
pub use registry::{EntityComponents, EntityRegistry};
pub use ring_buffer::RingBuffer;
pub use stats::{DamageOutcome, PlayerStats, TeamId};
pub use tick::{Tick, TickClock};
pub use weapon::{FireLoop, Weapon, WeaponKind};
pub use world::World;
