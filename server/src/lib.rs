//! # Authoritative Server Library
//!
//! This library provides the authoritative side of the arena netcode. It owns
//! the canonical simulation, validates client shots against rewound history,
//! and tells each client when the server has taken over its movement.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Client inputs are queued as they arrive and applied at the next tick
//! boundary in arrival order. Every simulated state is stored in a per-entity
//! history ring so later shots can be checked against where things were.
//!
//! ### Latency Handoff
//! When an owner's input arrives late enough, the server extrapolates that
//! entity itself for a short window and the client stops predicting. The
//! latency that triggered it travels with each state snapshot, so both sides
//! make the same decision.
//!
//! ### Lag-Compensated Combat
//! Hitscan shots are resolved immediately with the shooter's state rewound by
//! its measured latency. Projectile weapons are simulated on the server and
//! resolved by overlap each tick. Damage only ever lands on enemy teams.
//!
//! ## Module Organization
//!
//! ### Authority Module (`authority`)
//! Input queue, per-entity history, correction cooldowns and extrapolation.
//!
//! ### Hit Validation Module (`hit_validation`)
//! Latency-to-ticks conversion, history rewind, raycast and damage.
//!
//! ### Projectile Module (`projectile`)
//! Server-simulated projectiles with lifetime and overlap hits.
//!
//! ### Game Module (`game`)
//! Fixed-step scheduler tying the above together in tick order.
//!
//! ### Client Manager Module (`client_manager`)
//! Connection tracking, entity ownership, teams and timeouts.
//!
//! ### Network Module (`network`)
//! UDP socket tasks and envelope routing.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use shared::{AlwaysOpen, NetcodeConfig, World};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         NetcodeConfig::default(),
//!         World::arena(),
//!         Arc::new(AlwaysOpen),
//!         16,
//!     )
//!     .await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod authority;
pub mod client_manager;
pub mod game;
pub mod hit_validation;
pub mod network;
pub mod projectile;
