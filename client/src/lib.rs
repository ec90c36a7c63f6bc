//! # Game Client Library
//!
//! This library provides the predicting side of the arena netcode: it moves
//! the local player immediately, keeps a tick-indexed history of what it
//! predicted, and corrects itself when the authoritative server disagrees.
//!
//! ## Architecture Overview
//!
//! ### Client-Side Prediction
//! Every tick the client samples input, simulates it with the same
//! deterministic step the server runs, buffers the input and the resulting
//! state under that tick, and sends the input upstream.
//!
//! ### Server Reconciliation
//! When an authoritative snapshot arrives, the state predicted for the same
//! tick is compared with it. A divergence above the threshold snaps the
//! player to the server state and replays every buffered input since, so
//! the correction does not freeze the player in the past.
//!
//! ### Authority Handoff
//! Each snapshot carries the latency the server measured. When it lands in
//! the extrapolation window, the server takes over movement for a short
//! while; the client mirrors that decision, stops predicting and shows the
//! server's pose until the window closes.
//!
//! ## Module Organization
//!
//! ### Prediction Module (`prediction`)
//! Input and state ring buffers, the live predicted state, and replay.
//!
//! ### Reconciliation Module (`reconciliation`)
//! Divergence check, snap, replay and cooldown.
//!
//! ### Shooting Module (`shooting`)
//! Fire loop cadence and `ShotRecord` creation.
//!
//! ### Input Module (`input`)
//! Keyboard/mouse sampling with edge detection, behind `InputSource`.
//!
//! ### Game Module (`game`)
//! The per-frame scheduler and packet handling.
//!
//! ### Network Module (`network`)
//! UDP transport thread with simulated latency and packet loss.
//!
//! ### Rendering Module (`rendering`)
//! Top-down debug view.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::ClientGame;
//! use client::input::{FrameInput, InputSource, ScriptedInput};
//! use client::network::{NetworkConditions, Transport};
//! use shared::{NetcodeConfig, RoundGate, World};
//!
//! let mut transport = Transport::start("127.0.0.1:8080", NetworkConditions::default())?;
//! let mut game = ClientGame::new(
//!     NetcodeConfig::default(),
//!     World::arena(),
//!     RoundGate::new(true),
//!     transport.outbox(),
//! );
//! let mut input = ScriptedInput::constant(FrameInput::default());
//!
//! game.connect();
//! loop {
//!     for packet in transport.poll() {
//!         game.handle_packet(packet);
//!     }
//!     let frame = input.sample(1.0 / 60.0);
//!     game.frame(1.0 / 60.0, &frame, shared::protocol::timestamp_millis(), None);
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! # Ok::<(), shared::NetcodeError>(())
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod prediction;
pub mod reconciliation;
pub mod rendering;
pub mod shooting;
