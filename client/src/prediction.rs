//! Client-side prediction for the locally owned entity
//!
//! Every consumed tick the owner samples its input, simulates it immediately
//! with the same deterministic step the server uses, records both the input
//! and the resulting snapshot under that tick, and sends the input upstream.
//! The buffered inputs are what reconciliation replays after a correction.

use log::debug;
use shared::movement::simulate;
use shared::{
    AuthorityMode, CombatGate, CorrectionState, EntityId, InputSample, MoveCommand, NetcodeConfig,
    Outbox, Packet, PhysicalState, Quat, RingBuffer, StateSnapshot, Tick, Vec3, World,
};
use std::sync::Arc;

pub struct PredictionController {
    entity_id: EntityId,
    config: NetcodeConfig,
    world: Arc<World>,
    inputs: RingBuffer<InputSample>,
    states: RingBuffer<StateSnapshot>,
    live: PhysicalState,
}

impl PredictionController {
    pub fn new(entity_id: EntityId, spawn: Vec3, config: NetcodeConfig, world: Arc<World>) -> Self {
        Self {
            entity_id,
            inputs: RingBuffer::new(config.buffer_capacity),
            states: RingBuffer::new(config.buffer_capacity),
            live: PhysicalState::at(spawn),
            config,
            world,
        }
    }

    /// Predicts one tick.
    ///
    /// Does nothing while the server owns the transform. A closed combat gate
    /// turns the sample into an idle one before it is simulated or sent, so
    /// the buffered input always matches what the server will run.
    pub fn tick(
        &mut self,
        tick: Tick,
        command: MoveCommand,
        correction: &CorrectionState,
        gate: &dyn CombatGate,
        now_ms: u64,
        outbox: &Outbox,
    ) -> Option<InputSample> {
        if correction.authority() == AuthorityMode::ServerOwned {
            return None;
        }

        let command = if gate.combat_enabled() {
            command
        } else {
            command.idle()
        };
        let sample = InputSample {
            tick,
            entity_id: self.entity_id,
            sent_at: now_ms,
            movement: command.movement,
            look_yaw: command.look_yaw,
            jump: command.jump,
            reported_position: self.live.position,
        };

        self.inputs.put(tick, sample);
        self.live = self.step(&self.live, &sample);
        self.states
            .put(tick, StateSnapshot::from_state(tick, self.entity_id, &self.live));

        outbox.to_server(Packet::Input(sample));
        Some(sample)
    }

    fn step(&self, state: &PhysicalState, sample: &InputSample) -> PhysicalState {
        let ground = self.world.probe_ground(state.position, &self.config.movement);
        simulate(
            &self.config.movement,
            state,
            &sample.command(),
            ground,
            self.config.fixed_delta(),
        )
    }

    /// Overwrites the buffered snapshot at `snapshot.tick`.
    pub fn reseed(&mut self, snapshot: &StateSnapshot) {
        self.states.put(snapshot.tick, *snapshot);
    }

    /// Re-simulates buffered inputs for every tick after `from` up to and
    /// including `to`, starting from the live state. Returns the number of
    /// ticks replayed.
    ///
    /// A gap of a full buffer or more is not replayed: the buffered inputs
    /// for those ticks have already been overwritten.
    pub fn replay(&mut self, from: Tick, to: Tick) -> usize {
        if to <= from {
            return 0;
        }
        let gap = (to - from) as usize;
        if gap >= self.inputs.capacity() {
            debug!(
                "Replay gap of {} ticks exceeds buffer, keeping snapped state",
                gap
            );
            return 0;
        }

        for tick in from + 1..=to {
            let sample = *self.inputs.get(tick);
            self.live = self.step(&self.live, &sample);
            self.states
                .put(tick, StateSnapshot::from_state(tick, self.entity_id, &self.live));
        }
        gap
    }

    /// Takes a pose from the server while it owns the transform.
    pub fn adopt_pose(&mut self, position: Vec3, rotation: Quat) {
        self.live.position = position;
        self.live.rotation = rotation;
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn live(&self) -> &PhysicalState {
        &self.live
    }

    pub fn set_live(&mut self, state: PhysicalState) {
        self.live = state;
    }

    pub fn predicted(&self, tick: Tick) -> &StateSnapshot {
        self.states.get(tick)
    }

    pub fn input(&self, tick: Tick) -> &InputSample {
        self.inputs.get(tick)
    }

    pub fn states(&self) -> &RingBuffer<StateSnapshot> {
        &self.states
    }
}
