//! Authoritative movement simulation.
//!
//! Inputs are queued in arrival order and the whole queue is drained on each
//! tick. Inputs are deliberately not resequenced by tick: an input that arrives
//! late is simulated after the ones that overtook it. Every simulated input
//! writes a snapshot into the entity's history, but only the last one per
//! entity per tick is sent to its owner.

use log::{debug, warn};
use shared::cooldown::Transition;
use shared::movement::simulate;
use shared::protocol::latency_seconds;
use shared::{
    CombatGate, CorrectionState, EntityId, EntityRegistry, ExtrapolationController, InputSample,
    NetcodeConfig, Outbox, Packet, RingBuffer, SnapshotHistory, StateSnapshot, World,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

/// Per-entity authority state.
#[derive(Debug, Clone)]
pub struct EntityAuthority {
    pub history: RingBuffer<StateSnapshot>,
    pub correction: CorrectionState,
    pub extrapolation: ExtrapolationController,
}

/// Snapshot sent to an owner at the end of a tick, with the latency measured
/// for the input that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickResult {
    pub snapshot: StateSnapshot,
    pub latency: f32,
}

pub struct AuthorityServer {
    config: NetcodeConfig,
    world: Arc<World>,
    gate: Arc<dyn CombatGate>,
    queue: VecDeque<InputSample>,
    entities: HashMap<EntityId, EntityAuthority>,
}

impl AuthorityServer {
    pub fn new(config: NetcodeConfig, world: Arc<World>, gate: Arc<dyn CombatGate>) -> Self {
        Self {
            config,
            world,
            gate,
            queue: VecDeque::new(),
            entities: HashMap::new(),
        }
    }

    /// Starts tracking history and correction state for `entity`.
    pub fn track(&mut self, entity: EntityId) {
        self.entities.insert(
            entity,
            EntityAuthority {
                history: RingBuffer::new(self.config.buffer_capacity),
                correction: CorrectionState::new(
                    self.config.reconciliation_cooldown,
                    self.config.extrapolation_limit,
                ),
                extrapolation: ExtrapolationController::new(
                    self.config.extrapolation_limit,
                    self.config.extrapolation_multiplier,
                    self.config.fixed_delta(),
                ),
            },
        );
    }

    /// Stops tracking `entity` and discards its queued inputs.
    pub fn forget(&mut self, entity: EntityId) {
        self.entities.remove(&entity);
        self.queue.retain(|input| input.entity_id != entity);
    }

    /// Queues an input exactly as it arrived.
    pub fn enqueue(&mut self, input: InputSample) {
        self.queue.push_back(input);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drains the input queue, simulating each input in arrival order.
    ///
    /// `now_ms` is the server wall clock used to measure per-input latency.
    /// Returns what was sent to each owner, ordered by entity id.
    pub fn process_tick(
        &mut self,
        now_ms: u64,
        registry: &mut EntityRegistry,
        outbox: &Outbox,
    ) -> Vec<TickResult> {
        let combat_enabled = self.gate.combat_enabled();
        let dt = self.config.fixed_delta();
        let mut latest: BTreeMap<EntityId, TickResult> = BTreeMap::new();

        while let Some(input) = self.queue.pop_front() {
            let Some(authority) = self.entities.get_mut(&input.entity_id) else {
                warn!("Dropping input for untracked entity {}", input.entity_id);
                continue;
            };
            let Some(entity) = registry.get_mut(input.entity_id) else {
                warn!("Dropping input for unknown entity {}", input.entity_id);
                continue;
            };

            let command = if combat_enabled {
                input.command()
            } else {
                input.command().idle()
            };
            let ground = self.world.probe_ground(entity.state.position, &self.config.movement);
            entity.state = simulate(&self.config.movement, &entity.state, &command, ground, dt);

            let snapshot = StateSnapshot::from_state(input.tick, input.entity_id, &entity.state);
            authority.history.put(input.tick, snapshot);
            latest.insert(
                input.entity_id,
                TickResult {
                    snapshot,
                    latency: latency_seconds(input.sent_at, now_ms),
                },
            );
        }

        for result in latest.values() {
            let entity_id = result.snapshot.entity_id;
            outbox.unicast(
                entity_id,
                Packet::Snapshot {
                    snapshot: result.snapshot,
                    latency: result.latency,
                },
            );

            if let Some(authority) = self.entities.get_mut(&entity_id) {
                authority
                    .extrapolation
                    .update(&mut authority.correction, &result.snapshot, result.latency);
            }
        }

        latest.into_values().collect()
    }

    /// Per-frame update: advances cooldowns and moves extrapolating entities.
    pub fn advance_frame(&mut self, dt: f32, registry: &mut EntityRegistry) {
        for (entity_id, authority) in self.entities.iter_mut() {
            if authority.correction.advance(dt) == Some(Transition::LeftExtrapolation) {
                debug!("Entity {} extrapolation expired", entity_id);
            }
            authority.extrapolation.sync(&authority.correction);

            if let Some(entity) = registry.get_mut(*entity_id) {
                authority.extrapolation.advance_visible(
                    &authority.correction,
                    &mut entity.state.position,
                    dt,
                );
            }
        }
    }

    pub fn entity(&self, entity: EntityId) -> Option<&EntityAuthority> {
        self.entities.get(&entity)
    }

    pub fn correction(&self, entity: EntityId) -> Option<&CorrectionState> {
        self.entities.get(&entity).map(|authority| &authority.correction)
    }

    pub fn tracked(&self) -> usize {
        self.entities.len()
    }
}

impl SnapshotHistory for AuthorityServer {
    fn history(&self, entity: EntityId) -> Option<&RingBuffer<StateSnapshot>> {
        self.entities.get(&entity).map(|authority| &authority.history)
    }
}
