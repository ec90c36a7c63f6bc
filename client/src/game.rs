//! Client-side game state and the fixed-step scheduler for the owning role.
//!
//! Each rendered frame runs, in order: cooldown advance, then every tick the
//! clock yields (prediction followed by reconciliation), then the fire loop.
//! Packets from the server are applied between frames through
//! `handle_packet`; nothing here touches a socket.

use crate::input::FrameInput;
use crate::prediction::PredictionController;
use crate::reconciliation::{ReconcileOutcome, ReconciliationEngine};
use crate::shooting::{Aim, Shooter};
use log::{debug, info, warn};
use shared::cooldown::Transition;
use shared::protocol::PROTOCOL_VERSION;
use shared::{
    AuthorityMode, ClientId, CombatGate, CorrectionState, DamageApplied, EntityId, EntityView,
    ExtrapolationController, HitEffect, NetcodeConfig, Outbox, Packet, PhysicalState, Quat, Role,
    RoundGate, SnapshotHistory, StateSnapshot, TeamId, Tick, TickClock, Vec3, World,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Hit markers kept for drawing.
const MAX_EFFECTS: usize = 32;

/// State that exists only while connected.
pub struct Session {
    pub client_id: ClientId,
    pub entity_id: EntityId,
    pub team: TeamId,
    clock: TickClock,
    prediction: PredictionController,
    reconciliation: ReconciliationEngine,
    correction: CorrectionState,
    extrapolation: ExtrapolationController,
    shooter: Shooter,
    last_snapshot: Option<(StateSnapshot, f32)>,
    last_outcome: ReconcileOutcome,
    snaps: u32,
    health: f32,
    is_dead: bool,
}

impl Session {
    pub fn tick(&self) -> Tick {
        self.clock.current_tick()
    }

    pub fn live(&self) -> &PhysicalState {
        self.prediction.live()
    }

    pub fn prediction(&self) -> &PredictionController {
        &self.prediction
    }

    pub fn correction(&self) -> &CorrectionState {
        &self.correction
    }

    pub fn extrapolation(&self) -> &ExtrapolationController {
        &self.extrapolation
    }

    /// Newest authoritative snapshot and the latency the server measured for it.
    pub fn last_snapshot(&self) -> Option<&(StateSnapshot, f32)> {
        self.last_snapshot.as_ref()
    }

    pub fn last_outcome(&self) -> ReconcileOutcome {
        self.last_outcome
    }

    /// Number of reconciliation snaps so far.
    pub fn snaps(&self) -> u32 {
        self.snaps
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn is_dead(&self) -> bool {
        self.is_dead
    }

    pub fn shots_fired(&self) -> u32 {
        self.shooter.shots_fired()
    }
}

pub struct ClientGame {
    config: NetcodeConfig,
    world: Arc<World>,
    /// Round phase replicated from the server.
    gate: RoundGate,
    outbox: Outbox,
    session: Option<Session>,
    remote: BTreeMap<EntityId, EntityView>,
    world_tick: Option<Tick>,
    effects: VecDeque<HitEffect>,
    damage_log: VecDeque<DamageApplied>,
}

impl ClientGame {
    pub fn new(config: NetcodeConfig, world: World, gate: RoundGate, outbox: Outbox) -> Self {
        Self {
            config,
            world: Arc::new(world),
            gate,
            outbox,
            session: None,
            remote: BTreeMap::new(),
            world_tick: None,
            effects: VecDeque::new(),
            damage_log: VecDeque::new(),
        }
    }

    pub fn connect(&self) {
        info!("Connecting to server...");
        self.outbox.to_server(Packet::Connect {
            client_version: PROTOCOL_VERSION,
        });
    }

    pub fn disconnect(&mut self) {
        if self.session.take().is_some() {
            self.outbox.to_server(Packet::Disconnect);
        }
        self.remote.clear();
        self.world_tick = None;
    }

    pub fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected {
                client_id,
                entity_id,
                team,
                spawn,
                tick,
            } => {
                info!(
                    "Connected! Client ID: {}, entity {}, team {}, server tick {}",
                    client_id, entity_id, team, tick
                );
                self.outbox = self.outbox.with_role(Role::Client(entity_id));
                self.session = Some(self.start_session(client_id, entity_id, team, spawn, tick));
            }

            Packet::Snapshot { snapshot, latency } => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                if snapshot.entity_id != session.entity_id {
                    warn!("Snapshot for entity {} is not ours", snapshot.entity_id);
                    return;
                }
                session.reconciliation.receive(snapshot);
                session.last_snapshot = Some((snapshot, latency));
                match session
                    .extrapolation
                    .update(&mut session.correction, &snapshot, latency)
                {
                    Some(Transition::EnteredExtrapolation) => {
                        debug!("Server took over movement (latency {:.3}s)", latency)
                    }
                    Some(Transition::LeftExtrapolation) => debug!("Movement authority returned"),
                    None => {}
                }
            }

            Packet::WorldState { tick, entities } => {
                if self.world_tick.map_or(false, |last| tick <= last) {
                    return;
                }
                self.world_tick = Some(tick);
                self.apply_world_state(entities);
            }

            Packet::HitEffect(effect) => {
                if self.effects.len() == MAX_EFFECTS {
                    self.effects.pop_front();
                }
                self.effects.push_back(effect);
            }

            Packet::DamageApplied(damage) => {
                if self.entity_id() == Some(damage.target_id) {
                    info!(
                        "Hit by {} for {:.1} ({:.1} left)",
                        damage.shooter_id, damage.amount, damage.new_health
                    );
                } else {
                    debug!(
                        "Entity {} hit by {} for {:.1}",
                        damage.target_id, damage.shooter_id, damage.amount
                    );
                }
                if self.damage_log.len() == MAX_EFFECTS {
                    self.damage_log.pop_front();
                }
                self.damage_log.push_back(damage);
            }

            Packet::RoundState { active } => {
                if active != self.gate.combat_enabled() {
                    info!("Round {}", if active { "started" } else { "paused" });
                }
                if active {
                    self.gate.open();
                } else {
                    self.gate.close();
                }
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.session = None;
                self.remote.clear();
                self.world_tick = None;
            }

            other => {
                warn!("Unexpected {} packet from server", other.kind());
            }
        }
    }

    fn start_session(
        &self,
        client_id: ClientId,
        entity_id: EntityId,
        team: TeamId,
        spawn: Vec3,
        tick: Tick,
    ) -> Session {
        let config = &self.config;
        Session {
            client_id,
            entity_id,
            team,
            clock: TickClock::starting_at(config.tick_rate, tick),
            prediction: PredictionController::new(
                entity_id,
                spawn,
                config.clone(),
                Arc::clone(&self.world),
            ),
            reconciliation: ReconciliationEngine::new(config.reconciliation_threshold),
            correction: CorrectionState::new(config.reconciliation_cooldown, config.extrapolation_limit),
            extrapolation: ExtrapolationController::new(
                config.extrapolation_limit,
                config.extrapolation_multiplier,
                config.fixed_delta(),
            ),
            shooter: Shooter::new(entity_id, &config.combat),
            last_snapshot: None,
            last_outcome: ReconcileOutcome::Skipped,
            snaps: 0,
            health: 100.0,
            is_dead: false,
        }
    }

    fn apply_world_state(&mut self, entities: Vec<EntityView>) {
        self.remote.clear();
        for view in entities {
            if let Some(session) = self.session.as_mut() {
                if view.id == session.entity_id {
                    session.health = view.health;
                    session.is_dead = view.is_dead;
                    // While the server owns our transform, its pose is the one to show.
                    if session.correction.authority() == AuthorityMode::ServerOwned {
                        session.prediction.adopt_pose(view.position, view.rotation);
                    }
                    continue;
                }
            }
            self.remote.insert(view.id, view);
        }
    }

    /// Advances by one rendering frame. Returns the number of ticks simulated.
    ///
    /// `host` is the local server's history when this process also runs the
    /// authoritative simulation.
    pub fn frame(
        &mut self,
        dt: f32,
        input: &FrameInput,
        now_ms: u64,
        host: Option<&dyn SnapshotHistory>,
    ) -> u32 {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };

        if session.correction.advance(dt) == Some(Transition::LeftExtrapolation) {
            debug!("Extrapolation window expired, predicting again");
        }
        session.extrapolation.sync(&session.correction);

        session.clock.advance(dt);
        let mut ticks = 0;
        while session.clock.consume_tick() {
            let tick = session.clock.current_tick();
            session.prediction.tick(
                tick,
                input.command(),
                &session.correction,
                &self.gate,
                now_ms,
                &self.outbox,
            );

            let outcome = session.reconciliation.reconcile(
                &mut session.prediction,
                &mut session.correction,
                tick,
                host,
            );
            if matches!(outcome, ReconcileOutcome::Snapped { .. }) {
                session.snaps += 1;
            }
            if outcome != ReconcileOutcome::Skipped {
                session.last_outcome = outcome;
            }
            ticks += 1;
        }

        let aim = Aim::from_pose(
            session.prediction.live().position,
            Quat::from_rotation_y(input.look_yaw),
            self.config.movement.player_height * 0.25,
        );
        let tick = session.clock.current_tick();
        if input.fire_released {
            session.shooter.release();
        }
        if input.fire_pressed {
            session
                .shooter
                .press(aim, tick, now_ms, &self.gate, &self.outbox);
        } else {
            session
                .shooter
                .update(dt, aim, tick, now_ms, &self.gate, &self.outbox);
        }

        ticks
    }

    pub fn round_active(&self) -> bool {
        self.gate.combat_enabled()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn entity_id(&self) -> Option<EntityId> {
        self.session.as_ref().map(|session| session.entity_id)
    }

    /// Other players as of the newest world state.
    pub fn remote_entities(&self) -> impl Iterator<Item = &EntityView> {
        self.remote.values()
    }

    pub fn world_tick(&self) -> Option<Tick> {
        self.world_tick
    }

    pub fn effects(&self) -> impl Iterator<Item = &HitEffect> {
        self.effects.iter()
    }

    pub fn damage_log(&self) -> impl Iterator<Item = &DamageApplied> {
        self.damage_log.iter()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &NetcodeConfig {
        &self.config
    }
}
