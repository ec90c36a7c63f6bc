//! Fixed-step scheduler for the authoritative role.
//!
//! Network tasks hand received inputs and shots to `ServerGame`, which only
//! queues them. Everything is applied at the next tick boundary, in this order:
//! round state (broadcast when the gate flips), movement (queued inputs),
//! shots, projectiles, then the world-state broadcast. Per-frame work (cooldowns and extrapolated motion) runs once
//! after the ticks of the frame.

use crate::authority::AuthorityServer;
use crate::hit_validation::LagCompensatedHitValidator;
use crate::projectile::ProjectileSystem;
use log::{debug, info, warn};
use shared::{
    CombatGate, EntityId, EntityRegistry, InputSample, NetcodeConfig, Outbox, Packet, PhysicalState,
    ShotRecord, TeamId, Tick, TickClock, Vec3, WeaponKind, World,
};
use std::collections::VecDeque;
use std::sync::Arc;

pub struct ServerGame {
    config: NetcodeConfig,
    world: Arc<World>,
    gate: Arc<dyn CombatGate>,
    clock: TickClock,
    registry: EntityRegistry,
    authority: AuthorityServer,
    validator: LagCompensatedHitValidator,
    projectiles: ProjectileSystem,
    pending_shots: VecDeque<ShotRecord>,
    /// Gate state last broadcast to clients.
    announced_round: Option<bool>,
    outbox: Outbox,
}

impl ServerGame {
    pub fn new(config: NetcodeConfig, world: World, gate: Arc<dyn CombatGate>, outbox: Outbox) -> Self {
        let world = Arc::new(world);
        Self {
            clock: TickClock::new(config.tick_rate),
            registry: EntityRegistry::new(),
            authority: AuthorityServer::new(config.clone(), Arc::clone(&world), Arc::clone(&gate)),
            validator: LagCompensatedHitValidator::new(
                config.combat.clone(),
                config.tick_rate,
                config.buffer_capacity,
                Arc::clone(&gate),
            ),
            projectiles: ProjectileSystem::new(&config.combat),
            pending_shots: VecDeque::new(),
            announced_round: None,
            config,
            world,
            gate,
            outbox,
        }
    }

    /// Spawn position for a new player: teams start on opposite sides.
    pub fn spawn_point(&self, entity: EntityId, team: TeamId) -> Vec3 {
        let side = if team == 0 { -6.0 } else { 6.0 };
        let lane = (entity % 4) as f32 * 3.0 - 4.5;
        Vec3::new(
            side,
            self.world.floor_height + self.config.movement.player_height * 0.5,
            lane,
        )
    }

    pub fn spawn_player(&mut self, entity: EntityId, team: TeamId) -> Vec3 {
        let spawn = self.spawn_point(entity, team);
        self.registry.spawn(entity, team, PhysicalState::at(spawn));
        self.authority.track(entity);
        spawn
    }

    pub fn remove_player(&mut self, entity: EntityId) {
        self.authority.forget(entity);
        self.pending_shots.retain(|shot| shot.shooter_id != entity);
        self.registry.despawn(entity);
    }

    pub fn receive_input(&mut self, sample: InputSample) {
        self.authority.enqueue(sample);
    }

    pub fn receive_shot(&mut self, shot: ShotRecord) {
        if self.registry.get(shot.shooter_id).is_none() {
            warn!("Shot from unknown entity {} dropped", shot.shooter_id);
            return;
        }
        self.pending_shots.push_back(shot);
    }

    /// Advances by one rendering frame. Returns the number of ticks simulated.
    pub fn frame(&mut self, dt: f32, now_ms: u64) -> u32 {
        self.clock.advance(dt);
        let mut ticks = 0;
        while self.clock.consume_tick() {
            self.run_tick(now_ms);
            ticks += 1;
        }
        self.authority.advance_frame(dt, &mut self.registry);
        ticks
    }

    fn run_tick(&mut self, now_ms: u64) {
        let tick = self.clock.current_tick();

        let active = self.round_active();
        if self.announced_round != Some(active) {
            info!("Round {} at tick {}", if active { "active" } else { "inactive" }, tick);
            self.announced_round = Some(active);
            self.outbox.broadcast(Packet::RoundState { active });
        }

        self.authority
            .process_tick(now_ms, &mut self.registry, &self.outbox);

        while let Some(shot) = self.pending_shots.pop_front() {
            self.resolve_shot(&shot, now_ms);
        }

        self.projectiles
            .step(self.config.fixed_delta(), &mut self.registry, &self.outbox);

        self.outbox.broadcast(Packet::WorldState {
            tick,
            entities: self.registry.views(),
        });

        if tick % 60 == 0 && !self.registry.is_empty() {
            debug!(
                "Tick {}: {} entities, {} projectiles, {} queued inputs",
                tick,
                self.registry.len(),
                self.projectiles.active().len(),
                self.authority.pending()
            );
        }
    }

    fn resolve_shot(&mut self, shot: &ShotRecord, now_ms: u64) {
        let Some(weapon) = self.config.combat.weapons.get(shot.weapon_index) else {
            warn!(
                "Shot from {} with unknown weapon {}",
                shot.shooter_id, shot.weapon_index
            );
            return;
        };

        match weapon.kind {
            WeaponKind::Hitscan => {
                self.validator.validate(
                    shot,
                    now_ms,
                    &mut self.registry,
                    &self.world,
                    &self.authority,
                    &self.outbox,
                );
            }
            WeaponKind::Projectile { speed } => {
                if !self.gate.combat_enabled() {
                    return;
                }
                if let Some(team) = self.registry.team_of(shot.shooter_id) {
                    self.projectiles.spawn(shot, team, speed, weapon.damage);
                }
            }
        }
    }

    /// Whether the combat gate is open right now.
    pub fn round_active(&self) -> bool {
        self.gate.combat_enabled()
    }

    pub fn tick(&self) -> Tick {
        self.clock.current_tick()
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    pub fn authority(&self) -> &AuthorityServer {
        &self.authority
    }

    pub fn projectiles(&self) -> &ProjectileSystem {
        &self.projectiles
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &NetcodeConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::bus::drain;
    use shared::{AlwaysOpen, MoveInput, Role, RoundGate};

    const DT: f32 = 1.0 / 60.0;

    fn game() -> (ServerGame, tokio::sync::mpsc::UnboundedReceiver<shared::Envelope>) {
        let (outbox, rx) = Outbox::channel(Role::Server);
        let game = ServerGame::new(NetcodeConfig::default(), World::default(), Arc::new(AlwaysOpen), outbox);
        (game, rx)
    }

    #[test]
    fn test_spawn_is_grounded_and_tracked() {
        let (mut game, _rx) = game();
        let spawn = game.spawn_player(1, 0);
        assert_eq!(spawn.y, 1.0);
        assert!(spawn.x < 0.0);
        assert!(game.spawn_player(2, 1).x > 0.0);
        assert_eq!(game.authority().tracked(), 2);

        game.remove_player(1);
        assert!(game.registry().get(1).is_none());
        assert_eq!(game.authority().tracked(), 1);
    }

    #[test]
    fn test_frame_runs_whole_ticks_and_broadcasts_world() {
        let (mut game, mut rx) = game();
        game.spawn_player(1, 0);

        assert_eq!(game.frame(DT * 0.5, 0), 0);
        assert_eq!(game.frame(DT * 2.6, 0), 3);
        assert_eq!(game.tick(), 3);

        let world_states = drain(&mut rx)
            .into_iter()
            .filter(|envelope| matches!(envelope.packet, Packet::WorldState { .. }))
            .count();
        assert_eq!(world_states, 3);
    }

    #[test]
    fn test_inputs_wait_for_tick_boundary() {
        let (mut game, _rx) = game();
        game.spawn_player(1, 0);
        game.receive_input(InputSample {
            tick: 1,
            entity_id: 1,
            movement: MoveInput::new(1.0, 0.0),
            ..Default::default()
        });
        let before = game.registry().get(1).unwrap().state.position;
        game.frame(DT * 0.5, 0);
        assert_eq!(game.registry().get(1).unwrap().state.position, before);
        game.frame(DT * 0.6, 0);
        assert!(game.registry().get(1).unwrap().state.position.z > before.z);
    }

    #[test]
    fn test_unknown_weapon_and_shooter_are_ignored() {
        let (mut game, mut rx) = game();
        game.spawn_player(1, 0);
        let shot = ShotRecord {
            tick: 1,
            shooter_id: 9,
            origin: Vec3::ZERO,
            direction: Vec3::Z,
            sent_at: 0,
            weapon_index: 0,
        };
        game.receive_shot(shot);
        game.receive_shot(ShotRecord {
            shooter_id: 1,
            weapon_index: 7,
            ..shot
        });
        game.frame(DT * 1.1, 0);
        assert!(drain(&mut rx).iter().all(|envelope| matches!(
            envelope.packet,
            Packet::WorldState { .. } | Packet::RoundState { .. }
        )));
    }

    #[test]
    fn test_projectile_weapon_spawns_projectile() {
        let (mut game, _rx) = game();
        game.spawn_player(1, 0);
        game.receive_shot(ShotRecord {
            tick: 1,
            shooter_id: 1,
            origin: Vec3::new(-6.0, 1.5, 0.0),
            direction: Vec3::new(0.0, 0.0, -1.0),
            sent_at: 0,
            weapon_index: 1,
        });
        game.frame(DT * 1.1, 0);
        assert_eq!(game.projectiles().active().len(), 1);
    }

    #[test]
    fn test_round_state_is_broadcast_when_gate_flips() {
        let gate = RoundGate::new(false);
        let (outbox, mut rx) = Outbox::channel(Role::Server);
        let mut game = ServerGame::new(NetcodeConfig::default(), World::default(), Arc::new(gate.clone()), outbox);
        let rounds = |rx: &mut tokio::sync::mpsc::UnboundedReceiver<shared::Envelope>| -> Vec<bool> {
            drain(rx)
                .into_iter()
                .filter_map(|envelope| match envelope.packet {
                    Packet::RoundState { active } => Some(active),
                    _ => None,
                })
                .collect()
        };

        game.frame(DT * 3.1, 0);
        assert_eq!(rounds(&mut rx), vec![false]);
        assert!(!game.round_active());

        gate.open();
        game.frame(DT * 2.0, 0);
        assert_eq!(rounds(&mut rx), vec![true]);

        game.frame(DT * 2.0, 0);
        assert!(rounds(&mut rx).is_empty());
    }
}
