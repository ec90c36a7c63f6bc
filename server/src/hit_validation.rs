//! Server-side, latency-aware resolution of hitscan shots.
//!
//! The shooter reports the tick and wall-clock time of the shot. The validator
//! converts the elapsed time into whole ticks, computes the history slot the
//! shot was fired in and fetches the shooter's rewound snapshot. By default
//! the ray itself is tested against the live world; with
//! `combat.rewind_targets` enabled, target colliders are placed at their
//! rewound positions instead.

use log::{debug, info, warn};
use shared::world::{layers, RayHit};
use shared::{
    CombatConfig, CombatGate, DamageApplied, EntityId, EntityRegistry, HitEffect, Outbox, Packet,
    ShotRecord, SnapshotHistory, StateSnapshot, Tick, Vec3, World,
};
use std::sync::Arc;

/// Whole ticks elapsed between `sent_at` and `now_ms`, rounded up.
pub fn latency_ticks(sent_at: u64, now_ms: u64, tick_rate: f32) -> u32 {
    let elapsed_ms = now_ms.saturating_sub(sent_at) as f64;
    (elapsed_ms * f64::from(tick_rate) / 1000.0).ceil() as u32
}

/// History slot for the tick a shot was fired in.
pub fn rewind_index(tick: Tick, latency_ticks: u32, capacity: usize) -> usize {
    let capacity = capacity.max(1) as i64;
    (i64::from(tick) - i64::from(latency_ticks) + capacity).rem_euclid(capacity) as usize
}

/// Applies damage through the target's stats and broadcasts the result.
///
/// A target that no longer exists is a no-op.
pub fn apply_damage(
    registry: &mut EntityRegistry,
    target: EntityId,
    shooter: EntityId,
    amount: f32,
    outbox: &Outbox,
) -> Option<DamageApplied> {
    let entity = match registry.require_mut(target) {
        Ok(entity) => entity,
        Err(err) => {
            warn!("Damage from {} ignored: {}", shooter, err);
            return None;
        }
    };

    let outcome = entity.stats.apply_damage(amount);
    if outcome.died {
        info!("Entity {} was killed by {}", target, shooter);
    }

    let applied = DamageApplied {
        target_id: target,
        shooter_id: shooter,
        amount: outcome.applied,
        new_health: outcome.new_health,
        is_dead: entity.stats.is_dead,
    };
    outbox.broadcast(Packet::DamageApplied(applied));
    Some(applied)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    /// Entity struck, `None` for static geometry.
    pub target: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShotVerdict {
    pub latency_ticks: u32,
    pub rewind_index: usize,
    /// Shooter's snapshot in the rewound slot. Not checked for staleness.
    pub rewind_snapshot: Option<StateSnapshot>,
    pub hit: Option<ShotHit>,
    pub damage: Option<DamageApplied>,
}

pub struct LagCompensatedHitValidator {
    combat: CombatConfig,
    tick_rate: f32,
    capacity: usize,
    gate: Arc<dyn CombatGate>,
}

impl LagCompensatedHitValidator {
    pub fn new(combat: CombatConfig, tick_rate: f32, capacity: usize, gate: Arc<dyn CombatGate>) -> Self {
        Self {
            combat,
            tick_rate,
            capacity,
            gate,
        }
    }

    /// Resolves one shot. Returns `None` when combat is disabled.
    pub fn validate(
        &self,
        shot: &ShotRecord,
        now_ms: u64,
        registry: &mut EntityRegistry,
        world: &World,
        history: &dyn SnapshotHistory,
        outbox: &Outbox,
    ) -> Option<ShotVerdict> {
        if !self.gate.combat_enabled() {
            debug!("Shot from {} ignored outside an active round", shot.shooter_id);
            return None;
        }

        let latency_ticks = latency_ticks(shot.sent_at, now_ms, self.tick_rate);
        let rewind_index = rewind_index(shot.tick, latency_ticks, self.capacity);
        let rewind_snapshot = history
            .history(shot.shooter_id)
            .map(|buffer| *buffer.get_slot(rewind_index));

        let hit = self.cast(shot, registry, world, history, rewind_index);

        let damage = hit.and_then(|hit| {
            let target = hit.target?;
            let weapon = self.combat.weapons.get(shot.weapon_index)?;
            match registry.are_enemies(shot.shooter_id, target) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(err) => {
                    warn!("Shot from {} not scored: {}", shot.shooter_id, err);
                    return None;
                }
            }
            apply_damage(registry, target, shot.shooter_id, weapon.damage, outbox)
        });

        if let Some(hit) = hit {
            outbox.broadcast(Packet::HitEffect(HitEffect {
                point: hit.point,
                normal: hit.normal,
                shooter_id: shot.shooter_id,
            }));
        }

        debug!(
            "Shot from {} at tick {}: {} latency ticks, rewind slot {}, hit {:?}, damage {:?}",
            shot.shooter_id,
            shot.tick,
            latency_ticks,
            rewind_index,
            hit.and_then(|hit| hit.target),
            damage.map(|damage| damage.amount)
        );

        Some(ShotVerdict {
            latency_ticks,
            rewind_index,
            rewind_snapshot,
            hit,
            damage,
        })
    }

    fn cast(
        &self,
        shot: &ShotRecord,
        registry: &EntityRegistry,
        world: &World,
        history: &dyn SnapshotHistory,
        rewind_index: usize,
    ) -> Option<ShotHit> {
        let direction = shot.direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }
        let range = self.combat.shot_range;
        let mask = self.combat.hit_mask;

        let mut best: Option<ShotHit> = None;
        let mut consider = |hit: RayHit, target: Option<EntityId>| {
            if best.map_or(true, |current| hit.distance < current.distance) {
                best = Some(ShotHit {
                    point: hit.point,
                    normal: hit.normal,
                    distance: hit.distance,
                    target,
                });
            }
        };

        if mask & layers::WORLD != 0 {
            if let Some(hit) = world.raycast(shot.origin, direction, range) {
                consider(hit, None);
            }
        }

        for entity in registry.iter() {
            if entity.id == shot.shooter_id || entity.layer & mask == 0 {
                continue;
            }
            let center = if self.combat.rewind_targets {
                self.rewound_position(history, entity.id, rewind_index)
                    .unwrap_or(entity.state.position)
            } else {
                entity.state.position
            };
            if let Some(hit) = entity.collider.ray_intersect(center, shot.origin, direction, range) {
                consider(hit, Some(entity.id));
            }
        }

        best
    }

    fn rewound_position(&self, history: &dyn SnapshotHistory, entity: EntityId, index: usize) -> Option<Vec3> {
        let snapshot = history.history(entity)?.get_slot(index);
        (snapshot.entity_id == entity && snapshot.tick != 0).then_some(snapshot.position)
    }
}
