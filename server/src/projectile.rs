//! Server-simulated projectile weapons.

use crate::hit_validation::apply_damage;
use log::debug;
use shared::{
    CombatConfig, DamageApplied, EntityId, EntityRegistry, HitEffect, Outbox, Packet, ShotRecord,
    TeamId, Vec3,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: u32,
    pub shooter_id: EntityId,
    pub team: TeamId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub damage: f32,
    pub age: f32,
}

pub struct ProjectileSystem {
    lifetime: f32,
    radius: f32,
    hit_mask: u32,
    next_id: u32,
    projectiles: Vec<Projectile>,
}

impl ProjectileSystem {
    pub fn new(combat: &CombatConfig) -> Self {
        Self {
            lifetime: combat.projectile_lifetime,
            radius: combat.projectile_radius,
            hit_mask: combat.hit_mask,
            next_id: 1,
            projectiles: Vec::new(),
        }
    }

    /// Launches a projectile from the shot origin. The shooter's team is
    /// captured now so later team changes do not affect it.
    pub fn spawn(&mut self, shot: &ShotRecord, team: TeamId, speed: f32, damage: f32) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.projectiles.push(Projectile {
            id,
            shooter_id: shot.shooter_id,
            team,
            position: shot.origin,
            velocity: shot.direction.normalize_or_zero() * speed,
            damage,
            age: 0.0,
        });
        debug!("Projectile {} launched by {}", id, shot.shooter_id);
        id
    }

    /// Moves every projectile, resolves enemy contacts and expires old ones.
    pub fn step(&mut self, dt: f32, registry: &mut EntityRegistry, outbox: &Outbox) -> Vec<DamageApplied> {
        let mut applied = Vec::new();
        let mut remaining = Vec::with_capacity(self.projectiles.len());

        for mut projectile in self.projectiles.drain(..) {
            projectile.position += projectile.velocity * dt;
            projectile.age += dt;

            let contact = registry
                .iter()
                .find(|entity| {
                    entity.id != projectile.shooter_id
                        && entity.layer & self.hit_mask != 0
                        && entity.stats.opposes(projectile.team)
                        && entity
                            .collider
                            .overlaps_sphere(entity.state.position, projectile.position, self.radius)
                })
                .map(|entity| entity.id);

            if let Some(target) = contact {
                outbox.broadcast(Packet::HitEffect(HitEffect {
                    point: projectile.position,
                    normal: -projectile.velocity.normalize_or_zero(),
                    shooter_id: projectile.shooter_id,
                }));
                if let Some(damage) =
                    apply_damage(registry, target, projectile.shooter_id, projectile.damage, outbox)
                {
                    applied.push(damage);
                }
                debug!("Projectile {} struck entity {}", projectile.id, target);
                continue;
            }

            if projectile.age < self.lifetime {
                remaining.push(projectile);
            }
        }

        self.projectiles = remaining;
        applied
    }

    pub fn active(&self) -> &[Projectile] {
        &self.projectiles
    }
}
