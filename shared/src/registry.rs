//! Entity registry: stable ids mapped to their component bundle.

use crate::error::{NetcodeError, NetcodeResult};
use crate::movement::PhysicalState;
use crate::protocol::{EntityId, EntityView};
use crate::stats::{PlayerStats, TeamId};
use crate::world::{layers, Capsule, LayerMask};
use log::{info, warn};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct EntityComponents {
    pub id: EntityId,
    pub state: PhysicalState,
    pub stats: PlayerStats,
    pub collider: Capsule,
    pub layer: LayerMask,
}

impl EntityComponents {
    pub fn view(&self) -> EntityView {
        EntityView {
            id: self.id,
            position: self.state.position,
            rotation: self.state.rotation,
            team: self.stats.team,
            health: self.stats.health,
            is_dead: self.stats.is_dead,
        }
    }
}

/// Ordered by id so iteration (and therefore hit resolution) is deterministic.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: BTreeMap<EntityId, EntityComponents>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fresh component bundle. Spawning an existing id replaces it.
    pub fn spawn(&mut self, id: EntityId, team: TeamId, state: PhysicalState) -> &mut EntityComponents {
        info!(
            "Spawned entity {} (team {}) at ({:.2}, {:.2}, {:.2})",
            id, team, state.position.x, state.position.y, state.position.z
        );
        let components = EntityComponents {
            id,
            state,
            stats: PlayerStats::new(team),
            collider: Capsule::default(),
            layer: layers::PLAYER,
        };
        match self.entities.entry(id) {
            Entry::Occupied(mut entry) => {
                warn!("Entity {} respawned over its previous state", id);
                entry.insert(components);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(components),
        }
    }

    pub fn despawn(&mut self, id: EntityId) -> Option<EntityComponents> {
        let removed = self.entities.remove(&id);
        if removed.is_some() {
            info!("Despawned entity {}", id);
        }
        removed
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityComponents> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityComponents> {
        self.entities.get_mut(&id)
    }

    pub fn require(&self, id: EntityId) -> NetcodeResult<&EntityComponents> {
        self.entities.get(&id).ok_or(NetcodeError::UnknownEntity(id))
    }

    pub fn require_mut(&mut self, id: EntityId) -> NetcodeResult<&mut EntityComponents> {
        self.entities.get_mut(&id).ok_or(NetcodeError::UnknownEntity(id))
    }

    /// Whether the two entities are on opposing teams.
    pub fn are_enemies(&self, a: EntityId, b: EntityId) -> NetcodeResult<bool> {
        Ok(self.require(a)?.stats.is_enemy_of(&self.require(b)?.stats))
    }

    pub fn team_of(&self, id: EntityId) -> Option<TeamId> {
        self.entities.get(&id).map(|entity| entity.stats.team)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityComponents> {
        self.entities.values()
    }

    pub fn views(&self) -> Vec<EntityView> {
        self.entities.values().map(EntityComponents::view).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    #[test]
    fn test_spawn_and_lookup() {
        let mut registry = EntityRegistry::new();
        registry.spawn(7, 1, PhysicalState::at(Vec3::new(1.0, 1.0, 1.0)));

        let entity = registry.get(7).unwrap();
        assert_eq!(entity.stats.team, 1);
        assert_eq!(entity.layer, layers::PLAYER);
        assert_eq!(registry.team_of(7), Some(1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_entity_lookup() {
        let mut registry = EntityRegistry::new();
        assert!(registry.get(3).is_none());
        assert!(registry.get_mut(3).is_none());
        assert!(registry.despawn(3).is_none());
        assert!(registry.team_of(3).is_none());
        assert!(matches!(registry.require(3), Err(NetcodeError::UnknownEntity(3))));
        assert!(matches!(registry.require_mut(3), Err(NetcodeError::UnknownEntity(3))));
    }

    #[test]
    fn test_respawn_replaces_components() {
        let mut registry = EntityRegistry::new();
        registry.spawn(4, 0, PhysicalState::default()).stats.apply_damage(50.0);

        let respawned = registry.spawn(4, 1, PhysicalState::at(Vec3::new(2.0, 1.0, 0.0)));
        assert_eq!(respawned.stats.team, 1);
        assert_eq!(respawned.stats.health, respawned.stats.max_health);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(4).unwrap().state.position.x, 2.0);
    }

    #[test]
    fn test_are_enemies() {
        let mut registry = EntityRegistry::new();
        registry.spawn(1, 0, PhysicalState::default());
        registry.spawn(2, 0, PhysicalState::default());
        registry.spawn(3, 1, PhysicalState::default());

        assert!(!registry.are_enemies(1, 2).unwrap());
        assert!(registry.are_enemies(1, 3).unwrap());
        assert!(matches!(registry.are_enemies(1, 9), Err(NetcodeError::UnknownEntity(9))));
    }

    #[test]
    fn test_views_are_sorted_by_id() {
        let mut registry = EntityRegistry::new();
        registry.spawn(9, 0, PhysicalState::default());
        registry.spawn(2, 1, PhysicalState::default());
        let ids: Vec<EntityId> = registry.views().iter().map(|view| view.id).collect();
        assert_eq!(ids, vec![2, 9]);
    }
}
