use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entity::EntityHandle;

/// Position in tile space. Tile (x, y) spans [x, x+1) × [y, y+1).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec2,
}

impl Transform {
    /// Integer tile the position falls in.
    pub fn tile(&self) -> (i32, i32) {
        (
            self.position.x.floor() as i32,
            self.position.y.floor() as i32,
        )
    }
}

/// Tiles per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifetime {
    pub ticks_remaining: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Faction(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    pub owner_player_id: u32,
    pub damage: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldDrop {
    /// Tile the drop was spawned on. Probes match this, not the float
    /// position, which cannot hold a tile centre beyond 2^23.
    pub tile_x: i32,
    pub tile_y: i32,
    pub material_id: u16,
    pub amount: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostileTarget {
    pub reward_kill_count: u32,
}

/// Deterministic component storage for all component types.
///
/// One BTreeMap per component type keyed by handle, so every system walks
/// entities in ascending handle order on all platforms.
#[derive(Debug, Clone, Default)]
pub struct ComponentStore {
    pub(crate) transforms: BTreeMap<EntityHandle, Transform>,
    pub(crate) velocities: BTreeMap<EntityHandle, Velocity>,
    pub(crate) colliders: BTreeMap<EntityHandle, Collider>,
    pub(crate) healths: BTreeMap<EntityHandle, Health>,
    pub(crate) lifetimes: BTreeMap<EntityHandle, Lifetime>,
    pub(crate) factions: BTreeMap<EntityHandle, Faction>,
    pub(crate) projectiles: BTreeMap<EntityHandle, Projectile>,
    pub(crate) drops: BTreeMap<EntityHandle, WorldDrop>,
    pub(crate) hostiles: BTreeMap<EntityHandle, HostileTarget>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self, entity: EntityHandle) -> Option<&Transform> {
        self.transforms.get(&entity)
    }

    pub fn velocity(&self, entity: EntityHandle) -> Option<&Velocity> {
        self.velocities.get(&entity)
    }

    pub fn collider(&self, entity: EntityHandle) -> Option<&Collider> {
        self.colliders.get(&entity)
    }

    pub fn health(&self, entity: EntityHandle) -> Option<&Health> {
        self.healths.get(&entity)
    }

    pub fn lifetime(&self, entity: EntityHandle) -> Option<&Lifetime> {
        self.lifetimes.get(&entity)
    }

    pub fn faction(&self, entity: EntityHandle) -> Option<&Faction> {
        self.factions.get(&entity)
    }

    pub fn projectile(&self, entity: EntityHandle) -> Option<&Projectile> {
        self.projectiles.get(&entity)
    }

    pub fn world_drop(&self, entity: EntityHandle) -> Option<&WorldDrop> {
        self.drops.get(&entity)
    }

    pub fn hostile(&self, entity: EntityHandle) -> Option<&HostileTarget> {
        self.hostiles.get(&entity)
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    pub fn hostile_count(&self) -> usize {
        self.hostiles.len()
    }

    pub fn drop_count(&self) -> usize {
        self.drops.len()
    }

    /// Remove all components for an entity.
    pub fn remove_entity(&mut self, entity: EntityHandle) {
        self.transforms.remove(&entity);
        self.velocities.remove(&entity);
        self.colliders.remove(&entity);
        self.healths.remove(&entity);
        self.lifetimes.remove(&entity);
        self.factions.remove(&entity);
        self.projectiles.remove(&entity);
        self.drops.remove(&entity);
        self.hostiles.remove(&entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityAllocator;

    #[test]
    fn transform_tile_floors_negative_positions() {
        let t = Transform {
            position: Vec2::new(-0.25, 3.99),
        };
        assert_eq!(t.tile(), (-1, 3));
    }

    #[test]
    fn remove_entity_clears_all() {
        let mut alloc = EntityAllocator::new();
        let id = alloc.allocate();
        let mut store = ComponentStore::new();
        store.transforms.insert(id, Transform::default());
        store.velocities.insert(id, Velocity::default());
        store.colliders.insert(id, Collider { radius: 0.5 });
        store.healths.insert(id, Health { current: 3 });
        store.lifetimes.insert(id, Lifetime { ticks_remaining: 2 });
        store.factions.insert(id, Faction(1));
        store.projectiles.insert(
            id,
            Projectile {
                owner_player_id: 1,
                damage: 1,
            },
        );

        store.remove_entity(id);
        assert!(store.transform(id).is_none());
        assert!(store.velocity(id).is_none());
        assert!(store.collider(id).is_none());
        assert!(store.health(id).is_none());
        assert!(store.lifetime(id).is_none());
        assert!(store.faction(id).is_none());
        assert!(store.projectile(id).is_none());
        assert_eq!(store.projectile_count(), 0);
    }

    #[test]
    fn deterministic_iteration_order() {
        let mut alloc = EntityAllocator::new();
        let mut store = ComponentStore::new();
        let ids: Vec<EntityHandle> = (0..50).map(|_| alloc.allocate()).collect();
        for id in ids.iter().rev() {
            store.hostiles.insert(
                *id,
                HostileTarget {
                    reward_kill_count: 1,
                },
            );
        }
        let stored: Vec<EntityHandle> = store.hostiles.keys().copied().collect();
        assert_eq!(stored, ids);
    }
}
