use serde::{Deserialize, Serialize};

use crate::entity::EntityHandle;

/// Combat outcomes of one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatEvent {
    HostileDefeated {
        entity: EntityHandle,
        reward_kill_count: u32,
    },
}

/// Gameplay outcomes of one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameplayEvent {
    PickupResolved {
        player_id: u32,
        tile_x: i32,
        tile_y: i32,
        material_id: u16,
        amount: u32,
    },
}

/// Counters and live population of the runtime.
///
/// Totals only ever grow. Live counts reflect the state after the last
/// deferred destruction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuntimeDiagnostics {
    pub total_projectile_spawned: u64,
    pub total_projectile_recycled: u64,
    pub total_hostile_spawned: u64,
    pub total_damage_instances: u64,
    pub total_hostile_defeated: u64,
    pub total_drop_spawned: u64,
    pub total_drop_picked_up: u64,
    pub live_entities: usize,
    pub live_projectiles: usize,
    pub live_hostiles: usize,
    pub live_drops: usize,
}
