use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tileworld_common::TickContext;
use tileworld_protocol::{FireProjectilePayload, PickupProbePayload, SpawnDropPayload};

use crate::components::{
    Collider, ComponentStore, Faction, Health, HostileTarget, Lifetime, Projectile, Transform,
    Velocity, WorldDrop,
};
use crate::entity::{EntityAllocator, EntityHandle};
use crate::events::{CombatEvent, GameplayEvent, RuntimeDiagnostics};

/// Tunables for the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Collider radius given to every spawned projectile, in tiles.
    pub projectile_collider_radius: f32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            projectile_collider_radius: 0.25,
        }
    }
}

/// Request to place a hostile target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostileSpawn {
    pub position: Vec2,
    pub collider_radius: f32,
    pub health: i32,
    pub faction: u16,
    pub reward_kill_count: u32,
}

#[derive(Debug, Clone, Copy)]
struct DamageRequest {
    target: EntityHandle,
    amount: u16,
}

#[derive(Debug, Clone, Copy)]
struct PendingProbe {
    player_id: u32,
    tile_x: i32,
    tile_y: i32,
}

/// Owns the transient gameplay population and advances it one fixed tick at a
/// time.
///
/// Queue operations only record intents. Everything is applied inside
/// [`EcsRuntime::tick`] in a fixed system order, and every destruction of the
/// tick is deferred to a single pass after the last system.
#[derive(Debug, Default)]
pub struct EcsRuntime {
    config: RuntimeConfig,
    entities: EntityAllocator,
    store: ComponentStore,

    hostile_spawns: Vec<HostileSpawn>,
    projectile_spawns: Vec<(u32, FireProjectilePayload)>,
    drop_spawns: Vec<SpawnDropPayload>,
    pickup_probes: Vec<PendingProbe>,

    damage_requests: Vec<DamageRequest>,
    pending_destroy: BTreeSet<EntityHandle>,

    combat_events: Vec<CombatEvent>,
    gameplay_events: Vec<GameplayEvent>,
    diagnostics: RuntimeDiagnostics,
}

fn tile_center(tile_x: i32, tile_y: i32) -> Vec2 {
    Vec2::new(tile_x as f32 + 0.5, tile_y as f32 + 0.5)
}

impl EcsRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn queue_spawn_projectile(&mut self, owner_player_id: u32, payload: FireProjectilePayload) {
        self.projectile_spawns.push((owner_player_id, payload));
    }

    pub fn queue_spawn_world_drop(&mut self, payload: SpawnDropPayload) {
        self.drop_spawns.push(payload);
    }

    pub fn queue_pickup_probe(&mut self, player_id: u32, payload: PickupProbePayload) {
        self.pickup_probes.push(PendingProbe {
            player_id,
            tile_x: payload.tile_x,
            tile_y: payload.tile_y,
        });
    }

    pub fn queue_spawn_hostile(&mut self, spawn: HostileSpawn) {
        self.hostile_spawns.push(spawn);
    }

    /// Run every system once, in order, then apply deferred destruction.
    ///
    /// Events left unconsumed from the previous tick are discarded first.
    pub fn tick(&mut self, ctx: &TickContext) {
        let _span = tracing::info_span!("ecs_tick", tick = ctx.tick_index).entered();

        if !self.combat_events.is_empty() || !self.gameplay_events.is_empty() {
            tracing::trace!(
                combat = self.combat_events.len(),
                gameplay = self.gameplay_events.len(),
                "dropping unconsumed events"
            );
            self.combat_events.clear();
            self.gameplay_events.clear();
        }

        self.run_spawn_system();
        self.run_drop_spawn_system();
        self.run_movement_system(ctx.fixed_delta_seconds);
        self.run_collision_system();
        self.run_damage_system();
        self.run_pickup_probe_system();
        self.run_lifetime_system();
        let destroyed = self.apply_deferred_destruction();

        tracing::trace!(
            destroyed,
            live = self.entities.live_count(),
            "ecs tick complete"
        );
    }

    fn run_spawn_system(&mut self) {
        for spawn in std::mem::take(&mut self.hostile_spawns) {
            let entity = self.entities.allocate();
            let s = &mut self.store;
            s.transforms.insert(
                entity,
                Transform {
                    position: spawn.position,
                },
            );
            s.colliders.insert(
                entity,
                Collider {
                    radius: spawn.collider_radius,
                },
            );
            s.healths.insert(
                entity,
                Health {
                    current: spawn.health,
                },
            );
            s.factions.insert(entity, Faction(spawn.faction));
            s.hostiles.insert(
                entity,
                HostileTarget {
                    reward_kill_count: spawn.reward_kill_count,
                },
            );
            self.diagnostics.total_hostile_spawned += 1;
        }

        for (owner, p) in std::mem::take(&mut self.projectile_spawns) {
            let entity = self.entities.allocate();
            let s = &mut self.store;
            s.transforms.insert(
                entity,
                Transform {
                    position: tile_center(p.origin_tile_x, p.origin_tile_y),
                },
            );
            s.velocities.insert(
                entity,
                Velocity {
                    linear: Vec2::new(
                        p.velocity_milli_x as f32 / 1000.0,
                        p.velocity_milli_y as f32 / 1000.0,
                    ),
                },
            );
            s.colliders.insert(
                entity,
                Collider {
                    radius: self.config.projectile_collider_radius,
                },
            );
            s.factions.insert(entity, Faction(p.faction));
            s.projectiles.insert(
                entity,
                Projectile {
                    owner_player_id: owner,
                    damage: p.damage,
                },
            );
            s.lifetimes.insert(
                entity,
                Lifetime {
                    ticks_remaining: p.lifetime_ticks,
                },
            );
            self.diagnostics.total_projectile_spawned += 1;
        }
    }

    fn run_drop_spawn_system(&mut self) {
        for p in std::mem::take(&mut self.drop_spawns) {
            let entity = self.entities.allocate();
            self.store.transforms.insert(
                entity,
                Transform {
                    position: tile_center(p.tile_x, p.tile_y),
                },
            );
            self.store.drops.insert(
                entity,
                WorldDrop {
                    tile_x: p.tile_x,
                    tile_y: p.tile_y,
                    material_id: p.material_id,
                    amount: p.amount,
                },
            );
            self.diagnostics.total_drop_spawned += 1;
        }
    }

    fn run_movement_system(&mut self, dt: f32) {
        let ComponentStore {
            transforms,
            velocities,
            ..
        } = &mut self.store;
        for (entity, velocity) in velocities.iter() {
            if let Some(t) = transforms.get_mut(entity) {
                t.position += velocity.linear * dt;
            }
        }
    }

    /// Single-hit projectiles. Projectiles and targets are both walked in
    /// ascending handle order, so when several hostiles overlap one
    /// projectile the lowest handle takes the hit.
    fn run_collision_system(&mut self) {
        let s = &self.store;
        let targets: Vec<(EntityHandle, Vec2, f32)> = s
            .hostiles
            .keys()
            .filter_map(|h| {
                let t = s.transforms.get(h)?;
                let radius = s.colliders.get(h).map_or(0.0, |c| c.radius);
                Some((*h, t.position, radius))
            })
            .collect();

        for (projectile, p) in &s.projectiles {
            if self.pending_destroy.contains(projectile) {
                continue;
            }
            let Some(t) = s.transforms.get(projectile) else {
                continue;
            };
            let radius = s.colliders.get(projectile).map_or(0.0, |c| c.radius);
            let hit = targets.iter().find(|(_, pos, target_radius)| {
                t.position.distance(*pos) <= radius + target_radius
            });
            if let Some((target, _, _)) = hit {
                tracing::debug!(?projectile, hostile = ?target, "projectile hit");
                self.damage_requests.push(DamageRequest {
                    target: *target,
                    amount: p.damage,
                });
                self.pending_destroy.insert(*projectile);
            }
        }
    }

    fn run_damage_system(&mut self) {
        for req in std::mem::take(&mut self.damage_requests) {
            // Already defeated by an earlier request this tick.
            if self.pending_destroy.contains(&req.target) {
                continue;
            }
            let Some(health) = self.store.healths.get_mut(&req.target) else {
                continue;
            };
            health.current = health.current.saturating_sub(i32::from(req.amount));
            self.diagnostics.total_damage_instances += 1;

            if health.current <= 0 {
                let reward_kill_count = self
                    .store
                    .hostiles
                    .get(&req.target)
                    .map_or(0, |h| h.reward_kill_count);
                self.pending_destroy.insert(req.target);
                self.combat_events.push(CombatEvent::HostileDefeated {
                    entity: req.target,
                    reward_kill_count,
                });
                self.diagnostics.total_hostile_defeated += 1;
                tracing::debug!(hostile = ?req.target, "hostile defeated");
            }
        }
    }

    fn run_pickup_probe_system(&mut self) {
        for probe in std::mem::take(&mut self.pickup_probes) {
            let found = self.store.drops.iter().find(|(h, d)| {
                !self.pending_destroy.contains(*h)
                    && (d.tile_x, d.tile_y) == (probe.tile_x, probe.tile_y)
            });
            let Some((entity, drop)) = found.map(|(h, d)| (*h, *d)) else {
                tracing::trace!(
                    tile_x = probe.tile_x,
                    tile_y = probe.tile_y,
                    "pickup probe found nothing"
                );
                continue;
            };
            self.pending_destroy.insert(entity);
            self.gameplay_events.push(GameplayEvent::PickupResolved {
                player_id: probe.player_id,
                tile_x: probe.tile_x,
                tile_y: probe.tile_y,
                material_id: drop.material_id,
                amount: drop.amount,
            });
            self.diagnostics.total_drop_picked_up += 1;
        }
    }

    fn run_lifetime_system(&mut self) {
        let ComponentStore {
            lifetimes,
            projectiles,
            ..
        } = &mut self.store;
        for (entity, lifetime) in lifetimes.iter_mut() {
            if self.pending_destroy.contains(entity) {
                continue;
            }
            lifetime.ticks_remaining = lifetime.ticks_remaining.saturating_sub(1);
            if lifetime.ticks_remaining == 0 {
                self.pending_destroy.insert(*entity);
                if projectiles.contains_key(entity) {
                    self.diagnostics.total_projectile_recycled += 1;
                }
            }
        }
    }

    fn apply_deferred_destruction(&mut self) -> usize {
        let doomed = std::mem::take(&mut self.pending_destroy);
        let count = doomed.len();
        for entity in doomed {
            self.store.remove_entity(entity);
            self.entities.free(entity);
        }
        count
    }

    /// Drain this tick's combat events. A second call returns nothing.
    pub fn consume_combat_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.combat_events)
    }

    /// Drain this tick's gameplay events. A second call returns nothing.
    pub fn consume_gameplay_events(&mut self) -> Vec<GameplayEvent> {
        std::mem::take(&mut self.gameplay_events)
    }

    pub fn diagnostics(&self) -> RuntimeDiagnostics {
        RuntimeDiagnostics {
            live_entities: self.entities.live_count(),
            live_projectiles: self.store.projectile_count(),
            live_hostiles: self.store.hostile_count(),
            live_drops: self.store.drop_count(),
            ..self.diagnostics
        }
    }

    pub fn is_alive(&self, entity: EntityHandle) -> bool {
        self.entities.is_alive(entity)
    }

    pub fn live_entity_count(&self) -> usize {
        self.entities.live_count()
    }

    pub fn transform(&self, entity: EntityHandle) -> Option<&Transform> {
        self.store.transform(entity)
    }

    pub fn health(&self, entity: EntityHandle) -> Option<&Health> {
        self.store.health(entity)
    }

    /// Read-only view of component storage.
    pub fn components(&self) -> &ComponentStore {
        &self.store
    }

    pub fn hostiles(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.store.hostiles.keys().copied()
    }

    pub fn projectiles(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.store.projectiles.keys().copied()
    }

    pub fn drops(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.store.drops.keys().copied()
    }
}
