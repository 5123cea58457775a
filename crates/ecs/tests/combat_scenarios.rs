use glam::Vec2;
use tileworld_common::TickContext;
use tileworld_ecs::{CombatEvent, EcsRuntime, HostileSpawn};
use tileworld_protocol::{FireProjectilePayload, PickupProbePayload, SpawnDropPayload};

fn ctx(tick_index: u64) -> TickContext {
    TickContext {
        tick_index,
        fixed_delta_seconds: 0.05,
    }
}

fn volley(origin_x: i32, damage: u16) -> FireProjectilePayload {
    FireProjectilePayload {
        origin_tile_x: origin_x,
        origin_tile_y: 0,
        velocity_milli_x: 10_000,
        velocity_milli_y: 0,
        damage,
        lifetime_ticks: 40,
        faction: 1,
    }
}

#[test]
fn wave_of_hostiles_is_cleared_and_rewards_reported() {
    let mut rt = EcsRuntime::new();
    for i in 0..4 {
        rt.queue_spawn_hostile(HostileSpawn {
            position: Vec2::new(10.5 + i as f32 * 3.0, 0.5),
            collider_radius: 0.5,
            health: 3,
            faction: 2,
            reward_kill_count: i + 1,
        });
    }

    let mut rewards = Vec::new();
    for tick in 0..200 {
        if tick % 5 == 0 {
            rt.queue_spawn_projectile(1, volley(0, 3));
        }
        rt.tick(&ctx(tick));
        for event in rt.consume_combat_events() {
            let CombatEvent::HostileDefeated {
                reward_kill_count, ..
            } = event;
            rewards.push(reward_kill_count);
        }
        if rt.diagnostics().live_hostiles == 0 {
            break;
        }
    }

    // Closest hostile first.
    assert_eq!(rewards, vec![1, 2, 3, 4]);
    let d = rt.diagnostics();
    assert_eq!(d.total_hostile_spawned, 4);
    assert_eq!(d.total_hostile_defeated, 4);
    assert_eq!(d.total_damage_instances, 4);
}

#[test]
fn missed_projectiles_are_all_recycled() {
    let mut rt = EcsRuntime::new();
    for _ in 0..8 {
        rt.queue_spawn_projectile(1, volley(0, 1));
    }
    for tick in 0..40 {
        rt.tick(&ctx(tick));
    }
    let d = rt.diagnostics();
    assert_eq!(d.total_projectile_spawned, 8);
    assert_eq!(d.total_projectile_recycled, 8);
    assert_eq!(d.live_entities, 0);
}

#[test]
fn drops_survive_until_probed() {
    let mut rt = EcsRuntime::new();
    for x in 0..3 {
        rt.queue_spawn_world_drop(SpawnDropPayload {
            tile_x: x,
            tile_y: 4,
            material_id: 5,
            amount: 2,
        });
    }
    for tick in 0..10 {
        rt.tick(&ctx(tick));
    }
    assert_eq!(rt.diagnostics().live_drops, 3);

    rt.queue_pickup_probe(1, PickupProbePayload { tile_x: 1, tile_y: 4 });
    rt.tick(&ctx(10));
    assert_eq!(rt.consume_gameplay_events().len(), 1);
    assert_eq!(rt.diagnostics().live_drops, 2);
    assert_eq!(rt.diagnostics().live_entities, 2);
}

#[test]
fn stale_handles_stay_dead_after_reuse() {
    let mut rt = EcsRuntime::new();
    rt.queue_spawn_world_drop(SpawnDropPayload {
        tile_x: 0,
        tile_y: 0,
        material_id: 1,
        amount: 1,
    });
    rt.tick(&ctx(0));
    let first = rt.drops().next().unwrap();

    rt.queue_pickup_probe(1, PickupProbePayload { tile_x: 0, tile_y: 0 });
    rt.tick(&ctx(1));
    assert!(!rt.is_alive(first));

    rt.queue_spawn_world_drop(SpawnDropPayload {
        tile_x: 0,
        tile_y: 0,
        material_id: 1,
        amount: 1,
    });
    rt.tick(&ctx(2));
    let second = rt.drops().next().unwrap();
    assert_eq!(second.index(), first.index());
    assert!(rt.is_alive(second));
    assert!(!rt.is_alive(first));
    assert!(rt.components().world_drop(first).is_none());
}
