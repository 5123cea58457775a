use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tileworld_common::PlayerCommand;
use tileworld_ecs::{HostileSpawn, RuntimeConfig, RuntimeDiagnostics};
use tileworld_kernel::{
    EVENT_HOSTILE_DEFEATED, EVENT_PICKUP_RESOLVED, KernelStats, LocalKernel, SimulationKernel,
    TerrainConfig, TileWorld,
};
use tileworld_protocol::{
    FireProjectilePayload, PickupProbePayload, SpawnDropPayload, TypedPlayerCommand,
    decode_player_command,
};
use tileworld_stream::{ChunkStreamer, WindowConfig, WindowStats};
use tracing_subscriber::EnvFilter;

const PLAYER_ID: u32 = 1;

#[derive(Parser)]
#[command(name = "tileworld-cli", about = "CLI tool for tileworld operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Drive a local kernel with a walking player and a projectile volley
    Run {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "200")]
        ticks: u64,
        /// Fixed step in seconds
        #[arg(short, long, default_value = "0.05")]
        delta: f32,
        /// Tiles the player walks east over the whole run
        #[arg(long, default_value = "96")]
        walk_east: i32,
        /// Streaming window radius in chunks
        #[arg(long, default_value = "2")]
        radius: i32,
        /// Terrain seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode a command payload given as hex
    Decode {
        /// Command tag, e.g. world.set_tile
        command_type: String,
        /// Payload bytes as hex, e.g. 0a0b01
        #[arg(default_value = "")]
        hex_payload: String,
    },
}

#[derive(Serialize)]
struct RunReport {
    ticks: u64,
    final_tile_x: i32,
    world_state_hash: u64,
    loaded_chunks: usize,
    kernel: KernelStats,
    ecs: RuntimeDiagnostics,
    window: WindowStats,
    hostiles_defeated_events: usize,
    pickups_resolved_events: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("tileworld-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", tileworld_common::crate_info());
            println!("protocol: {}", tileworld_protocol::crate_info());
            println!("ecs: {}", tileworld_ecs::crate_info());
            println!("persist: {}", tileworld_persist::crate_info());
            println!("kernel: {}", tileworld_kernel::crate_info());
            println!("stream: {}", tileworld_stream::crate_info());
        }
        Commands::Run {
            ticks,
            delta,
            walk_east,
            radius,
            seed,
            json,
        } => {
            if delta.is_nan() || delta <= 0.0 {
                bail!("--delta must be positive, got {delta}");
            }
            if radius < 0 {
                bail!("--radius must not be negative, got {radius}");
            }
            let report = run(ticks, delta, walk_east, radius, seed)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Decode {
            command_type,
            hex_payload,
        } => {
            let payload = parse_hex(&hex_payload)?;
            let raw = PlayerCommand::new(PLAYER_ID, command_type, payload);
            match decode_player_command(&raw) {
                Ok(decoded) => println!("{:#?}", decoded.command),
                Err(err) => println!("rejected: {err}"),
            }
        }
    }

    Ok(())
}

fn run(ticks: u64, delta: f32, walk_east: i32, radius: i32, seed: u64) -> anyhow::Result<RunReport> {
    let world = TileWorld::with_terrain(TerrainConfig {
        seed,
        ..TerrainConfig::default()
    });
    let mut kernel: LocalKernel = SimulationKernel::with_runtime(
        world,
        Default::default(),
        Default::default(),
        tileworld_ecs::EcsRuntime::with_config(RuntimeConfig::default()),
    );
    kernel.initialize().context("starting kernel")?;

    // A row of hostiles ahead of the player, on the surface row.
    for i in 0..8 {
        kernel.ecs_mut().queue_spawn_hostile(HostileSpawn {
            position: glam::Vec2::new(12.5 + i as f32 * 6.0, 4.5),
            collider_radius: 0.5,
            health: 4,
            faction: 2,
            reward_kill_count: 1,
        });
    }

    let mut streamer = ChunkStreamer::new(PLAYER_ID, WindowConfig { radius });
    let mut tile_x = 0;
    for tick in 0..ticks {
        tile_x = (i64::from(walk_east) * tick as i64 / ticks as i64) as i32;
        streamer.follow(&mut kernel, tile_x, 4);

        if tick % 10 == 0 {
            submit(
                &mut kernel,
                TypedPlayerCommand::CombatFireProjectile(FireProjectilePayload {
                    origin_tile_x: tile_x,
                    origin_tile_y: 4,
                    velocity_milli_x: 12_000,
                    velocity_milli_y: 0,
                    damage: 2,
                    lifetime_ticks: 60,
                    faction: 1,
                }),
            );
        }
        if tick % 25 == 0 {
            submit(
                &mut kernel,
                TypedPlayerCommand::GameplaySpawnDrop(SpawnDropPayload {
                    tile_x: tile_x + 2,
                    tile_y: 4,
                    material_id: 1,
                    amount: 1,
                }),
            );
        }
        if tick % 25 == 5 {
            submit(
                &mut kernel,
                TypedPlayerCommand::GameplayPickupProbe(PickupProbePayload {
                    tile_x: tile_x + 2,
                    tile_y: 4,
                }),
            );
        }

        tracing::trace!(tick = kernel.tick_index(), tile_x, "step");
        kernel.update(delta);
    }

    let report = RunReport {
        ticks: kernel.tick_index(),
        final_tile_x: tile_x,
        world_state_hash: kernel.world().state_hash(),
        loaded_chunks: kernel.world().loaded_count(),
        kernel: kernel.stats(),
        ecs: kernel.ecs().diagnostics(),
        window: streamer.stats(),
        hostiles_defeated_events: kernel.script().events_named(EVENT_HOSTILE_DEFEATED).count(),
        pickups_resolved_events: kernel.script().events_named(EVENT_PICKUP_RESOLVED).count(),
    };
    kernel.shutdown();
    Ok(report)
}

fn submit(kernel: &mut LocalKernel, command: TypedPlayerCommand) {
    kernel.submit_local_command(command.to_player_command(PLAYER_ID));
}

fn print_report(r: &RunReport) {
    println!("Ran {} ticks, player at tile x={}", r.ticks, r.final_tile_x);
    println!(
        "World: {} chunks loaded, hash={:#x}",
        r.loaded_chunks, r.world_state_hash
    );
    println!(
        "Kernel: dispatched={}, rejected={}, script events={}, chunks published={}",
        r.kernel.commands_dispatched,
        r.kernel.commands_rejected,
        r.kernel.script_events,
        r.kernel.chunks_published
    );
    println!(
        "ECS: projectiles spawned={}, recycled={}, hostiles defeated={}/{}, drops picked up={}/{}",
        r.ecs.total_projectile_spawned,
        r.ecs.total_projectile_recycled,
        r.ecs.total_hostile_defeated,
        r.ecs.total_hostile_spawned,
        r.ecs.total_drop_picked_up,
        r.ecs.total_drop_spawned
    );
    println!(
        "Window: loads={}, unloads={}, centre changes={}",
        r.window.total_loads, r.window.total_unloads, r.window.center_changes
    );
    println!(
        "Script: hostile_defeated={}, pickup_resolved={}",
        r.hostiles_defeated_events, r.pickups_resolved_events
    );
}

fn parse_hex(s: &str) -> anyhow::Result<Vec<u8>> {
    let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if !s.is_ascii() {
        bail!("hex payload contains non-ASCII characters");
    }
    if s.len() % 2 != 0 {
        bail!("hex payload has odd length {}", s.len());
    }
    s.as_bytes()
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| -> anyhow::Result<u8> {
            if !pair.iter().all(u8::is_ascii_hexdigit) {
                bail!("invalid hex byte at offset {}", i * 2);
            }
            let digits = std::str::from_utf8(pair)?;
            u8::from_str_radix(digits, 16)
                .with_context(|| format!("invalid hex byte at offset {}", i * 2))
        })
        .collect()
}
