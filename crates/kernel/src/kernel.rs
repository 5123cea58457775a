use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;
use tileworld_common::{ChunkCoord, PlayerCommand, TickContext};
use tileworld_ecs::{CombatEvent, EcsRuntime, GameplayEvent};
use tileworld_persist::{SnapshotError, decode_full_chunk_snapshot, encode_chunk_snapshot};
use tileworld_protocol::{DecodedCommand, TypedPlayerCommand, WireWriter, decode_player_command};

use crate::service::{
    NetService, ScriptHost, ServiceError, WorldError, WorldService, WorldSnapshotSummary,
};

/// Script event raised when a hostile is defeated.
pub const EVENT_HOSTILE_DEFEATED: &str = "combat.hostile_defeated";
/// Script event raised when a pickup probe collects a drop.
pub const EVENT_PICKUP_RESOLVED: &str = "gameplay.pickup_resolved";

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("kernel is already initialized")]
    AlreadyInitialized,
    #[error("kernel is not initialized")]
    NotInitialized,
    #[error("{service} service failed to start: {source}")]
    Startup {
        service: &'static str,
        #[source]
        source: ServiceError,
    },
    #[error("chunk payload rejected: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("world rejected chunk: {0}")]
    World(#[from] WorldError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelState {
    Uninitialized,
    Initialized,
    Shutdown,
}

/// Running counters, never reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KernelStats {
    pub ticks: u64,
    pub commands_dispatched: u64,
    pub commands_rejected: u64,
    pub tile_mutations_rejected: u64,
    pub script_events: u64,
    pub chunks_published: u64,
}

/// Top-level orchestrator.
///
/// Owns World, Net and Script by value plus the entity runtime, and drives
/// them in a fixed order every [`SimulationKernel::update`]:
///
/// 1. Net tick
/// 2. inbound then local commands, decoded and dispatched
/// 3. World tick
/// 4. ECS tick, events forwarded to Script
/// 5. Script tick
/// 6. dirty chunks encoded and published to Net
/// 7. tick index advanced
pub struct SimulationKernel<W, N, S> {
    world: W,
    net: N,
    script: S,
    ecs: EcsRuntime,
    state: KernelState,
    tick_index: u64,
    local_queue: VecDeque<PlayerCommand>,
    stats: KernelStats,
}

impl<W, N, S> SimulationKernel<W, N, S>
where
    W: WorldService,
    N: NetService,
    S: ScriptHost,
{
    pub fn new(world: W, net: N, script: S) -> Self {
        Self::with_runtime(world, net, script, EcsRuntime::new())
    }

    pub fn with_runtime(world: W, net: N, script: S, ecs: EcsRuntime) -> Self {
        Self {
            world,
            net,
            script,
            ecs,
            state: KernelState::Uninitialized,
            tick_index: 0,
            local_queue: VecDeque::new(),
            stats: KernelStats::default(),
        }
    }

    /// Start World, Net, then Script. On failure, already-started services
    /// are shut down in reverse order before the error is returned.
    pub fn initialize(&mut self) -> Result<(), KernelError> {
        if self.state == KernelState::Initialized {
            return Err(KernelError::AlreadyInitialized);
        }

        self.world
            .initialize()
            .map_err(|source| self.startup_failed("world", source))?;

        if let Err(source) = self.net.initialize() {
            self.world.shutdown();
            return Err(self.startup_failed("net", source));
        }

        if let Err(source) = self.script.initialize() {
            self.net.shutdown();
            self.world.shutdown();
            return Err(self.startup_failed("script", source));
        }

        self.state = KernelState::Initialized;
        tracing::info!(tick = self.tick_index, "kernel initialized");
        Ok(())
    }

    fn startup_failed(&self, service: &'static str, source: ServiceError) -> KernelError {
        tracing::warn!(service, error = %source, "startup failed, rolled back");
        KernelError::Startup { service, source }
    }

    /// Stop Script, Net, then World. No-op unless initialized.
    pub fn shutdown(&mut self) {
        if self.state != KernelState::Initialized {
            return;
        }
        self.script.shutdown();
        self.net.shutdown();
        self.world.shutdown();
        self.state = KernelState::Shutdown;
        tracing::info!(tick = self.tick_index, "kernel shut down");
    }

    /// Queue a command for decoding at the next update.
    pub fn submit_local_command(&mut self, command: PlayerCommand) {
        self.local_queue.push_back(command);
    }

    /// Advance the simulation one fixed step. No-op unless initialized.
    pub fn update(&mut self, fixed_delta_seconds: f32) {
        if self.state != KernelState::Initialized {
            return;
        }
        let ctx = TickContext {
            tick_index: self.tick_index,
            fixed_delta_seconds,
        };
        let _span = tracing::info_span!("kernel_update", tick = ctx.tick_index).entered();

        self.net.tick(&ctx);
        self.dispatch_pending_commands();
        self.world.tick(&ctx);
        self.ecs.tick(&ctx);
        self.forward_runtime_events();
        self.script.tick(&ctx);
        self.publish_dirty_chunks();

        self.tick_index += 1;
        self.stats.ticks += 1;
    }

    fn dispatch_pending_commands(&mut self) {
        let inbound = self.net.drain_inbound_commands();
        let local: Vec<PlayerCommand> = self.local_queue.drain(..).collect();

        for raw in inbound {
            self.dispatch_raw(&raw);
        }
        for raw in local {
            if self.dispatch_raw(&raw) {
                self.net.submit_local_command(raw);
            }
        }
    }

    fn dispatch_raw(&mut self, raw: &PlayerCommand) -> bool {
        match decode_player_command(raw) {
            Ok(decoded) => {
                self.dispatch(raw, decoded);
                self.stats.commands_dispatched += 1;
                true
            }
            Err(err) => {
                tracing::debug!(
                    player = raw.player_id,
                    command = %raw.command_type,
                    error = %err,
                    "command rejected"
                );
                self.stats.commands_rejected += 1;
                false
            }
        }
    }

    fn dispatch(&mut self, raw: &PlayerCommand, decoded: DecodedCommand) {
        let player_id = decoded.player_id;
        match decoded.command {
            TypedPlayerCommand::WorldSetTile(p) => {
                if let Err(err) = self.world.apply_tile_mutation(p.into()) {
                    tracing::warn!(player = player_id, error = %err, "tile mutation rejected");
                    self.stats.tile_mutations_rejected += 1;
                }
            }
            TypedPlayerCommand::WorldLoadChunk(p) => self.world.load_chunk(p.coord()),
            TypedPlayerCommand::WorldUnloadChunk(p) => self.world.unload_chunk(p.coord()),
            TypedPlayerCommand::CombatFireProjectile(p) => {
                self.ecs.queue_spawn_projectile(player_id, p)
            }
            TypedPlayerCommand::GameplaySpawnDrop(p) => self.ecs.queue_spawn_world_drop(p),
            TypedPlayerCommand::GameplayPickupProbe(p) => {
                self.ecs.queue_pickup_probe(player_id, p)
            }
            other => {
                let tag = other.kind().tag();
                self.script.dispatch_event(tag, &raw.payload);
                self.stats.script_events += 1;
            }
        }
    }

    fn forward_runtime_events(&mut self) {
        for event in self.ecs.consume_combat_events() {
            self.script
                .dispatch_event(EVENT_HOSTILE_DEFEATED, &encode_combat_event(&event));
            self.stats.script_events += 1;
        }
        for event in self.ecs.consume_gameplay_events() {
            self.script
                .dispatch_event(EVENT_PICKUP_RESOLVED, &encode_gameplay_event(&event));
            self.stats.script_events += 1;
        }
    }

    fn publish_dirty_chunks(&mut self) {
        let mut summary = WorldSnapshotSummary {
            tick_index: self.tick_index,
            ..Default::default()
        };
        for coord in self.world.consume_dirty_chunks() {
            let Some(snapshot) = self.world.build_chunk_snapshot(coord) else {
                continue;
            };
            match encode_chunk_snapshot(&snapshot) {
                Ok(bytes) => {
                    summary.dirty_chunks.push(coord);
                    summary.chunk_payloads.push(bytes);
                }
                Err(err) => tracing::warn!(?coord, error = %err, "chunk snapshot not encodable"),
            }
        }
        self.stats.chunks_published += summary.dirty_chunks.len() as u64;
        tracing::trace!(chunks = summary.dirty_chunks.len(), "publishing world snapshot");
        self.net.publish_world_snapshot(&summary);
    }

    /// Decode a full-size chunk snapshot and hand it to the World.
    pub fn apply_chunk_payload(&mut self, payload: &[u8]) -> Result<ChunkCoord, KernelError> {
        if self.state != KernelState::Initialized {
            return Err(KernelError::NotInitialized);
        }
        let snapshot = decode_full_chunk_snapshot(payload)?;
        self.world.apply_chunk_snapshot(&snapshot)?;
        Ok(snapshot.chunk_coord)
    }

    pub fn state(&self) -> KernelState {
        self.state
    }

    pub fn tick_index(&self) -> u64 {
        self.tick_index
    }

    pub fn stats(&self) -> KernelStats {
        self.stats
    }

    pub fn ecs(&self) -> &EcsRuntime {
        &self.ecs
    }

    pub fn ecs_mut(&mut self) -> &mut EcsRuntime {
        &mut self.ecs
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn net(&self) -> &N {
        &self.net
    }

    pub fn net_mut(&mut self) -> &mut N {
        &mut self.net
    }

    pub fn script(&self) -> &S {
        &self.script
    }
}

/// Wire form of a combat event: entity index, generation, reward (VarUInt each).
pub fn encode_combat_event(event: &CombatEvent) -> Vec<u8> {
    let mut w = WireWriter::new();
    match event {
        CombatEvent::HostileDefeated {
            entity,
            reward_kill_count,
        } => {
            w.write_var_uint(u64::from(entity.index()));
            w.write_var_uint(u64::from(entity.generation()));
            w.write_var_uint(u64::from(*reward_kill_count));
        }
    }
    w.into_bytes()
}

/// Wire form of a gameplay event: player (VarUInt), tile x/y (VarInt),
/// material and amount (VarUInt).
pub fn encode_gameplay_event(event: &GameplayEvent) -> Vec<u8> {
    let mut w = WireWriter::new();
    match event {
        GameplayEvent::PickupResolved {
            player_id,
            tile_x,
            tile_y,
            material_id,
            amount,
        } => {
            w.write_var_uint(u64::from(*player_id));
            w.write_var_int(i64::from(*tile_x));
            w.write_var_int(i64::from(*tile_y));
            w.write_var_uint(u64::from(*material_id));
            w.write_var_uint(u64::from(*amount));
        }
    }
    w.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tileworld_common::{ChunkSnapshot, TileMutation};

    type CallLog = Rc<RefCell<Vec<String>>>;

    /// Records lifecycle calls into a shared log; can be told to fail startup.
    struct Recorder {
        name: &'static str,
        log: CallLog,
        fail_init: bool,
    }

    impl Recorder {
        fn new(name: &'static str, log: &CallLog) -> Self {
            Self {
                name,
                log: Rc::clone(log),
                fail_init: false,
            }
        }

        fn failing(name: &'static str, log: &CallLog) -> Self {
            Self {
                fail_init: true,
                ..Self::new(name, log)
            }
        }

        fn record(&self, call: &str) {
            self.log.borrow_mut().push(format!("{}.{}", self.name, call));
        }

        fn init(&mut self) -> Result<(), ServiceError> {
            self.record("initialize");
            if self.fail_init {
                Err(ServiceError::Unavailable("test".into()))
            } else {
                Ok(())
            }
        }
    }

    impl WorldService for Recorder {
        fn initialize(&mut self) -> Result<(), ServiceError> {
            self.init()
        }
        fn shutdown(&mut self) {
            self.record("shutdown");
        }
        fn tick(&mut self, _ctx: &TickContext) {
            self.record("tick");
        }
        fn load_chunk(&mut self, _coord: ChunkCoord) {}
        fn unload_chunk(&mut self, _coord: ChunkCoord) {}
        fn apply_tile_mutation(&mut self, _mutation: TileMutation) -> Result<(), WorldError> {
            Ok(())
        }
        fn build_chunk_snapshot(&self, _coord: ChunkCoord) -> Option<ChunkSnapshot> {
            None
        }
        fn apply_chunk_snapshot(&mut self, _snapshot: &ChunkSnapshot) -> Result<(), WorldError> {
            Ok(())
        }
        fn try_read_tile(&self, _tile_x: i32, _tile_y: i32) -> Option<u16> {
            None
        }
        fn consume_dirty_chunks(&mut self) -> Vec<ChunkCoord> {
            self.record("consume_dirty_chunks");
            Vec::new()
        }
    }

    impl NetService for Recorder {
        fn initialize(&mut self) -> Result<(), ServiceError> {
            self.init()
        }
        fn shutdown(&mut self) {
            self.record("shutdown");
        }
        fn tick(&mut self, _ctx: &TickContext) {
            self.record("tick");
        }
        fn submit_local_command(&mut self, _command: PlayerCommand) {}
        fn publish_world_snapshot(&mut self, _summary: &WorldSnapshotSummary) {
            self.record("publish");
        }
        fn drain_inbound_commands(&mut self) -> Vec<PlayerCommand> {
            Vec::new()
        }
    }

    impl ScriptHost for Recorder {
        fn initialize(&mut self) -> Result<(), ServiceError> {
            self.init()
        }
        fn shutdown(&mut self) {
            self.record("shutdown");
        }
        fn tick(&mut self, _ctx: &TickContext) {
            self.record("tick");
        }
        fn dispatch_event(&mut self, name: &str, _payload: &[u8]) {
            self.record(&format!("event:{name}"));
        }
    }

    fn count(log: &CallLog, call: &str) -> usize {
        log.borrow().iter().filter(|c| *c == call).count()
    }

    #[test]
    fn net_failure_rolls_back_world_only() {
        let log = CallLog::default();
        let mut k = SimulationKernel::new(
            Recorder::new("world", &log),
            Recorder::failing("net", &log),
            Recorder::new("script", &log),
        );
        let err = k.initialize().unwrap_err();
        assert!(matches!(err, KernelError::Startup { service: "net", .. }));
        assert_eq!(count(&log, "world.shutdown"), 1);
        assert_eq!(count(&log, "net.shutdown"), 0);
        assert_eq!(count(&log, "script.initialize"), 0);
        assert_eq!(k.state(), KernelState::Uninitialized);
    }

    #[test]
    fn script_failure_rolls_back_in_reverse_order() {
        let log = CallLog::default();
        let mut k = SimulationKernel::new(
            Recorder::new("world", &log),
            Recorder::new("net", &log),
            Recorder::failing("script", &log),
        );
        assert!(k.initialize().is_err());
        assert_eq!(
            *log.borrow(),
            vec![
                "world.initialize",
                "net.initialize",
                "script.initialize",
                "net.shutdown",
                "world.shutdown",
            ]
        );
    }

    #[test]
    fn world_failure_starts_nothing_else() {
        let log = CallLog::default();
        let mut k = SimulationKernel::new(
            Recorder::failing("world", &log),
            Recorder::new("net", &log),
            Recorder::new("script", &log),
        );
        assert!(matches!(
            k.initialize(),
            Err(KernelError::Startup {
                service: "world",
                ..
            })
        ));
        assert_eq!(*log.borrow(), vec!["world.initialize"]);
    }

    #[test]
    fn update_runs_collaborators_in_fixed_order() {
        let log = CallLog::default();
        let mut k = SimulationKernel::new(
            Recorder::new("world", &log),
            Recorder::new("net", &log),
            Recorder::new("script", &log),
        );
        k.initialize().unwrap();
        log.borrow_mut().clear();

        k.update(0.05);
        assert_eq!(
            *log.borrow(),
            vec![
                "net.tick",
                "world.tick",
                "script.tick",
                "world.consume_dirty_chunks",
                "net.publish",
            ]
        );
        assert_eq!(k.tick_index(), 1);
    }

    #[test]
    fn update_and_shutdown_are_noops_before_initialize() {
        let log = CallLog::default();
        let mut k = SimulationKernel::new(
            Recorder::new("world", &log),
            Recorder::new("net", &log),
            Recorder::new("script", &log),
        );
        k.update(0.05);
        k.shutdown();
        assert!(log.borrow().is_empty());
        assert_eq!(k.tick_index(), 0);
        assert_eq!(k.state(), KernelState::Uninitialized);
    }

    #[test]
    fn shutdown_reverses_startup_and_allows_restart() {
        let log = CallLog::default();
        let mut k = SimulationKernel::new(
            Recorder::new("world", &log),
            Recorder::new("net", &log),
            Recorder::new("script", &log),
        );
        k.initialize().unwrap();
        assert!(matches!(
            k.initialize(),
            Err(KernelError::AlreadyInitialized)
        ));
        log.borrow_mut().clear();

        k.shutdown();
        k.shutdown();
        assert_eq!(
            *log.borrow(),
            vec!["script.shutdown", "net.shutdown", "world.shutdown"]
        );
        assert_eq!(k.state(), KernelState::Shutdown);
        assert!(k.initialize().is_ok());
    }

    #[test]
    fn event_payloads_use_varints() {
        let event = GameplayEvent::PickupResolved {
            player_id: 1,
            tile_x: -1,
            tile_y: 2,
            material_id: 3,
            amount: 200,
        };
        assert_eq!(encode_gameplay_event(&event), vec![1, 1, 4, 3, 0xC8, 0x01]);
    }
}
