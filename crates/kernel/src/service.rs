//! Collaborator contracts driven by [`crate::SimulationKernel`].

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tileworld_common::{ChunkCoord, ChunkSnapshot, PlayerCommand, TickContext, TileMutation};

/// Collaborator startup failure.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service is already running")]
    AlreadyRunning,
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Rejected world mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("chunk {0:?} is not loaded")]
    ChunkNotLoaded(ChunkCoord),
    #[error("chunk {coord:?} snapshot has {actual} tiles, expected {expected}")]
    SnapshotSize {
        coord: ChunkCoord,
        actual: usize,
        expected: usize,
    },
}

/// What the kernel hands Net at the end of every tick.
///
/// `dirty_chunks[i]` is described by `chunk_payloads[i]`, an encoded chunk
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorldSnapshotSummary {
    pub tick_index: u64,
    pub dirty_chunks: Vec<ChunkCoord>,
    pub chunk_payloads: Vec<Vec<u8>>,
}

/// Authoritative tile storage.
pub trait WorldService {
    fn initialize(&mut self) -> Result<(), ServiceError>;
    fn shutdown(&mut self);
    fn tick(&mut self, ctx: &TickContext);
    fn load_chunk(&mut self, coord: ChunkCoord);
    fn unload_chunk(&mut self, coord: ChunkCoord);
    fn apply_tile_mutation(&mut self, mutation: TileMutation) -> Result<(), WorldError>;
    fn build_chunk_snapshot(&self, coord: ChunkCoord) -> Option<ChunkSnapshot>;
    fn apply_chunk_snapshot(&mut self, snapshot: &ChunkSnapshot) -> Result<(), WorldError>;
    fn try_read_tile(&self, tile_x: i32, tile_y: i32) -> Option<u16>;
    /// Chunks mutated since the last call. Drains the list.
    fn consume_dirty_chunks(&mut self) -> Vec<ChunkCoord>;
}

/// Transport for commands and world state.
pub trait NetService {
    fn initialize(&mut self) -> Result<(), ServiceError>;
    fn shutdown(&mut self);
    fn tick(&mut self, ctx: &TickContext);
    /// Forward a locally accepted command to peers.
    fn submit_local_command(&mut self, command: PlayerCommand);
    fn publish_world_snapshot(&mut self, summary: &WorldSnapshotSummary);
    /// Commands received from peers since the last call, in arrival order.
    fn drain_inbound_commands(&mut self) -> Vec<PlayerCommand>;
}

/// Scripted gameplay reactions.
pub trait ScriptHost {
    fn initialize(&mut self) -> Result<(), ServiceError>;
    fn shutdown(&mut self);
    fn tick(&mut self, ctx: &TickContext);
    fn dispatch_event(&mut self, name: &str, payload: &[u8]);
}
