//! Shared data model for the tileworld simulation core.
//!
//! # Invariants
//! - Chunk coordinates are derived from tile coordinates by floor division,
//!   so negative tiles land in negative chunks.
//! - Every chunk holds exactly [`CHUNK_TILE_COUNT`] tiles in row-major order.

mod types;

pub use types::{
    CHUNK_SIZE, CHUNK_TILE_COUNT, ChunkCoord, ChunkSnapshot, PlayerCommand, TickContext,
    TileMutation, local_tile_index,
};

pub fn crate_info() -> &'static str {
    "tileworld-common v0.1.0"
}
