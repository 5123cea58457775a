use serde::{Deserialize, Serialize};

/// Side length of a chunk, in tiles.
pub const CHUNK_SIZE: i32 = 32;

/// Number of tiles stored in one chunk.
pub const CHUNK_TILE_COUNT: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

/// A chunk coordinate in chunk space (not tile space).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chunk containing the given tile. Floors toward negative infinity,
    /// so tile -1 belongs to chunk -1 rather than chunk 0.
    pub fn from_tile(tile_x: i32, tile_y: i32) -> Self {
        Self {
            x: tile_x.div_euclid(CHUNK_SIZE),
            y: tile_y.div_euclid(CHUNK_SIZE),
        }
    }

    /// Tile coordinate of this chunk's minimum corner. Widened to i64 since
    /// chunks near the i32 edges start outside the i32 tile range.
    pub fn origin_tile(self) -> (i64, i64) {
        let size = i64::from(CHUNK_SIZE);
        (i64::from(self.x) * size, i64::from(self.y) * size)
    }
}

/// Row-major index of a tile inside its owning chunk.
pub fn local_tile_index(tile_x: i32, tile_y: i32) -> usize {
    let lx = tile_x.rem_euclid(CHUNK_SIZE);
    let ly = tile_y.rem_euclid(CHUNK_SIZE);
    (ly * CHUNK_SIZE + lx) as usize
}

/// A single authoritative tile write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileMutation {
    pub tile_x: i32,
    pub tile_y: i32,
    pub material_id: u16,
}

impl TileMutation {
    /// Chunk that owns the mutated tile.
    pub fn chunk(&self) -> ChunkCoord {
        ChunkCoord::from_tile(self.tile_x, self.tile_y)
    }
}

/// Flat tile array of one chunk, row-major.
///
/// The world always produces [`CHUNK_TILE_COUNT`] tiles; the wire form only
/// requires a nonzero count and leaves the size check to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSnapshot {
    pub chunk_coord: ChunkCoord,
    pub tiles: Vec<u16>,
}

impl ChunkSnapshot {
    /// A full-size chunk filled with one material.
    pub fn filled(chunk_coord: ChunkCoord, material_id: u16) -> Self {
        Self {
            chunk_coord,
            tiles: vec![material_id; CHUNK_TILE_COUNT],
        }
    }

    pub fn is_full_size(&self) -> bool {
        self.tiles.len() == CHUNK_TILE_COUNT
    }
}

/// Per-tick parameters handed to every collaborator and system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickContext {
    pub tick_index: u64,
    pub fixed_delta_seconds: f32,
}

/// Transport-level command envelope. Opaque until decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCommand {
    pub player_id: u32,
    pub command_type: String,
    pub payload: Vec<u8>,
}

impl PlayerCommand {
    pub fn new(player_id: u32, command_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            player_id,
            command_type: command_type.into(),
            payload,
        }
    }
}
