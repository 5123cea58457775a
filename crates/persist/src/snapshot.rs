//! Binary chunk snapshot layout:
//!
//! ```text
//! chunk_x     VarInt
//! chunk_y     VarInt
//! tile_count  VarUInt
//! tiles       VarUInt byte length + tile_count little-endian u16 values
//! ```

use tileworld_common::{CHUNK_TILE_COUNT, ChunkCoord, ChunkSnapshot};
use tileworld_protocol::{WireError, WireReader, WireWriter};

/// Errors from encoding or decoding chunk snapshots.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot has no tiles")]
    NoTiles,
    #[error("tile array of {0} entries overflows the byte length")]
    TooLarge(usize),
    #[error("snapshot payload is empty")]
    EmptyPayload,
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] WireError),
    #[error("tile count {count} does not match {bytes} tile bytes")]
    LengthMismatch { count: u64, bytes: usize },
    #[error("chunk {coord:?} carries {actual} tiles, expected {expected}")]
    WrongChunkSize {
        coord: ChunkCoord,
        actual: usize,
        expected: usize,
    },
}

const BYTES_PER_TILE: usize = 2;

pub fn encode_chunk_snapshot(snapshot: &ChunkSnapshot) -> Result<Vec<u8>, SnapshotError> {
    let count = snapshot.tiles.len();
    if count == 0 {
        return Err(SnapshotError::NoTiles);
    }
    let byte_len = count
        .checked_mul(BYTES_PER_TILE)
        .ok_or(SnapshotError::TooLarge(count))?;

    let mut blob = Vec::with_capacity(byte_len);
    for tile in &snapshot.tiles {
        blob.extend_from_slice(&tile.to_le_bytes());
    }

    let mut w = WireWriter::with_capacity(byte_len + 16);
    w.write_var_int(i64::from(snapshot.chunk_coord.x));
    w.write_var_int(i64::from(snapshot.chunk_coord.y));
    w.write_var_uint(count as u64);
    w.write_bytes(&blob);

    tracing::trace!(chunk = ?snapshot.chunk_coord, bytes = w.len(), "encoded chunk snapshot");
    Ok(w.into_bytes())
}

/// Decode a snapshot of any nonzero tile count.
pub fn decode_chunk_snapshot(payload: &[u8]) -> Result<ChunkSnapshot, SnapshotError> {
    if payload.is_empty() {
        return Err(SnapshotError::EmptyPayload);
    }
    let mut r = WireReader::new(payload);
    let chunk_coord = ChunkCoord::new(r.read_i32()?, r.read_i32()?);
    let count = r.read_var_uint()?;
    if count == 0 {
        return Err(SnapshotError::NoTiles);
    }
    let blob = r.read_bytes()?;
    r.finish()?;

    let expected = usize::try_from(count)
        .ok()
        .and_then(|c| c.checked_mul(BYTES_PER_TILE));
    if expected != Some(blob.len()) {
        return Err(SnapshotError::LengthMismatch {
            count,
            bytes: blob.len(),
        });
    }

    let tiles = blob
        .chunks_exact(BYTES_PER_TILE)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Ok(ChunkSnapshot { chunk_coord, tiles })
}

/// Decode a snapshot destined for the world, which must be exactly one chunk.
pub fn decode_full_chunk_snapshot(payload: &[u8]) -> Result<ChunkSnapshot, SnapshotError> {
    let snapshot = decode_chunk_snapshot(payload)?;
    if !snapshot.is_full_size() {
        return Err(SnapshotError::WrongChunkSize {
            coord: snapshot.chunk_coord,
            actual: snapshot.tiles.len(),
            expected: CHUNK_TILE_COUNT,
        });
    }
    Ok(snapshot)
}
