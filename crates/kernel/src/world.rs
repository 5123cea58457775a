use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tileworld_common::{
    CHUNK_SIZE, CHUNK_TILE_COUNT, ChunkCoord, ChunkSnapshot, TickContext, TileMutation,
    local_tile_index,
};

use crate::service::{ServiceError, WorldError, WorldService};

/// Material id of empty space.
pub const AIR: u16 = 0;

/// Terrain parameters for chunks that were never seen before.
#[derive(Debug, Clone)]
pub struct TerrainConfig {
    pub seed: u64,
    /// Tile row of the flattest surface. Rows below it (greater y) are ground.
    pub surface_y: i32,
    /// Maximum extra depth of the surface per column.
    pub surface_variation: u32,
    pub ground_material: u16,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            surface_y: 8,
            surface_variation: 4,
            ground_material: 1,
        }
    }
}

/// Default number of unloaded chunks kept for restore (about 8 MiB of tiles).
pub const DEFAULT_PARKED_LIMIT: usize = 4096;

/// In-memory authoritative tile world.
///
/// Loaded chunks live in a BTreeMap for deterministic iteration. Unloading
/// parks a chunk instead of dropping it, so edits survive a reload. At most
/// `parked_limit` chunks stay parked; the oldest is evicted first and comes
/// back freshly generated. Chunks never seen before are generated from
/// [`TerrainConfig`].
///
/// Loaded chunks are not capped: every `load_chunk` keeps its chunk resident
/// until a matching `unload_chunk`, so hosts exposing this world to untrusted
/// peers should bound loads per peer.
#[derive(Debug, Clone)]
pub struct TileWorld {
    terrain: TerrainConfig,
    loaded: BTreeMap<ChunkCoord, Vec<u16>>,
    parked: BTreeMap<ChunkCoord, Vec<u16>>,
    park_order: VecDeque<ChunkCoord>,
    parked_limit: usize,
    dirty: BTreeSet<ChunkCoord>,
    tick: u64,
    running: bool,
}

impl Default for TileWorld {
    fn default() -> Self {
        Self {
            terrain: TerrainConfig::default(),
            loaded: BTreeMap::new(),
            parked: BTreeMap::new(),
            park_order: VecDeque::new(),
            parked_limit: DEFAULT_PARKED_LIMIT,
            dirty: BTreeSet::new(),
            tick: 0,
            running: false,
        }
    }
}

impl TileWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_terrain(terrain: TerrainConfig) -> Self {
        Self {
            terrain,
            ..Default::default()
        }
    }

    /// Caps how many unloaded chunks are kept for restore.
    pub fn with_parked_limit(mut self, limit: usize) -> Self {
        self.parked_limit = limit;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Last tick index seen by [`WorldService::tick`].
    pub fn tick_index(&self) -> u64 {
        self.tick
    }

    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.loaded.contains_key(&coord)
    }

    pub fn loaded_chunks(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.loaded.keys().copied()
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    pub fn parked_count(&self) -> usize {
        self.parked.len()
    }

    fn generate(&self, coord: ChunkCoord) -> Vec<u16> {
        let (origin_x, origin_y) = coord.origin_tile();
        let mut tiles = vec![AIR; CHUNK_TILE_COUNT];
        for lx in 0..CHUNK_SIZE {
            let surface = self.surface_at(origin_x + i64::from(lx));
            for ly in 0..CHUNK_SIZE {
                if origin_y + i64::from(ly) >= surface {
                    tiles[(ly * CHUNK_SIZE + lx) as usize] = self.terrain.ground_material;
                }
            }
        }
        tiles
    }

    fn surface_at(&self, tile_x: i64) -> i64 {
        let base = i64::from(self.terrain.surface_y);
        let variation = self.terrain.surface_variation;
        if variation == 0 {
            return base;
        }
        let h = splitmix64(self.terrain.seed ^ tile_x as u64);
        base + (h % (u64::from(variation) + 1)) as i64
    }

    /// Deterministic hash of loaded and parked tiles plus the tick, in
    /// canonical (BTreeMap) order.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &self.tick.to_le_bytes());
        for (tag, chunks) in [(0u8, &self.loaded), (1u8, &self.parked)] {
            mix(&mut h, &[tag]);
            for (coord, tiles) in chunks {
                mix(&mut h, &coord.x.to_le_bytes());
                mix(&mut h, &coord.y.to_le_bytes());
                for tile in tiles {
                    mix(&mut h, &tile.to_le_bytes());
                }
            }
        }
        h
    }
}

impl WorldService for TileWorld {
    fn initialize(&mut self) -> Result<(), ServiceError> {
        if self.running {
            return Err(ServiceError::AlreadyRunning);
        }
        self.running = true;
        tracing::info!("tile world started");
        Ok(())
    }

    fn shutdown(&mut self) {
        self.running = false;
        tracing::info!(
            loaded = self.loaded.len(),
            parked = self.parked.len(),
            "tile world stopped"
        );
    }

    fn tick(&mut self, ctx: &TickContext) {
        self.tick = ctx.tick_index;
    }

    fn load_chunk(&mut self, coord: ChunkCoord) {
        if self.loaded.contains_key(&coord) {
            return;
        }
        let tiles = match self.parked.remove(&coord) {
            Some(tiles) => {
                self.park_order.retain(|c| *c != coord);
                tracing::debug!(?coord, "chunk restored");
                tiles
            }
            None => {
                tracing::debug!(?coord, "chunk generated");
                self.generate(coord)
            }
        };
        self.loaded.insert(coord, tiles);
        self.dirty.insert(coord);
    }

    fn unload_chunk(&mut self, coord: ChunkCoord) {
        if let Some(tiles) = self.loaded.remove(&coord) {
            tracing::debug!(?coord, "chunk parked");
            self.parked.insert(coord, tiles);
            self.park_order.push_back(coord);
            self.dirty.remove(&coord);
            while self.parked.len() > self.parked_limit {
                let Some(oldest) = self.park_order.pop_front() else {
                    break;
                };
                self.parked.remove(&oldest);
                tracing::debug!(coord = ?oldest, "parked chunk evicted");
            }
        }
    }

    fn apply_tile_mutation(&mut self, mutation: TileMutation) -> Result<(), WorldError> {
        let coord = mutation.chunk();
        let tiles = self
            .loaded
            .get_mut(&coord)
            .ok_or(WorldError::ChunkNotLoaded(coord))?;
        let slot = &mut tiles[local_tile_index(mutation.tile_x, mutation.tile_y)];
        if *slot != mutation.material_id {
            *slot = mutation.material_id;
            self.dirty.insert(coord);
        }
        Ok(())
    }

    fn build_chunk_snapshot(&self, coord: ChunkCoord) -> Option<ChunkSnapshot> {
        self.loaded.get(&coord).map(|tiles| ChunkSnapshot {
            chunk_coord: coord,
            tiles: tiles.clone(),
        })
    }

    /// Replaces (and loads) the chunk. The chunk is marked dirty so peers
    /// receive the new contents.
    fn apply_chunk_snapshot(&mut self, snapshot: &ChunkSnapshot) -> Result<(), WorldError> {
        let coord = snapshot.chunk_coord;
        if !snapshot.is_full_size() {
            return Err(WorldError::SnapshotSize {
                coord,
                actual: snapshot.tiles.len(),
                expected: CHUNK_TILE_COUNT,
            });
        }
        if self.parked.remove(&coord).is_some() {
            self.park_order.retain(|c| *c != coord);
        }
        self.loaded.insert(coord, snapshot.tiles.clone());
        self.dirty.insert(coord);
        Ok(())
    }

    fn try_read_tile(&self, tile_x: i32, tile_y: i32) -> Option<u16> {
        let tiles = self.loaded.get(&ChunkCoord::from_tile(tile_x, tile_y))?;
        tiles.get(local_tile_index(tile_x, tile_y)).copied()
    }

    fn consume_dirty_chunks(&mut self) -> Vec<ChunkCoord> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }
}

/// Splitmix64 step; gives each terrain column a reproducible height.
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat() -> TileWorld {
        TileWorld::with_terrain(TerrainConfig {
            surface_variation: 0,
            ..TerrainConfig::default()
        })
    }

    #[test]
    fn world_starts_empty() {
        let w = TileWorld::new();
        assert_eq!(w.loaded_count(), 0);
        assert!(w.try_read_tile(0, 0).is_none());
    }

    #[test]
    fn initialize_twice_is_rejected() {
        let mut w = TileWorld::new();
        w.initialize().unwrap();
        assert!(matches!(w.initialize(), Err(ServiceError::AlreadyRunning)));
        w.shutdown();
        assert!(w.initialize().is_ok());
    }

    #[test]
    fn flat_terrain_splits_at_surface() {
        let mut w = flat();
        w.load_chunk(ChunkCoord::new(0, 0));
        assert_eq!(w.try_read_tile(3, 7), Some(AIR));
        assert_eq!(w.try_read_tile(3, 8), Some(1));
        assert_eq!(w.try_read_tile(31, 31), Some(1));
    }

    #[test]
    fn tile_mutation_requires_loaded_chunk() {
        let mut w = flat();
        let m = TileMutation {
            tile_x: -1,
            tile_y: 0,
            material_id: 4,
        };
        assert_eq!(
            w.apply_tile_mutation(m),
            Err(WorldError::ChunkNotLoaded(ChunkCoord::new(-1, 0)))
        );
        w.load_chunk(ChunkCoord::new(-1, 0));
        w.consume_dirty_chunks();
        w.apply_tile_mutation(m).unwrap();
        assert_eq!(w.try_read_tile(-1, 0), Some(4));
        assert_eq!(w.consume_dirty_chunks(), vec![ChunkCoord::new(-1, 0)]);
    }

    #[test]
    fn unchanged_tile_does_not_dirty_chunk() {
        let mut w = flat();
        w.load_chunk(ChunkCoord::new(0, 0));
        w.consume_dirty_chunks();
        w.apply_tile_mutation(TileMutation {
            tile_x: 0,
            tile_y: 0,
            material_id: AIR,
        })
        .unwrap();
        assert!(w.consume_dirty_chunks().is_empty());
    }

    #[test]
    fn dirty_chunks_drain_once() {
        let mut w = flat();
        w.load_chunk(ChunkCoord::new(1, 0));
        w.load_chunk(ChunkCoord::new(0, 0));
        assert_eq!(
            w.consume_dirty_chunks(),
            vec![ChunkCoord::new(0, 0), ChunkCoord::new(1, 0)]
        );
        assert!(w.consume_dirty_chunks().is_empty());
    }

    #[test]
    fn edits_survive_unload_and_reload() {
        let mut w = flat();
        let c = ChunkCoord::new(2, -1);
        w.load_chunk(c);
        w.apply_tile_mutation(TileMutation {
            tile_x: 64,
            tile_y: -32,
            material_id: 9,
        })
        .unwrap();
        w.unload_chunk(c);
        assert!(!w.is_loaded(c));
        assert_eq!(w.parked_count(), 1);
        assert!(w.consume_dirty_chunks().is_empty());

        w.load_chunk(c);
        assert_eq!(w.try_read_tile(64, -32), Some(9));
        assert_eq!(w.parked_count(), 0);
    }

    #[test]
    fn parked_chunks_are_capped_oldest_first() {
        let mut w = flat().with_parked_limit(2);
        for x in 0..3 {
            let c = ChunkCoord::new(x, 0);
            w.load_chunk(c);
            w.apply_tile_mutation(TileMutation {
                tile_x: x * 32,
                tile_y: 0,
                material_id: 9,
            })
            .unwrap();
            w.unload_chunk(c);
        }
        assert_eq!(w.parked_count(), 2);

        // Chunk 0 was evicted and regenerates without the edit.
        w.load_chunk(ChunkCoord::new(0, 0));
        assert_eq!(w.try_read_tile(0, 0), Some(AIR));
        w.load_chunk(ChunkCoord::new(2, 0));
        assert_eq!(w.try_read_tile(64, 0), Some(9));
        assert_eq!(w.parked_count(), 1);
    }

    #[test]
    fn chunks_at_the_i32_edges_generate_terrain() {
        let mut w = flat();
        let c = ChunkCoord::new(i32::MAX, 0);
        w.load_chunk(c);
        let snap = w.build_chunk_snapshot(c).unwrap();
        assert_eq!(snap.tiles[7 * 32], AIR);
        assert_eq!(snap.tiles[8 * 32], 1);

        let low = ChunkCoord::new(i32::MIN, i32::MAX);
        w.load_chunk(low);
        let snap = w.build_chunk_snapshot(low).unwrap();
        assert!(snap.tiles.iter().all(|&t| t == 1));
    }

    #[test]
    fn snapshot_roundtrip_through_world() {
        let mut a = flat();
        let c = ChunkCoord::new(0, 0);
        a.load_chunk(c);
        a.apply_tile_mutation(TileMutation {
            tile_x: 5,
            tile_y: 5,
            material_id: 3,
        })
        .unwrap();
        let snap = a.build_chunk_snapshot(c).unwrap();

        let mut b = TileWorld::new();
        b.apply_chunk_snapshot(&snap).unwrap();
        assert_eq!(b.try_read_tile(5, 5), Some(3));
        assert_eq!(b.build_chunk_snapshot(c), Some(snap));
    }

    #[test]
    fn short_snapshot_is_rejected() {
        let mut w = TileWorld::new();
        let snap = ChunkSnapshot {
            chunk_coord: ChunkCoord::new(0, 0),
            tiles: vec![1; 10],
        };
        assert!(matches!(
            w.apply_chunk_snapshot(&snap),
            Err(WorldError::SnapshotSize { actual: 10, .. })
        ));
        assert!(!w.is_loaded(ChunkCoord::new(0, 0)));
    }

    #[test]
    fn terrain_is_deterministic_per_seed() {
        let cfg = TerrainConfig {
            seed: 42,
            ..TerrainConfig::default()
        };
        let mut w1 = TileWorld::with_terrain(cfg.clone());
        let mut w2 = TileWorld::with_terrain(cfg);
        for x in -2..2 {
            w1.load_chunk(ChunkCoord::new(x, 0));
            w2.load_chunk(ChunkCoord::new(x, 0));
        }
        assert_eq!(w1.state_hash(), w2.state_hash());
    }

    #[test]
    fn state_hash_tracks_edits() {
        let mut w = flat();
        w.load_chunk(ChunkCoord::new(0, 0));
        let before = w.state_hash();
        w.apply_tile_mutation(TileMutation {
            tile_x: 1,
            tile_y: 1,
            material_id: 2,
        })
        .unwrap();
        assert_ne!(before, w.state_hash());
    }
}
