use serde::{Deserialize, Serialize};
use tileworld_common::ChunkCoord;

/// Window shape around the tracked centre chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Chebyshev radius in chunks. Radius 2 keeps a 5x5 square resident.
    pub radius: i32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { radius: 2 }
    }
}

impl WindowConfig {
    /// Number of chunks resident in a full window.
    pub fn chunk_count(&self) -> usize {
        let side = (2 * self.radius + 1) as usize;
        side * side
    }
}

/// Chunks entering and leaving the window, each in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowDelta {
    pub loads: Vec<ChunkCoord>,
    pub unloads: Vec<ChunkCoord>,
}

impl WindowDelta {
    pub fn is_empty(&self) -> bool {
        self.loads.is_empty() && self.unloads.is_empty()
    }
}

/// Per-update and running counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowStats {
    pub loads_this_update: usize,
    pub unloads_this_update: usize,
    pub total_loads: u64,
    pub total_unloads: u64,
    pub center_changes: u64,
}

/// Square window of resident chunks that follows a tile position.
///
/// Only a change of centre chunk produces work; moving within the same chunk
/// yields an empty delta.
#[derive(Debug, Clone, Default)]
pub struct ChunkWindow {
    config: WindowConfig,
    center: Option<ChunkCoord>,
    stats: WindowStats,
}

impl ChunkWindow {
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            center: None,
            stats: WindowStats::default(),
        }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn center(&self) -> Option<ChunkCoord> {
        self.center
    }

    pub fn stats(&self) -> WindowStats {
        self.stats
    }

    /// Whether `coord` lies inside the current window.
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.center
            .is_some_and(|c| in_window(c, self.config.radius, coord))
    }

    /// Every chunk of the current window, row-major. Empty before the first
    /// update.
    pub fn chunks(&self) -> Vec<ChunkCoord> {
        self.center
            .map(|c| window_chunks(c, self.config.radius).collect())
            .unwrap_or_default()
    }

    /// Move the window to the chunk containing the given tile.
    pub fn update(&mut self, tile_x: i32, tile_y: i32) -> WindowDelta {
        let _span = tracing::info_span!("stream_update").entered();
        let next = ChunkCoord::from_tile(tile_x, tile_y);
        let radius = self.config.radius;

        if self.center == Some(next) {
            self.stats.loads_this_update = 0;
            self.stats.unloads_this_update = 0;
            return WindowDelta::default();
        }

        let delta = match self.center {
            None => WindowDelta {
                loads: window_chunks(next, radius).collect(),
                unloads: Vec::new(),
            },
            Some(prev) => WindowDelta {
                loads: window_chunks(next, radius)
                    .filter(|c| !in_window(prev, radius, *c))
                    .collect(),
                unloads: window_chunks(prev, radius)
                    .filter(|c| !in_window(next, radius, *c))
                    .collect(),
            },
        };

        tracing::debug!(from = ?self.center, to = ?next, "window centre moved");
        self.center = Some(next);
        self.stats.loads_this_update = delta.loads.len();
        self.stats.unloads_this_update = delta.unloads.len();
        self.stats.total_loads += delta.loads.len() as u64;
        self.stats.total_unloads += delta.unloads.len() as u64;
        self.stats.center_changes += 1;

        tracing::trace!(
            loads = delta.loads.len(),
            unloads = delta.unloads.len(),
            "stream update complete"
        );
        delta
    }
}

fn in_window(center: ChunkCoord, radius: i32, coord: ChunkCoord) -> bool {
    (coord.x - center.x).abs() <= radius && (coord.y - center.y).abs() <= radius
}

/// Row-major (y, then x) walk of the square around `center`.
fn window_chunks(center: ChunkCoord, radius: i32) -> impl Iterator<Item = ChunkCoord> {
    (-radius..=radius).flat_map(move |dy| {
        (-radius..=radius).map(move |dx| ChunkCoord::new(center.x + dx, center.y + dy))
    })
}
