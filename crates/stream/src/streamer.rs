use tileworld_common::PlayerCommand;
use tileworld_kernel::{NetService, ScriptHost, SimulationKernel, WorldService};
use tileworld_protocol::{ChunkRequestPayload, TypedPlayerCommand};

use crate::window::{ChunkWindow, WindowConfig, WindowDelta, WindowStats};

/// Keeps one player's chunk window resident in the world.
///
/// Window changes are turned into `world.unload_chunk` / `world.load_chunk`
/// commands and submitted through the kernel, so the world applies them at
/// the next tick boundary like any other command.
#[derive(Debug, Clone)]
pub struct ChunkStreamer {
    player_id: u32,
    window: ChunkWindow,
}

impl ChunkStreamer {
    pub fn new(player_id: u32, config: WindowConfig) -> Self {
        Self {
            player_id,
            window: ChunkWindow::new(config),
        }
    }

    pub fn player_id(&self) -> u32 {
        self.player_id
    }

    pub fn window(&self) -> &ChunkWindow {
        &self.window
    }

    pub fn stats(&self) -> WindowStats {
        self.window.stats()
    }

    /// Envelopes for a delta: all unloads, then all loads.
    pub fn commands_for(&self, delta: &WindowDelta) -> Vec<PlayerCommand> {
        let unloads = delta
            .unloads
            .iter()
            .map(|c| TypedPlayerCommand::WorldUnloadChunk(ChunkRequestPayload::from(*c)));
        let loads = delta
            .loads
            .iter()
            .map(|c| TypedPlayerCommand::WorldLoadChunk(ChunkRequestPayload::from(*c)));
        unloads
            .chain(loads)
            .map(|cmd| cmd.to_player_command(self.player_id))
            .collect()
    }

    /// Move the window to the player's tile and queue the resulting commands.
    pub fn follow<W, N, S>(
        &mut self,
        kernel: &mut SimulationKernel<W, N, S>,
        tile_x: i32,
        tile_y: i32,
    ) -> WindowDelta
    where
        W: WorldService,
        N: NetService,
        S: ScriptHost,
    {
        let delta = self.window.update(tile_x, tile_y);
        if !delta.is_empty() {
            tracing::debug!(
                player = self.player_id,
                loads = delta.loads.len(),
                unloads = delta.unloads.len(),
                "submitting chunk requests"
            );
            for command in self.commands_for(&delta) {
                kernel.submit_local_command(command);
            }
        }
        delta
    }
}
