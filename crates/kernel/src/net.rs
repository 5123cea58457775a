use std::collections::VecDeque;
use tileworld_common::{PlayerCommand, TickContext};

use crate::service::{NetService, ServiceError, WorldSnapshotSummary};

/// In-process transport.
///
/// Remote commands are injected by hand; everything the kernel sends out is
/// recorded for inspection.
#[derive(Debug, Default)]
pub struct LoopbackNet {
    inbound: VecDeque<PlayerCommand>,
    outbound: Vec<PlayerCommand>,
    published: Vec<WorldSnapshotSummary>,
    last_tick: Option<u64>,
    running: bool,
}

impl LoopbackNet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command as if it arrived from a peer.
    pub fn inject_remote(&mut self, command: PlayerCommand) {
        self.inbound.push_back(command);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn last_tick(&self) -> Option<u64> {
        self.last_tick
    }

    /// Commands forwarded by the kernel, oldest first.
    pub fn outbound(&self) -> &[PlayerCommand] {
        &self.outbound
    }

    /// Every summary published so far, oldest first.
    pub fn published(&self) -> &[WorldSnapshotSummary] {
        &self.published
    }

    pub fn take_published(&mut self) -> Vec<WorldSnapshotSummary> {
        std::mem::take(&mut self.published)
    }
}

impl NetService for LoopbackNet {
    fn initialize(&mut self) -> Result<(), ServiceError> {
        if self.running {
            return Err(ServiceError::AlreadyRunning);
        }
        self.running = true;
        tracing::info!("loopback net started");
        Ok(())
    }

    fn shutdown(&mut self) {
        self.running = false;
        if !self.inbound.is_empty() {
            tracing::debug!(dropped = self.inbound.len(), "discarding undelivered inbound commands");
            self.inbound.clear();
        }
        tracing::info!("loopback net stopped");
    }

    fn tick(&mut self, ctx: &TickContext) {
        self.last_tick = Some(ctx.tick_index);
    }

    fn submit_local_command(&mut self, command: PlayerCommand) {
        self.outbound.push(command);
    }

    fn publish_world_snapshot(&mut self, summary: &WorldSnapshotSummary) {
        self.published.push(summary.clone());
    }

    fn drain_inbound_commands(&mut self) -> Vec<PlayerCommand> {
        self.inbound.drain(..).collect()
    }
}
