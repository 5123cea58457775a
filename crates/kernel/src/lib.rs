//! Simulation kernel: owns the World, Net and Script collaborators plus the
//! entity runtime, and steps them in a fixed order.
//!
//! # Invariants
//! - Collaborators start World, Net, Script and stop in reverse; a failed
//!   start leaves nothing running.
//! - All mutation happens inside `update`. Commands submitted between ticks
//!   apply at the next tick boundary, inbound before local.
//! - A command that fails to decode is dropped and never partially applied.

pub mod kernel;
pub mod net;
pub mod script;
pub mod service;
pub mod world;

pub use kernel::{
    EVENT_HOSTILE_DEFEATED, EVENT_PICKUP_RESOLVED, KernelError, KernelState, KernelStats,
    SimulationKernel, encode_combat_event, encode_gameplay_event,
};
pub use net::LoopbackNet;
pub use script::{EventLogScriptHost, ScriptEvent};
pub use service::{
    NetService, ScriptHost, ServiceError, WorldError, WorldService, WorldSnapshotSummary,
};
pub use world::{AIR, DEFAULT_PARKED_LIMIT, TerrainConfig, TileWorld};

/// Kernel wired to the in-process reference collaborators.
pub type LocalKernel = SimulationKernel<TileWorld, LoopbackNet, EventLogScriptHost>;

impl LocalKernel {
    pub fn local(world: TileWorld) -> Self {
        SimulationKernel::new(world, LoopbackNet::new(), EventLogScriptHost::new())
    }
}

pub fn crate_info() -> &'static str {
    "tileworld-kernel v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("kernel"));
    }
}
