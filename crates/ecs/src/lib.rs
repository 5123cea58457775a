//! Deterministic entity runtime for transient gameplay objects.
//!
//! Components live in one BTreeMap per type, keyed by generational
//! [`EntityHandle`]. Systems run in a fixed order once per tick.
//!
//! # Invariants
//! - Queued intents never mutate state before the next [`EcsRuntime::tick`].
//! - Destruction is deferred to the end of the tick; no system observes a
//!   half-destroyed entity.
//! - Iteration order is ascending handle order (BTreeMap).
//! - A stale handle never resolves after its slot is reused.

pub mod components;
pub mod entity;
pub mod events;
pub mod runtime;

pub use components::{
    Collider, ComponentStore, Faction, Health, HostileTarget, Lifetime, Projectile, Transform,
    Velocity, WorldDrop,
};
pub use entity::{EntityAllocator, EntityHandle};
pub use events::{CombatEvent, GameplayEvent, RuntimeDiagnostics};
pub use runtime::{EcsRuntime, HostileSpawn, RuntimeConfig};

pub fn crate_info() -> &'static str {
    "tileworld-ecs v0.1.0"
}
