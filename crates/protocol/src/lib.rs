//! Command wire protocol: how untrusted client commands are decoded.
//!
//! # Invariants
//! - Decoding never panics; malformed bytes and rule violations are errors.
//! - Every payload must be consumed exactly; trailing bytes are rejected.
//! - A decoded [`TypedPlayerCommand`] has already passed schema validation.

pub mod command;
pub mod schema;
pub mod wire;

pub use command::{CommandKind, DecodedCommand, TypedPlayerCommand, decode_player_command};
pub use schema::{
    ActionPrimaryPayload, ChunkRequestPayload, CollectResourcePayload, CommandPayload,
    CraftRecipePayload, FireProjectilePayload, INPUT_FLAG_JUMP, InteractionPayload,
    MotionInputPayload, PickupProbePayload, SetTilePayload, SpawnDropPayload,
};
pub use wire::{WireError, WireReader, WireWriter};

pub fn crate_info() -> &'static str {
    "tileworld-protocol v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("protocol"));
    }
}
