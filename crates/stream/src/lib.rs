//! Chunk streaming: a square window of resident chunks that follows a player.
//!
//! # Invariants
//! - Tile to chunk mapping floors toward negative infinity.
//! - Deltas are computed only when the centre chunk changes.
//! - Loads and unloads reach the world as ordinary commands, never by
//!   direct mutation.

mod streamer;
mod window;

pub use streamer::ChunkStreamer;
pub use window::{ChunkWindow, WindowConfig, WindowDelta, WindowStats};

pub fn crate_info() -> &'static str {
    "tileworld-stream v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("stream"));
    }
}
