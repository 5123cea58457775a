//! Persistence: the chunk snapshot codec.
//!
//! # Invariants
//! - The byte layout is a transmitted contract; field order never changes.
//! - `decode(encode(s)) == s` for every snapshot with a nonzero tile count.
//! - Decoding rejects count/length mismatches and trailing bytes.

pub mod snapshot;

pub use snapshot::{
    SnapshotError, decode_chunk_snapshot, decode_full_chunk_snapshot, encode_chunk_snapshot,
};

pub fn crate_info() -> &'static str {
    "tileworld-persist v0.1.0"
}
