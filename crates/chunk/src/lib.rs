//! Chunk codec: deterministic split and reassembly of transfer payloads.
//!
//! `assemble(split(p, k)) == p` for every payload `p` and every chunk size
//! `k >= 1`. Reassembly is driven by chunk index, never by arrival order,
//! and verifies a CRC32 per chunk so corruption is detected rather than
//! silently concatenated.

mod codec;

pub use codec::{Chunk, assemble, checksum, digest_hex, split};

/// Errors produced by the chunk codec.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("incomplete transfer: missing chunk indices {missing:?}")]
    Incomplete { missing: Vec<u32> },

    #[error("checksum mismatch on chunk {index}")]
    ChecksumMismatch { index: u32 },

    #[error("chunk index {index} out of range for {expected} expected chunks")]
    IndexOutOfRange { index: u32, expected: u32 },

    #[error("chunk {index} declares {declared} total chunks, expected {expected}")]
    TotalMismatch {
        index: u32,
        declared: u32,
        expected: u32,
    },

    #[error("no chunks to assemble")]
    Empty,
}
