//! Session lifecycle for chunked transfers.
//!
//! The [`SessionManager`] is the only mutation path for chunked-transfer
//! state. Each session moves through a fixed state machine: `Created`
//! on init, `Receiving` after the first chunk, `Processing` while the last
//! chunk triggers reassembly, then `Complete` or `Error`; idle sessions
//! expire to `Expired` via the TTL sweep. Terminal states admit no further
//! transitions.

mod manager;
mod session;
mod store;

pub use manager::{SessionManager, SweeperHandle};
pub use session::{ChunkAck, Session, SessionMeta, SessionPoll};
pub use store::{MemoryStore, SessionStore};

/// Errors produced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session expired: {0}")]
    Expired(String),

    #[error("session already complete: {0}")]
    AlreadyComplete(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("chunk index {index} out of range for {expected} expected chunks")]
    ChunkOutOfRange { index: u32, expected: u32 },

    #[error("chunk {index} declares {declared} total chunks, session expects {expected}")]
    ChunkTotalMismatch {
        index: u32,
        declared: u32,
        expected: u32,
    },

    #[error("checksum mismatch on chunk {index}")]
    ChunkChecksum { index: u32 },
}

impl SessionError {
    /// Returns `true` when the caller must restart the whole transfer
    /// (lifecycle violations), as opposed to resending a single chunk.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            SessionError::NotFound(_)
                | SessionError::Expired(_)
                | SessionError::AlreadyComplete(_)
        )
    }
}
