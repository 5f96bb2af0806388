//! Client side of the transfer protocol.
//!
//! [`TransferClient`] is the one component callers interact with: it
//! classifies the payload, compresses it, and either ships it in a single
//! request or fans it out as a checksummed chunk sequence against a
//! server-side session, with a uniform retry policy for every network call.

mod client;
mod options;
mod outcome;
mod retry;
mod strategy;
mod transport;

pub use client::TransferClient;
pub use options::TransferOptions;
pub use outcome::{OutcomeSink, ProgressCallback, TransferOutcome, TransferReport};
pub use retry::RetryPolicy;
pub use strategy::classify;
pub use transport::{HttpTransport, Transport, TransportError, TransportFuture};

use datalift_chunk::ChunkError;
use datalift_compress::CompressError;
use datalift_protocol::ErrorCode;

/// Errors surfaced to callers of the transfer client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Malformed request on the caller's side; never retried.
    #[error("invalid transfer options: {0}")]
    Validation(String),

    /// Transport failure that was not worth retrying.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Retryable transport failures exhausted the retry budget.
    #[error("transfer failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error(transparent)]
    Compress(#[from] CompressError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    /// The server answered with an error envelope. Terminal: the caller
    /// decides whether to resend with different options.
    #[error("server rejected transfer ({code}): {message}")]
    Remote {
        code: ErrorCode,
        message: String,
        troubleshooting: String,
    },

    /// The server's response did not follow the protocol.
    #[error("malformed response: {0}")]
    Protocol(String),

    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ClientError {
    /// `true` for failures where resending the same transfer can succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport(e) => e.is_retryable(),
            ClientError::Exhausted { .. } => true,
            ClientError::Remote { code, .. } => *code == ErrorCode::RateLimit,
            _ => false,
        }
    }
}
