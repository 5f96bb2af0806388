use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Payloads strictly below this serialized size are sent as-is in a single
/// request; compression overhead is not worth it under this threshold.
pub const DIRECT_MAX_BYTES: usize = 8_000;

/// Payloads at or above this serialized size always go through the chunked
/// session path.
pub const CHUNKED_MIN_BYTES: usize = 1_000_000;

/// Below this size, `auto` compression prefers LZ4 (speed over ratio).
pub const LZ4_AUTO_MAX_BYTES: usize = 50_000;

/// Default chunk size in bytes of the (possibly compressed) payload.
pub const DEFAULT_CHUNK_SIZE: usize = 6_000;

/// Chunk size for the real-time profile (smaller requests, lower latency).
pub const REALTIME_CHUNK_SIZE: usize = 4_000;

/// Chunk size for the batch profile (fewer, larger requests).
pub const BATCH_CHUNK_SIZE: usize = 8_000;

/// Default idle time-to-live for a transfer session.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Session TTL for the real-time profile.
///
/// Real-time payloads are worthless after a few minutes; holding their
/// chunks for a full hour only delays memory reclamation.
pub const REALTIME_SESSION_TTL: Duration = Duration::from_secs(900);

/// Per-request timeout (direct sends, init, each chunk, finalize).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of retries after the first failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay before the first retry.
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Backoff cap: no retry waits longer than this.
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Delay multiplier per subsequent retry.
pub const RETRY_BACKOFF_FACTOR: f64 = 2.0;

/// How many chunk sends the client keeps in flight at once.
pub const CHUNK_SEND_CONCURRENCY: usize = 3;

/// How often the background sweep looks for expired sessions.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Action selector for a transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferAction {
    /// One-shot request carrying the whole (possibly compressed) payload.
    #[serde(rename = "direct")]
    Direct,
    /// Opens a chunked session; returns the session id.
    #[serde(rename = "init_transfer")]
    InitTransfer,
    /// Delivers one chunk of an open session.
    #[serde(rename = "transfer_chunk")]
    TransferChunk,
    /// Fetches the assembled result (or pending/error status).
    #[serde(rename = "complete_transfer")]
    CompleteTransfer,
    /// Forward compatibility: unknown actions deserialize here.
    #[serde(other)]
    Unknown,
}

/// Error taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Malformed request: missing operation, bad chunk fields, etc.
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    /// Transfer-level failure: unknown session, expired session,
    /// missing chunks, checksum or codec mismatch.
    #[serde(rename = "DATA_TRANSFER_ERROR")]
    DataTransfer,
    /// The host throttled the request.
    #[serde(rename = "RATE_LIMIT_ERROR")]
    RateLimit,
    /// Unexpected internal failure.
    #[serde(rename = "SYSTEM_ERROR")]
    System,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ErrorCode::Validation => "VALIDATION_ERROR",
            ErrorCode::DataTransfer => "DATA_TRANSFER_ERROR",
            ErrorCode::RateLimit => "RATE_LIMIT_ERROR",
            ErrorCode::System => "SYSTEM_ERROR",
        })
    }
}

impl ErrorCode {
    /// Default troubleshooting hint attached to error responses.
    pub fn troubleshooting(&self) -> &'static str {
        match self {
            ErrorCode::Validation => {
                "Check the request fields: operation, chunk_index/total_chunks, and data encoding."
            }
            ErrorCode::DataTransfer => {
                "Restart the transfer; for repeated failures retry with a smaller chunk size or compression=none."
            }
            ErrorCode::RateLimit => "Back off and retry after the indicated delay.",
            ErrorCode::System => "Retry later; if the problem persists contact the operator.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serialization() {
        assert_eq!(
            serde_json::to_string(&TransferAction::InitTransfer).unwrap(),
            "\"init_transfer\""
        );
        assert_eq!(
            serde_json::to_string(&TransferAction::TransferChunk).unwrap(),
            "\"transfer_chunk\""
        );
    }

    #[test]
    fn unknown_action_deserializes() {
        let a: TransferAction = serde_json::from_str("\"some_future_action\"").unwrap();
        assert_eq!(a, TransferAction::Unknown);
    }

    #[test]
    fn error_code_wire_names() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::Validation).unwrap(),
            "\"VALIDATION_ERROR\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::DataTransfer).unwrap(),
            "\"DATA_TRANSFER_ERROR\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::RateLimit).unwrap(),
            "\"RATE_LIMIT_ERROR\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::System).unwrap(),
            "\"SYSTEM_ERROR\""
        );
    }

    #[test]
    fn every_code_has_a_hint() {
        for code in [
            ErrorCode::Validation,
            ErrorCode::DataTransfer,
            ErrorCode::RateLimit,
            ErrorCode::System,
        ] {
            assert!(!code.troubleshooting().is_empty());
        }
    }
}
