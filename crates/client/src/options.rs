use std::time::Duration;

use datalift_protocol::constants::DEFAULT_REQUEST_TIMEOUT;
use datalift_protocol::{Compression, TransferProfile};

/// Per-transfer configuration.
///
/// Everything has a sensible default; most callers only ever set
/// `compression` or `profile`.
#[derive(Debug, Clone)]
pub struct TransferOptions {
    pub compression: Compression,
    /// Chunk size in bytes of the (possibly compressed) payload. Defaults
    /// to the profile's size. Must be greater than zero when set.
    pub max_chunk_size: Option<usize>,
    /// Timeout applied to each individual network call.
    pub timeout: Duration,
    /// Retries per request after the first attempt. Defaults to the
    /// client's retry policy.
    pub max_retries: Option<u32>,
    /// Forces the chunked session path regardless of payload size.
    pub session_management: bool,
    pub profile: TransferProfile,
    /// Session idle TTL. Defaults to the profile's TTL.
    pub ttl: Option<Duration>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Auto,
            max_chunk_size: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: None,
            session_management: false,
            profile: TransferProfile::Default,
            ttl: None,
        }
    }
}

impl TransferOptions {
    /// Effective chunk size for this transfer.
    pub fn chunk_size(&self) -> usize {
        self.max_chunk_size.unwrap_or_else(|| self.profile.chunk_size())
    }

    /// Effective session TTL for this transfer.
    pub fn session_ttl(&self) -> Duration {
        self.ttl.unwrap_or_else(|| self.profile.session_ttl())
    }
}
