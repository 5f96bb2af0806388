use serde::{Deserialize, Serialize};

use crate::constants::{
    BATCH_CHUNK_SIZE, DEFAULT_CHUNK_SIZE, DEFAULT_SESSION_TTL, REALTIME_CHUNK_SIZE,
    REALTIME_SESSION_TTL,
};

/// A compression codec that was actually applied to a payload.
///
/// Wire names describe the format; the legacy spellings used by the original
/// JavaScript senders are accepted as aliases (`pako` produced zlib streams,
/// `lz-string` filled the fast/low-ratio role, `native` the platform
/// default).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Codec {
    /// zlib/deflate. Highest ratio; byte-compatible with pako streams.
    #[serde(rename = "deflate", alias = "pako")]
    Deflate,
    /// LZ4 block with prepended size. Fastest, lower ratio.
    #[serde(rename = "lz4", alias = "lz-string")]
    Lz4,
    /// zstd. Balanced default for the mid band.
    #[serde(rename = "zstd", alias = "native")]
    Zstd,
    /// No compression applied (or compression would not have helped).
    #[serde(rename = "none")]
    None,
}

impl Codec {
    /// The canonical wire name.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Codec::Deflate => "deflate",
            Codec::Lz4 => "lz4",
            Codec::Zstd => "zstd",
            Codec::None => "none",
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Caller-facing compression choice: a fixed codec or automatic selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compression {
    /// Pick a codec from payload size and transfer profile.
    #[serde(rename = "auto")]
    #[default]
    Auto,
    #[serde(rename = "deflate", alias = "pako")]
    Deflate,
    #[serde(rename = "lz4", alias = "lz-string")]
    Lz4,
    #[serde(rename = "zstd", alias = "native")]
    Zstd,
    #[serde(rename = "none")]
    None,
}

impl Compression {
    /// Returns the fixed codec, or `None` when the choice is `Auto`.
    pub fn fixed_codec(&self) -> Option<Codec> {
        match self {
            Compression::Auto => None,
            Compression::Deflate => Some(Codec::Deflate),
            Compression::Lz4 => Some(Codec::Lz4),
            Compression::Zstd => Some(Codec::Zstd),
            Compression::None => Some(Codec::None),
        }
    }

    pub(crate) fn is_auto(&self) -> bool {
        matches!(self, Compression::Auto)
    }
}

impl From<Codec> for Compression {
    fn from(codec: Codec) -> Self {
        match codec {
            Codec::Deflate => Compression::Deflate,
            Codec::Lz4 => Compression::Lz4,
            Codec::Zstd => Compression::Zstd,
            Codec::None => Compression::None,
        }
    }
}

/// Transfer path chosen for a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    #[serde(rename = "direct")]
    Direct,
    #[serde(rename = "compressed")]
    Compressed,
    #[serde(rename = "chunked")]
    Chunked,
}

/// Latency/throughput profile of a transfer.
///
/// The profile tunes the auto codec choice, the default chunk size, and the
/// session TTL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferProfile {
    #[serde(rename = "default")]
    #[default]
    Default,
    #[serde(rename = "realtime")]
    Realtime,
    #[serde(rename = "batch")]
    Batch,
}

impl TransferProfile {
    /// Default chunk size for this profile, in payload bytes.
    pub fn chunk_size(&self) -> usize {
        match self {
            TransferProfile::Default => DEFAULT_CHUNK_SIZE,
            TransferProfile::Realtime => REALTIME_CHUNK_SIZE,
            TransferProfile::Batch => BATCH_CHUNK_SIZE,
        }
    }

    /// Default session TTL for this profile.
    pub fn session_ttl(&self) -> std::time::Duration {
        match self {
            TransferProfile::Realtime => REALTIME_SESSION_TTL,
            _ => DEFAULT_SESSION_TTL,
        }
    }
}

/// Current state of a transfer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "receiving")]
    Receiving,
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "expired")]
    Expired,
}

impl SessionState {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Complete | SessionState::Error | SessionState::Expired
        )
    }
}

/// Read-only snapshot of a session, reported in responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: String,
    pub state: SessionState,
    pub received_chunks: u32,
    pub expected_chunks: u32,
}

/// Qualitative grade of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Efficiency {
    #[serde(rename = "excellent")]
    Excellent,
    #[serde(rename = "good")]
    Good,
    #[serde(rename = "needs_optimization")]
    NeedsOptimization,
}

impl Efficiency {
    /// Grades a transfer by retry pressure: clean transfers are excellent,
    /// transfers that recovered within two retries are good, anything
    /// noisier needs a smaller chunk size or a different codec.
    pub fn grade(retries: u32) -> Self {
        match retries {
            0 => Efficiency::Excellent,
            1..=2 => Efficiency::Good,
            _ => Efficiency::NeedsOptimization,
        }
    }
}

/// Derived reporting attached to a completed transfer. Computed once at
/// completion, never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub transfer_time_ms: u64,
    /// `1 - compressed/original`, 0 when no compression was applied.
    pub compression_ratio: f64,
    /// Number of chunks sent (0 for direct/compressed transfers).
    pub chunk_count: u32,
    pub throughput_mbps: f64,
    pub efficiency: Efficiency,
}
