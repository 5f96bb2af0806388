use datalift_protocol::{Codec, PerformanceMetrics, Strategy};
use serde::Serialize;

/// Result of a completed transfer.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// Strategy actually executed (after any escalation).
    pub strategy: Strategy,
    /// Codec the payload actually traveled with.
    pub codec: Codec,
    /// Session id for chunked transfers.
    pub session_id: Option<String>,
    /// The receiver's operation result.
    pub result: serde_json::Value,
    pub metrics: PerformanceMetrics,
}

/// Fire-and-forget report emitted after each terminal outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReport {
    pub operation: String,
    pub strategy: Strategy,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<PerformanceMetrics>,
}

/// Analytics side-channel. Reports are pushed with `try_send`; a full or
/// closed channel is dropped silently and never affects the transfer's own
/// result.
pub type OutcomeSink = tokio::sync::mpsc::Sender<TransferReport>;

/// Per-chunk progress notification: `(chunks_sent, total_chunks)`.
pub type ProgressCallback = Box<dyn Fn(u32, u32) + Send + Sync>;
