//! Wire types and constants for the datalift transfer protocol.
//!
//! Everything that crosses the webhook boundary lives here: the request and
//! response envelopes, the action/error-code vocabulary, codec and strategy
//! enums, and the shared size/time constants the other crates agree on.

pub mod constants;
pub mod envelope;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{ErrorCode, TransferAction};
pub use envelope::{ErrorDetail, ResponseMetadata, TransferRequest, TransferResponse};
pub use types::{
    Codec, Compression, Efficiency, PerformanceMetrics, SessionState, SessionStatus, Strategy,
    TransferProfile,
};
