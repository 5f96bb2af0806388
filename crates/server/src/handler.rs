//! Handler trait for executing operations on transferred payloads.
//!
//! Implementors provide the domain logic behind each `operation` name
//! (search, analyze, ingest, ...) while the service owns decompression,
//! reassembly, and the response envelope.

use std::future::Future;
use std::pin::Pin;

/// A boxed future returned by handler methods.
pub type OperationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<serde_json::Value, OperationError>> + Send + 'a>>;

/// Errors an operation handler may report.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("operation failed: {0}")]
    Failed(String),
}

/// Executes the logical operation a transfer names, against its fully
/// decoded payload.
///
/// Handlers must be idempotent: a caller that timed out waiting for the
/// finalize response will legitimately retry it, and the service executes
/// the handler again on each successful finalize of a completed session.
pub trait OperationHandler: Send + Sync + 'static {
    fn execute(&self, operation: String, payload: serde_json::Value) -> OperationFuture<'_>;
}

/// Returns the payload unchanged. Default wiring for tests and loopback
/// deployments.
pub struct EchoHandler;

impl OperationHandler for EchoHandler {
    fn execute(&self, _operation: String, payload: serde_json::Value) -> OperationFuture<'_> {
        Box::pin(async move { Ok(payload) })
    }
}
