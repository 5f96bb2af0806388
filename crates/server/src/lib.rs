//! Server side of the transfer protocol.
//!
//! [`TransferService`] parses and validates transfer requests, routes them
//! onto the compression engine, chunk codec, and session manager, and
//! executes the caller-opaque `operation` through an [`OperationHandler`].
//! Every request gets a structured JSON envelope back — including every
//! failure path — so callers never see a bare panic or stack trace.

mod handler;
mod service;

pub use handler::{EchoHandler, OperationError, OperationFuture, OperationHandler};
pub use service::{ServiceError, TransferService};
