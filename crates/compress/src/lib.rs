//! Compression engine for transfer payloads.
//!
//! Codec selection is a pure function of payload size, transfer profile, and
//! the caller's explicit choice. Whatever codec is attempted, the result is
//! only kept if it actually shrinks the payload; otherwise the engine falls
//! back to [`Codec::None`] so the reported ratio is never negative.

mod engine;

pub use engine::{CompressionResult, compress, decode, encode, select_codec};

use datalift_protocol::Codec;

/// Errors produced by the compression engine.
///
/// Failures always name the attempted codec so the caller can decide to
/// resend with `compression=none`.
#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("{codec} encoding failed: {message}")]
    Encode { codec: Codec, message: String },

    #[error("{codec} decoding failed: {message}")]
    Decode { codec: Codec, message: String },
}

impl CompressError {
    /// The codec that was being applied when the failure happened.
    pub fn codec(&self) -> Codec {
        match self {
            CompressError::Encode { codec, .. } | CompressError::Decode { codec, .. } => *codec,
        }
    }
}
