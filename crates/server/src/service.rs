use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use datalift_compress::CompressError;
use datalift_protocol::constants::{ErrorCode, TransferAction};
use datalift_protocol::envelope::{ResponseMetadata, TransferRequest, TransferResponse};
use datalift_protocol::{Codec, SessionStatus};
use datalift_session::{SessionError, SessionManager, SessionMeta, SessionPoll};

use crate::handler::{OperationError, OperationHandler};

/// Request-processing failure, mapped onto the wire error taxonomy before
/// it leaves the service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Compress(#[from] CompressError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transfer failed: {0}")]
    Assembly(String),
}

impl ServiceError {
    fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Validation(_) | ServiceError::Json(_) => ErrorCode::Validation,
            ServiceError::Session(e) => match e {
                SessionError::InvalidArgument(_)
                | SessionError::ChunkOutOfRange { .. }
                | SessionError::ChunkTotalMismatch { .. } => ErrorCode::Validation,
                _ => ErrorCode::DataTransfer,
            },
            ServiceError::Compress(_) | ServiceError::Assembly(_) => ErrorCode::DataTransfer,
            ServiceError::Operation(e) => match e {
                OperationError::Unsupported(_) => ErrorCode::Validation,
                OperationError::Failed(_) => ErrorCode::System,
            },
        }
    }
}

/// The transfer endpoint's request processor.
///
/// Owns a [`SessionManager`] and an [`OperationHandler`]; the hosting
/// webhook surface only parses the transport and calls [`handle`].
///
/// [`handle`]: TransferService::handle
pub struct TransferService {
    sessions: Arc<SessionManager>,
    handler: Arc<dyn OperationHandler>,
}

impl TransferService {
    /// Creates a service over a fresh in-memory session manager.
    pub fn new(handler: Arc<dyn OperationHandler>) -> Self {
        Self::with_sessions(handler, Arc::new(SessionManager::new()))
    }

    /// Creates a service sharing an existing session manager (so the host
    /// can run the sweep and expose monitoring from the same instance).
    pub fn with_sessions(handler: Arc<dyn OperationHandler>, sessions: Arc<SessionManager>) -> Self {
        Self { sessions, handler }
    }

    /// The session manager backing this service.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Processes one request. Infallible at the signature level: every
    /// error becomes an error envelope.
    pub async fn handle(&self, request: TransferRequest) -> TransferResponse {
        let request_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        tracing::debug!(request_id = %request_id, action = ?request.action, "transfer request");

        let outcome = match request.action {
            TransferAction::Direct => self.handle_direct(&request_id, request, started).await,
            TransferAction::InitTransfer => self.handle_init(&request_id, request),
            TransferAction::TransferChunk => self.handle_chunk(&request_id, request),
            TransferAction::CompleteTransfer => {
                self.handle_complete(&request_id, request, started).await
            }
            TransferAction::Unknown => Err(ServiceError::Validation(
                "unknown action; expected direct, init_transfer, transfer_chunk or complete_transfer"
                    .to_string(),
            )),
        };

        outcome.unwrap_or_else(|e| {
            tracing::warn!(request_id = %request_id, error = %e, "transfer request failed");
            TransferResponse::failure(request_id, e.code(), e.to_string())
        })
    }

    async fn handle_direct(
        &self,
        request_id: &str,
        request: TransferRequest,
        started: Instant,
    ) -> Result<TransferResponse, ServiceError> {
        if request.operation.is_empty() {
            return Err(ServiceError::Validation("operation is required".into()));
        }

        let (payload, ratio) = if let Some(raw) = &request.payload {
            (serde_json::from_str(raw.get())?, 0.0)
        } else if !request.data.is_empty() {
            let codec = request.compression.fixed_codec().ok_or_else(|| {
                ServiceError::Validation(
                    "encoded direct requests must name the codec, not auto".into(),
                )
            })?;
            let decoded = datalift_compress::decode(&request.data, codec)?;
            let ratio = compression_ratio(request.data.len(), decoded.len());
            (serde_json::from_slice(&decoded)?, ratio)
        } else {
            return Err(ServiceError::Validation(
                "either payload or data is required".into(),
            ));
        };

        let result = self.handler.execute(request.operation, payload).await?;
        let raw = serde_json::value::RawValue::from_string(serde_json::to_string(&result)?)?;
        Ok(TransferResponse::ok(
            request_id,
            Some(raw),
            Some(metadata(started, ratio, None)),
        ))
    }

    fn handle_init(
        &self,
        request_id: &str,
        request: TransferRequest,
    ) -> Result<TransferResponse, ServiceError> {
        if request.operation.is_empty() {
            return Err(ServiceError::Validation("operation is required".into()));
        }
        let total_chunks = request
            .total_chunks
            .ok_or_else(|| ServiceError::Validation("total_chunks is required".into()))?;
        let codec = request.compression.fixed_codec().ok_or_else(|| {
            ServiceError::Validation("init must declare the payload codec, not auto".into())
        })?;

        let session_id = self.sessions.create_session(
            total_chunks,
            request.ttl_seconds.map(Duration::from_secs),
            SessionMeta {
                operation: request.operation,
                compression: Some(codec),
                digest: request.digest,
            },
        )?;

        Ok(TransferResponse::ok(request_id, None, None).with_session(SessionStatus {
            session_id,
            state: datalift_protocol::SessionState::Created,
            received_chunks: 0,
            expected_chunks: total_chunks,
        }))
    }

    fn handle_chunk(
        &self,
        request_id: &str,
        request: TransferRequest,
    ) -> Result<TransferResponse, ServiceError> {
        if request.session_id.is_empty() {
            return Err(ServiceError::Validation("session_id is required".into()));
        }
        let index = request
            .chunk_index
            .ok_or_else(|| ServiceError::Validation("chunk_index is required".into()))?;
        let total_chunks = request
            .total_chunks
            .ok_or_else(|| ServiceError::Validation("total_chunks is required".into()))?;

        // Senders that omit the checksum forgo in-transit corruption
        // detection for this chunk.
        let checksum = request
            .checksum
            .unwrap_or_else(|| datalift_chunk::checksum(&request.data));

        let ack = self.sessions.add_chunk(
            &request.session_id,
            datalift_chunk::Chunk {
                index,
                total_chunks,
                data: request.data,
                checksum,
            },
        )?;

        Ok(
            TransferResponse::ok(request_id, None, None).with_session(SessionStatus {
                session_id: request.session_id,
                state: ack.state,
                received_chunks: ack.received,
                expected_chunks: ack.expected,
            }),
        )
    }

    async fn handle_complete(
        &self,
        request_id: &str,
        request: TransferRequest,
        started: Instant,
    ) -> Result<TransferResponse, ServiceError> {
        if request.session_id.is_empty() {
            return Err(ServiceError::Validation("session_id is required".into()));
        }

        match self.sessions.get_result(&request.session_id)? {
            SessionPoll::Pending { .. } => {
                let status = self.sessions.status(&request.session_id)?;
                Ok(TransferResponse::ok(request_id, None, None).with_session(status))
            }
            SessionPoll::Failed(reason) => Err(ServiceError::Assembly(reason)),
            SessionPoll::Complete(assembled) => {
                let meta = self.sessions.meta(&request.session_id)?;
                let codec = meta.compression.unwrap_or(Codec::None);
                let decoded = datalift_compress::decode(&assembled, codec)?;
                let ratio = compression_ratio(assembled.len(), decoded.len());
                let payload = serde_json::from_slice(&decoded)?;

                let result = self.handler.execute(meta.operation, payload).await?;
                let raw =
                    serde_json::value::RawValue::from_string(serde_json::to_string(&result)?)?;
                let status = self.sessions.status(&request.session_id)?;
                Ok(TransferResponse::ok(
                    request_id,
                    Some(raw),
                    Some(metadata(started, ratio, Some(status.expected_chunks))),
                )
                .with_session(status))
            }
        }
    }
}

fn metadata(started: Instant, ratio: f64, chunk_count: Option<u32>) -> ResponseMetadata {
    ResponseMetadata {
        processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        compression_ratio: ratio,
        chunk_count,
    }
}

fn compression_ratio(compressed: usize, original: usize) -> f64 {
    if original == 0 || compressed >= original {
        return 0.0;
    }
    1.0 - compressed as f64 / original as f64
}
