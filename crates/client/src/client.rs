use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use futures_util::stream;

use datalift_chunk::{Chunk, digest_hex, split};
use datalift_compress::{CompressionResult, compress};
use datalift_protocol::constants::{CHUNKED_MIN_BYTES, CHUNK_SEND_CONCURRENCY};
use datalift_protocol::envelope::{TransferRequest, TransferResponse};
use datalift_protocol::{Codec, Efficiency, PerformanceMetrics, Strategy};

use crate::ClientError;
use crate::options::TransferOptions;
use crate::outcome::{OutcomeSink, ProgressCallback, TransferOutcome, TransferReport};
use crate::retry::RetryPolicy;
use crate::strategy::classify;
use crate::transport::Transport;

/// End-to-end transfer orchestration. The only component callers interact
/// with directly.
pub struct TransferClient {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    sink: Option<OutcomeSink>,
    progress: Option<ProgressCallback>,
}

impl TransferClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            retry: RetryPolicy::default(),
            sink: None,
            progress: None,
        }
    }

    /// Replaces the retry policy used for every network call.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Attaches the analytics side-channel.
    pub fn with_outcome_sink(mut self, sink: OutcomeSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attaches a per-chunk progress callback.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Moves `payload` to the receiver and returns the result of `operation`
    /// applied to it.
    pub async fn send(
        &self,
        operation: &str,
        payload: &serde_json::Value,
        options: &TransferOptions,
    ) -> Result<TransferOutcome, ClientError> {
        if operation.is_empty() {
            return Err(ClientError::Validation("operation must not be empty".into()));
        }
        if options.max_chunk_size == Some(0) {
            return Err(ClientError::Validation(
                "max_chunk_size must be greater than zero".into(),
            ));
        }

        let serialized = serde_json::to_vec(payload)?;
        let strategy = classify(serialized.len(), options);
        let started = Instant::now();
        tracing::debug!(
            operation,
            bytes = serialized.len(),
            strategy = ?strategy,
            "starting transfer"
        );

        let outcome = match strategy {
            Strategy::Direct => self.send_direct(operation, payload, serialized.len(), options, started).await,
            Strategy::Compressed => {
                self.send_compressed(operation, serialized, options, started).await
            }
            Strategy::Chunked => match compress(serialized, options.profile, options.compression)
            {
                Ok(compressed) => {
                    self.send_chunked(operation, compressed, options, started).await
                }
                Err(e) => Err(e.into()),
            },
        };

        self.report(operation, strategy, &outcome);
        outcome
    }

    async fn send_direct(
        &self,
        operation: &str,
        payload: &serde_json::Value,
        serialized_len: usize,
        options: &TransferOptions,
        started: Instant,
    ) -> Result<TransferOutcome, ClientError> {
        let request = TransferRequest::direct(operation, payload)?;
        let (response, retries) = self.dispatch_with_retry(&request, options).await?;
        Ok(self.outcome(
            Strategy::Direct,
            Codec::None,
            None,
            response,
            metrics(started, 0.0, 0, serialized_len, retries),
        )?)
    }

    async fn send_compressed(
        &self,
        operation: &str,
        serialized: Vec<u8>,
        options: &TransferOptions,
        started: Instant,
    ) -> Result<TransferOutcome, ClientError> {
        let compressed = compress(serialized, options.profile, options.compression)?;

        // Strategy re-evaluation after compression is mandatory: the single
        // request carries the payload base64-encoded, and a body that would
        // still cross the chunking threshold must not be sent oversized.
        if base64_len(compressed.data.len()) >= CHUNKED_MIN_BYTES {
            tracing::debug!(
                encoded = base64_len(compressed.data.len()),
                "compressed payload still oversized, escalating to chunked"
            );
            return self.send_chunked(operation, compressed, options, started).await;
        }

        let original_size = compressed.original_size;
        let ratio = compressed.ratio();
        let request =
            TransferRequest::direct_encoded(operation, compressed.data, compressed.method);
        let (response, retries) = self.dispatch_with_retry(&request, options).await?;
        Ok(self.outcome(
            Strategy::Compressed,
            compressed.method,
            None,
            response,
            metrics(started, ratio, 0, original_size, retries),
        )?)
    }

    async fn send_chunked(
        &self,
        operation: &str,
        compressed: CompressionResult,
        options: &TransferOptions,
        started: Instant,
    ) -> Result<TransferOutcome, ClientError> {
        let chunks = split(&compressed.data, options.chunk_size())?;
        let total = chunks.len() as u32;
        let digest = digest_hex(&compressed.data);

        let init = TransferRequest::init_transfer(
            operation,
            total,
            compressed.method,
            digest,
            Some(options.session_ttl().as_secs()),
        );
        let (response, init_retries) = self.dispatch_with_retry(&init, options).await?;
        let session_id = response
            .session
            .map(|s| s.session_id)
            .ok_or_else(|| ClientError::Protocol("init response carried no session".into()))?;

        tracing::info!(
            session = %session_id,
            chunks = total,
            codec = %compressed.method,
            "chunked transfer started"
        );

        // Bounded fan-out; each chunk retries independently so one flaky
        // send never restarts the whole session.
        let mut sent = 0u32;
        let mut chunk_retries = 0u32;
        let mut sends = stream::iter(chunks.into_iter().map(|chunk| {
            let session_id = &session_id;
            async move { self.send_chunk(session_id, chunk, options).await }
        }))
        .buffer_unordered(CHUNK_SEND_CONCURRENCY);

        while let Some(result) = sends.next().await {
            chunk_retries += result?;
            sent += 1;
            if let Some(progress) = &self.progress {
                progress(sent, total);
            }
        }
        drop(sends);

        let finalize = TransferRequest::complete_transfer(&session_id);
        let (response, finalize_retries) = self.dispatch_with_retry(&finalize, options).await?;
        if response.result.is_none() {
            return Err(ClientError::Protocol(
                "finalize returned no result for a fully sent session".into(),
            ));
        }

        let retries = init_retries + chunk_retries + finalize_retries;
        Ok(self.outcome(
            Strategy::Chunked,
            compressed.method,
            Some(session_id),
            response,
            metrics(
                started,
                compressed.ratio(),
                total,
                compressed.original_size,
                retries,
            ),
        )?)
    }

    async fn send_chunk(
        &self,
        session_id: &str,
        chunk: Chunk,
        options: &TransferOptions,
    ) -> Result<u32, ClientError> {
        let request = TransferRequest::transfer_chunk(
            session_id,
            chunk.index,
            chunk.total_chunks,
            chunk.data,
            chunk.checksum,
        );
        let (_, retries) = self.dispatch_with_retry(&request, options).await?;
        Ok(retries)
    }

    /// Issues one request, retrying transient transport failures with
    /// exponential backoff. Returns the response and the number of retries
    /// it took.
    async fn dispatch_with_retry(
        &self,
        request: &TransferRequest,
        options: &TransferOptions,
    ) -> Result<(TransferResponse, u32), ClientError> {
        let max_retries = options.max_retries.unwrap_or(self.retry.max_retries);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.transport.dispatch(request.clone(), options.timeout).await {
                Ok(response) if response.success => return Ok((response, attempt - 1)),
                Ok(response) => {
                    // Structured rejection: terminal, the caller picks a
                    // remediation (smaller chunks, compression=none, ...).
                    let error = response.error.unwrap_or_else(|| {
                        datalift_protocol::ErrorDetail {
                            code: datalift_protocol::ErrorCode::System,
                            message: "endpoint reported failure without detail".into(),
                            troubleshooting: String::new(),
                        }
                    });
                    return Err(ClientError::Remote {
                        code: error.code,
                        message: error.message,
                        troubleshooting: error.troubleshooting,
                    });
                }
                Err(e) if e.is_retryable() && attempt <= max_retries => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        attempt,
                        max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_retryable() => {
                    return Err(ClientError::Exhausted {
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => return Err(ClientError::Transport(e)),
            }
        }
    }

    fn outcome(
        &self,
        strategy: Strategy,
        codec: Codec,
        session_id: Option<String>,
        response: TransferResponse,
        metrics: PerformanceMetrics,
    ) -> Result<TransferOutcome, ClientError> {
        let result = response
            .parse_result::<serde_json::Value>()?
            .unwrap_or(serde_json::Value::Null);
        Ok(TransferOutcome {
            strategy,
            codec,
            session_id,
            result,
            metrics,
        })
    }

    /// Non-blocking analytics push; a full or closed sink never affects the
    /// transfer result.
    fn report(
        &self,
        operation: &str,
        strategy: Strategy,
        outcome: &Result<TransferOutcome, ClientError>,
    ) {
        let Some(sink) = &self.sink else {
            return;
        };
        let report = match outcome {
            Ok(o) => TransferReport {
                operation: operation.to_string(),
                strategy: o.strategy,
                success: true,
                error: None,
                metrics: Some(o.metrics.clone()),
            },
            Err(e) => TransferReport {
                operation: operation.to_string(),
                strategy,
                success: false,
                error: Some(e.to_string()),
                metrics: None,
            },
        };
        if let Err(e) = sink.try_send(report) {
            tracing::trace!(error = %e, "outcome report dropped");
        }
    }
}

fn base64_len(raw: usize) -> usize {
    raw.div_ceil(3) * 4
}

fn metrics(
    started: Instant,
    ratio: f64,
    chunk_count: u32,
    original_size: usize,
    retries: u32,
) -> PerformanceMetrics {
    let elapsed = started.elapsed();
    let secs = elapsed.as_secs_f64();
    let throughput_mbps = if secs > 0.0 {
        original_size as f64 * 8.0 / 1_000_000.0 / secs
    } else {
        0.0
    };
    PerformanceMetrics {
        transfer_time_ms: elapsed.as_millis() as u64,
        compression_ratio: ratio,
        chunk_count,
        throughput_mbps,
        efficiency: Efficiency::grade(retries),
    }
}
