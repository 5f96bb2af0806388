//! End-to-end tests: the real client against the real service, wired
//! through an in-process transport.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use datalift_client::{
    ClientError, HttpTransport, TransferClient, TransferOptions, Transport, TransportError,
    TransportFuture,
};
use datalift_client::RetryPolicy;
use datalift_protocol::envelope::TransferRequest;
use datalift_protocol::{Codec, Compression, Efficiency, Strategy, TransferAction};
use datalift_server::{EchoHandler, TransferService};

/// Dispatches requests straight into a [`TransferService`], no sockets.
struct LocalTransport {
    service: Arc<TransferService>,
}

impl LocalTransport {
    fn new() -> Self {
        Self {
            service: Arc::new(TransferService::new(Arc::new(EchoHandler))),
        }
    }
}

impl Transport for LocalTransport {
    fn dispatch(&self, request: TransferRequest, _timeout: Duration) -> TransportFuture<'_> {
        Box::pin(async move { Ok(self.service.handle(request).await) })
    }
}

/// Fails the first dispatch of every chunk index with a retryable error,
/// then lets it through. Init and finalize always pass.
struct ChunkDroppingTransport {
    inner: LocalTransport,
    dropped: Mutex<HashSet<u32>>,
}

impl ChunkDroppingTransport {
    fn new() -> Self {
        Self {
            inner: LocalTransport::new(),
            dropped: Mutex::new(HashSet::new()),
        }
    }
}

impl Transport for ChunkDroppingTransport {
    fn dispatch(&self, request: TransferRequest, timeout: Duration) -> TransportFuture<'_> {
        Box::pin(async move {
            if request.action == TransferAction::TransferChunk {
                let index = request.chunk_index.unwrap_or(0);
                let mut dropped = self.dropped.lock().unwrap();
                if dropped.insert(index) {
                    return Err(TransportError::Network(format!(
                        "simulated drop of chunk {index}"
                    )));
                }
            }
            self.inner.dispatch(request, timeout).await
        })
    }
}

fn client() -> TransferClient {
    TransferClient::new(Arc::new(LocalTransport::new()))
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        backoff_factor: 2.0,
    }
}

/// Deterministic high-entropy text (64-symbol alphabet), so explicit
/// `compression=none` payloads have a size we fully control.
fn noisy_text(len: usize) -> String {
    const ALPHABET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut state = 0x2545F491_u64;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ALPHABET[(state >> 33) as usize % 64] as char
        })
        .collect()
}

fn record_array(count: usize) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            serde_json::json!({
                "id": i,
                "name": format!("record-{i}"),
                "kind": "fixture",
                "tags": ["alpha", "beta", "gamma"],
                "notes": "synthetic row for transfer coverage",
            })
        })
        .collect();
    serde_json::json!(rows)
}

#[tokio::test]
async fn small_payload_goes_direct() {
    let payload = serde_json::json!({"query": "status", "fields": ["a", "b"], "limit": 10});
    let outcome = client()
        .send("search", &payload, &TransferOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.strategy, Strategy::Direct);
    assert_eq!(outcome.codec, Codec::None);
    assert_eq!(outcome.result, payload);
    assert!(outcome.session_id.is_none());
    assert_eq!(outcome.metrics.compression_ratio, 0.0);
    assert_eq!(outcome.metrics.chunk_count, 0);
    assert_eq!(outcome.metrics.efficiency, Efficiency::Excellent);
}

#[tokio::test]
async fn empty_payload_still_round_trips() {
    let payload = serde_json::Value::Null;
    let outcome = client()
        .send("noop", &payload, &TransferOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.strategy, Strategy::Direct);
    assert_eq!(outcome.result, serde_json::Value::Null);
}

#[tokio::test]
async fn mid_payload_goes_compressed() {
    // ~50 KB of text compresses well under any codec.
    let payload = serde_json::json!({
        "document": "transfer protocol fixture text. ".repeat(1600),
    });
    let outcome = client()
        .send("analyze", &payload, &TransferOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.strategy, Strategy::Compressed);
    assert_ne!(outcome.codec, Codec::None);
    assert!(outcome.metrics.compression_ratio > 0.0);
    assert!(outcome.metrics.compression_ratio < 1.0);
    assert_eq!(outcome.result, payload);
}

#[tokio::test]
async fn large_payload_goes_chunked() {
    // ~2 MB serialized.
    let payload = record_array(14_000);
    assert!(serde_json::to_vec(&payload).unwrap().len() >= 1_000_000);

    let outcome = client()
        .send("ingest", &payload, &TransferOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.strategy, Strategy::Chunked);
    assert!(outcome.session_id.is_some());
    assert!(outcome.metrics.chunk_count > 0);
    assert!(outcome.metrics.compression_ratio > 0.5);
    assert_eq!(outcome.result, payload);
}

#[tokio::test]
async fn forced_session_management_chunks_small_payloads() {
    let payload = serde_json::json!({"tiny": true});
    let options = TransferOptions {
        session_management: true,
        ..Default::default()
    };
    let outcome = client().send("ingest", &payload, &options).await.unwrap();
    assert_eq!(outcome.strategy, Strategy::Chunked);
    assert!(outcome.session_id.is_some());
    assert_eq!(outcome.metrics.chunk_count, 1);
    assert_eq!(outcome.result, payload);
}

#[tokio::test]
async fn oversized_compressed_payload_escalates_to_chunked() {
    // 900 KB classifies as Compressed, but with compression=none its
    // base64-encoded body would cross the chunking threshold, so the client
    // must re-route instead of sending one oversized request.
    let payload = serde_json::json!(noisy_text(900_000));
    let options = TransferOptions {
        compression: Compression::None,
        ..Default::default()
    };
    let outcome = client().send("ingest", &payload, &options).await.unwrap();

    assert_eq!(outcome.strategy, Strategy::Chunked);
    assert_eq!(outcome.codec, Codec::None);
    assert!(outcome.session_id.is_some());
    assert!(outcome.metrics.chunk_count > 100);
    assert_eq!(outcome.result, payload);
}

#[tokio::test]
async fn chunk_failures_retry_individually() {
    let transport = Arc::new(ChunkDroppingTransport::new());
    let client = TransferClient::new(transport).with_retry_policy(fast_retry());

    let payload = record_array(14_000);
    let outcome = client
        .send("ingest", &payload, &TransferOptions::default())
        .await
        .unwrap();

    // Every chunk was dropped once and resent; the session still completed
    // without restarting.
    assert_eq!(outcome.strategy, Strategy::Chunked);
    assert_eq!(outcome.result, payload);
    assert!(outcome.metrics.chunk_count > 2);
    assert_eq!(outcome.metrics.efficiency, Efficiency::NeedsOptimization);
}

#[tokio::test]
async fn progress_and_outcome_sink_observe_the_transfer() {
    let (tx, mut rx) = tokio::sync::mpsc::channel(4);
    let ticks = Arc::new(AtomicU32::new(0));
    let ticks_cb = Arc::clone(&ticks);

    let client = TransferClient::new(Arc::new(LocalTransport::new()))
        .with_outcome_sink(tx)
        .with_progress(Box::new(move |sent, total| {
            assert!(sent <= total);
            ticks_cb.fetch_add(1, Ordering::SeqCst);
        }));

    let payload = record_array(14_000);
    let outcome = client
        .send("ingest", &payload, &TransferOptions::default())
        .await
        .unwrap();

    assert_eq!(ticks.load(Ordering::SeqCst), outcome.metrics.chunk_count);

    let report = rx.try_recv().expect("one report per transfer");
    assert!(report.success);
    assert_eq!(report.operation, "ingest");
    assert_eq!(report.strategy, Strategy::Chunked);
    assert_eq!(
        report.metrics.unwrap().chunk_count,
        outcome.metrics.chunk_count
    );
}

#[tokio::test]
async fn failed_transfer_reports_error_to_sink() {
    struct DeadTransport;
    impl Transport for DeadTransport {
        fn dispatch(&self, _request: TransferRequest, timeout: Duration) -> TransportFuture<'_> {
            Box::pin(async move { Err(TransportError::Timeout(timeout)) })
        }
    }

    let (tx, mut rx) = tokio::sync::mpsc::channel(4);
    let client = TransferClient::new(Arc::new(DeadTransport))
        .with_retry_policy(fast_retry())
        .with_outcome_sink(tx);

    let err = client
        .send("ping", &serde_json::json!(1), &TransferOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Exhausted { attempts: 4, .. }));

    let report = rx.try_recv().unwrap();
    assert!(!report.success);
    assert!(report.error.unwrap().contains("4 attempts"));
}

#[tokio::test]
async fn realtime_profile_tunes_chunking_and_codec() {
    let payload = record_array(14_000);
    let options = TransferOptions {
        profile: datalift_protocol::TransferProfile::Realtime,
        ..Default::default()
    };
    let outcome = client().send("ingest", &payload, &options).await.unwrap();
    assert_eq!(outcome.strategy, Strategy::Chunked);
    assert_eq!(outcome.codec, Codec::Lz4);
    assert_eq!(outcome.result, payload);
}

#[test]
fn http_transport_is_constructible_for_webhook_endpoints() {
    // Compile-time shape check; network behavior is the host's concern.
    let transport =
        HttpTransport::new("https://hooks.example.test/transfer").with_api_key("key");
    let _client = TransferClient::new(Arc::new(transport));
}
