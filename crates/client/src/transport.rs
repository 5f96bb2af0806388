use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use datalift_protocol::envelope::{TransferRequest, TransferResponse};

/// Network-level failures, distinct from protocol-level error envelopes.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("rate limited by the endpoint")]
    RateLimited,

    #[error("invalid response body: {0}")]
    Body(String),
}

impl TransportError {
    /// `true` for failures where the same request may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout(_)
            | TransportError::Network(_)
            | TransportError::RateLimited => true,
            TransportError::Status(code) => *code >= 500,
            TransportError::Body(_) => false,
        }
    }
}

/// A boxed future returned by transport dispatch.
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<TransferResponse, TransportError>> + Send + 'a>>;

/// One stateless request/response exchange with the transfer endpoint.
///
/// Implementations carry no per-transfer state; every call stands alone so
/// chunk sends can fan out and retry independently.
pub trait Transport: Send + Sync + 'static {
    fn dispatch(&self, request: TransferRequest, timeout: Duration) -> TransportFuture<'_>;
}

/// Webhook transport: POSTs the request as JSON to a fixed endpoint URL.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpTransport {
    /// Creates a transport against the given endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: String::new(),
        }
    }

    /// Attaches an API key, forwarded on every request. Authentication
    /// itself is the endpoint's concern.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Uses a preconfigured reqwest client (custom TLS, proxies, pools).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

impl Transport for HttpTransport {
    fn dispatch(&self, mut request: TransferRequest, timeout: Duration) -> TransportFuture<'_> {
        Box::pin(async move {
            if request.api_key.is_empty() {
                request.api_key = self.api_key.clone();
            }

            let response = self
                .client
                .post(&self.endpoint)
                .timeout(timeout)
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        TransportError::Timeout(timeout)
                    } else {
                        TransportError::Network(e.to_string())
                    }
                })?;

            let status = response.status();
            if status.as_u16() == 429 {
                return Err(TransportError::RateLimited);
            }
            if status.is_server_error() {
                return Err(TransportError::Status(status.as_u16()));
            }
            // Client errors still carry a structured error envelope; let
            // the body parse decide.
            response
                .json::<TransferResponse>()
                .await
                .map_err(|e| TransportError::Body(e.to_string()))
        })
    }
}
