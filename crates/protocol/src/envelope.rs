use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{ErrorCode, TransferAction};
use crate::types::{Codec, Compression, SessionStatus};

/// Serde adapter for binary fields carried as base64 strings in JSON.
pub mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// A request against the transfer endpoint.
///
/// Field names are the endpoint's query-parameter names, so the same struct
/// serializes for both JSON bodies and form-style transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub action: TransferAction,
    /// Logical action the receiver performs with the payload. Opaque to the
    /// transfer layer.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub operation: String,
    /// Raw JSON payload for uncompressed direct sends. Deferred parsing,
    /// the transfer layer never looks inside.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<serde_json::value::RawValue>>,
    /// Encoded bytes: the compressed payload (direct) or one chunk fragment.
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Compression::is_auto")]
    pub compression: Compression,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<u32>,
    /// CRC32 of `data`, present on chunk requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<u32>,
    /// SHA-256 hex digest of the whole (possibly compressed) payload,
    /// optionally declared at init and re-verified after reassembly.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub digest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,
    /// Forwarded opaquely; authentication is the host's concern.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
}

impl TransferRequest {
    fn base(action: TransferAction) -> Self {
        Self {
            action,
            operation: String::new(),
            payload: None,
            data: Vec::new(),
            compression: Compression::Auto,
            session_id: String::new(),
            chunk_index: None,
            total_chunks: None,
            checksum: None,
            digest: String::new(),
            ttl_seconds: None,
            api_key: String::new(),
        }
    }

    /// One-shot request with a raw JSON payload.
    pub fn direct(
        operation: impl Into<String>,
        payload: &impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(payload)?;
        let mut req = Self::base(TransferAction::Direct);
        req.operation = operation.into();
        req.payload = Some(serde_json::value::RawValue::from_string(json)?);
        req.compression = Compression::None;
        Ok(req)
    }

    /// One-shot request carrying an encoded (compressed) payload.
    pub fn direct_encoded(operation: impl Into<String>, data: Vec<u8>, codec: Codec) -> Self {
        let mut req = Self::base(TransferAction::Direct);
        req.operation = operation.into();
        req.data = data;
        req.compression = codec.into();
        req
    }

    /// Opens a chunked session.
    pub fn init_transfer(
        operation: impl Into<String>,
        total_chunks: u32,
        codec: Codec,
        digest: impl Into<String>,
        ttl_seconds: Option<u64>,
    ) -> Self {
        let mut req = Self::base(TransferAction::InitTransfer);
        req.operation = operation.into();
        req.total_chunks = Some(total_chunks);
        req.compression = codec.into();
        req.digest = digest.into();
        req.ttl_seconds = ttl_seconds;
        req
    }

    /// Delivers one chunk of an open session.
    pub fn transfer_chunk(
        session_id: impl Into<String>,
        chunk_index: u32,
        total_chunks: u32,
        data: Vec<u8>,
        checksum: u32,
    ) -> Self {
        let mut req = Self::base(TransferAction::TransferChunk);
        req.session_id = session_id.into();
        req.chunk_index = Some(chunk_index);
        req.total_chunks = Some(total_chunks);
        req.data = data;
        req.checksum = Some(checksum);
        req
    }

    /// Fetches the assembled result of a session.
    pub fn complete_transfer(session_id: impl Into<String>) -> Self {
        let mut req = Self::base(TransferAction::CompleteTransfer);
        req.session_id = session_id.into();
        req
    }
}

/// Timing and compression figures attached to successful responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub processing_time_ms: f64,
    /// `1 - compressed/original` of the request payload, 0 when uncompressed.
    pub compression_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<u32>,
}

/// Error details in a response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
    pub troubleshooting: String,
}

/// Envelope for every transfer-endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub success: bool,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    /// Result of the receiver's operation. Opaque to the transfer layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<serde_json::value::RawValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl TransferResponse {
    /// Successful response, optionally carrying a result and metadata.
    pub fn ok(
        request_id: impl Into<String>,
        result: Option<Box<serde_json::value::RawValue>>,
        metadata: Option<ResponseMetadata>,
    ) -> Self {
        Self {
            success: true,
            request_id: request_id.into(),
            timestamp: Utc::now(),
            result,
            session: None,
            metadata,
            error: None,
        }
    }

    /// Failure response with the code's default troubleshooting hint.
    pub fn failure(
        request_id: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            request_id: request_id.into(),
            timestamp: Utc::now(),
            result: None,
            session: None,
            metadata: None,
            error: Some(ErrorDetail {
                code,
                message: message.into(),
                troubleshooting: code.troubleshooting().to_string(),
            }),
        }
    }

    /// Attaches a session status snapshot.
    pub fn with_session(mut self, session: SessionStatus) -> Self {
        self.session = Some(session);
        self
    }

    /// Deserializes the result into the given type.
    pub fn parse_result<T: for<'de> Deserialize<'de>>(
        &self,
    ) -> Result<Option<T>, serde_json::Error> {
        match &self.result {
            Some(raw) => Ok(Some(serde_json::from_str(raw.get())?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionState;

    #[test]
    fn direct_request_roundtrip() {
        let payload = serde_json::json!({"query": "status", "limit": 5});
        let req = TransferRequest::direct("search", &payload).unwrap();
        let json = serde_json::to_string(&req).unwrap();
        let parsed: TransferRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.action, TransferAction::Direct);
        assert_eq!(parsed.operation, "search");
        let body: serde_json::Value =
            serde_json::from_str(parsed.payload.unwrap().get()).unwrap();
        assert_eq!(body["limit"], 5);
    }

    #[test]
    fn chunk_request_base64_data() {
        let req = TransferRequest::transfer_chunk("s-1", 2, 5, vec![1, 2, 3, 255], 0xDEAD);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"data\":\"AQID/w==\""), "{json}");
        let parsed: TransferRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.data, vec![1, 2, 3, 255]);
        assert_eq!(parsed.chunk_index, Some(2));
        assert_eq!(parsed.total_chunks, Some(5));
        assert_eq!(parsed.checksum, Some(0xDEAD));
    }

    #[test]
    fn request_omits_empty_fields() {
        let req = TransferRequest::complete_transfer("s-9");
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("operation"));
        assert!(!json.contains("data"));
        assert!(!json.contains("compression"));
        assert!(!json.contains("api_key"));
        assert!(json.contains("\"session_id\":\"s-9\""));
    }

    #[test]
    fn init_request_carries_codec_and_ttl() {
        let req =
            TransferRequest::init_transfer("analyze", 12, Codec::Deflate, "abc123", Some(900));
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"compression\":\"deflate\""));
        assert!(json.contains("\"ttl_seconds\":900"));
        assert!(json.contains("\"total_chunks\":12"));
    }

    #[test]
    fn legacy_compression_param_accepted() {
        let json = r#"{"action":"direct","operation":"op","data":"AQI=","compression":"pako"}"#;
        let parsed: TransferRequest = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.compression, Compression::Deflate);
    }

    #[test]
    fn response_ok_roundtrip() {
        let raw = serde_json::value::RawValue::from_string("{\"answer\":42}".into()).unwrap();
        let resp = TransferResponse::ok(
            "req-1",
            Some(raw),
            Some(ResponseMetadata {
                processing_time_ms: 1.5,
                compression_ratio: 0.62,
                chunk_count: Some(7),
            }),
        );
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"requestId\":\"req-1\""));
        assert!(json.contains("\"processingTimeMs\":1.5"));
        let parsed: TransferResponse = serde_json::from_str(&json).unwrap();
        assert!(parsed.success);
        let result: serde_json::Value = parsed.parse_result().unwrap().unwrap();
        assert_eq!(result["answer"], 42);
    }

    #[test]
    fn response_failure_has_troubleshooting() {
        let resp = TransferResponse::failure("req-2", ErrorCode::Validation, "operation missing");
        assert!(!resp.success);
        let err = resp.error.unwrap();
        assert_eq!(err.code, ErrorCode::Validation);
        assert!(!err.troubleshooting.is_empty());
    }

    #[test]
    fn response_with_session_status() {
        let resp = TransferResponse::ok("req-3", None, None).with_session(SessionStatus {
            session_id: "s-1".into(),
            state: SessionState::Receiving,
            received_chunks: 3,
            expected_chunks: 10,
        });
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"receivedChunks\":3"));
        let parsed: TransferResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.session.unwrap().state, SessionState::Receiving);
    }
}
