use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use datalift_chunk::{Chunk, assemble, digest_hex};
use datalift_protocol::{Codec, SessionState, SessionStatus};

use crate::SessionError;

/// Transfer metadata declared at init and needed again at finalize.
#[derive(Debug, Clone, Default)]
pub struct SessionMeta {
    /// Logical action the receiver performs with the assembled payload.
    pub operation: String,
    /// Codec the assembled payload is encoded with.
    pub compression: Option<Codec>,
    /// Optional SHA-256 hex digest of the whole payload, verified after
    /// reassembly.
    pub digest: String,
}

/// Acknowledgement returned by a chunk insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkAck {
    pub received: u32,
    pub expected: u32,
    pub state: SessionState,
}

/// Non-destructive view of a session's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPoll {
    /// All chunks arrived and reassembly succeeded.
    Complete(Vec<u8>),
    /// Still waiting for chunks.
    Pending { received: u32, expected: u32 },
    /// Reassembly failed; the transfer must be restarted.
    Failed(String),
}

/// Server-side aggregate tracking one in-flight chunked transfer
/// (thread-safe).
///
/// All mutation happens under the session's own lock, so the count check
/// that triggers reassembly is atomic with the insert: two concurrent
/// "last" chunks cannot both trigger it, and an insert racing the sweep
/// observes either the live or the expired state, never a torn one.
pub struct Session {
    id: String,
    inner: Mutex<SessionInner>,
}

struct SessionInner {
    state: SessionState,
    expected_chunks: u32,
    received: HashMap<u32, Chunk>,
    last_activity: Instant,
    ttl: Duration,
    meta: SessionMeta,
    result: Option<Vec<u8>>,
    failure: Option<String>,
}

impl Session {
    pub(crate) fn new(id: String, expected_chunks: u32, ttl: Duration, meta: SessionMeta) -> Self {
        Self {
            id,
            inner: Mutex::new(SessionInner {
                state: SessionState::Created,
                expected_chunks,
                received: HashMap::new(),
                last_activity: Instant::now(),
                ttl,
                meta,
                result: None,
                failure: None,
            }),
        }
    }

    /// The session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Transfer metadata declared at init.
    pub fn meta(&self) -> SessionMeta {
        self.inner.lock().unwrap().meta.clone()
    }

    /// Inserts one chunk and, when it is the last one, reassembles.
    ///
    /// A duplicate index overwrites the stored chunk (idempotent, last
    /// write wins) and does not double-count toward completion. Corrupted
    /// chunks are rejected without state change so the sender can retry
    /// just that chunk.
    pub fn add_chunk(&self, chunk: Chunk) -> Result<ChunkAck, SessionError> {
        let mut inner = self.inner.lock().unwrap();

        match inner.state {
            SessionState::Expired => return Err(SessionError::Expired(self.id.clone())),
            SessionState::Complete | SessionState::Error | SessionState::Processing => {
                return Err(SessionError::AlreadyComplete(self.id.clone()));
            }
            SessionState::Created | SessionState::Receiving => {}
        }
        // TTL is also enforced here so expiry does not depend on sweep
        // timing.
        if inner.last_activity.elapsed() > inner.ttl {
            inner.expire();
            return Err(SessionError::Expired(self.id.clone()));
        }

        let expected = inner.expected_chunks;
        if chunk.total_chunks != expected {
            return Err(SessionError::ChunkTotalMismatch {
                index: chunk.index,
                declared: chunk.total_chunks,
                expected,
            });
        }
        if chunk.index >= expected {
            return Err(SessionError::ChunkOutOfRange {
                index: chunk.index,
                expected,
            });
        }
        if !chunk.verify() {
            return Err(SessionError::ChunkChecksum { index: chunk.index });
        }

        inner.received.insert(chunk.index, chunk);
        inner.state = SessionState::Receiving;
        inner.last_activity = Instant::now();

        if inner.received.len() as u32 == expected {
            inner.state = SessionState::Processing;
            let chunks: Vec<Chunk> = inner.received.drain().map(|(_, c)| c).collect();
            match assemble(&chunks) {
                Ok(payload) => {
                    if !inner.meta.digest.is_empty() && digest_hex(&payload) != inner.meta.digest {
                        tracing::warn!(session = %self.id, "payload digest mismatch after reassembly");
                        inner.state = SessionState::Error;
                        inner.failure = Some("payload digest mismatch".to_string());
                    } else {
                        inner.state = SessionState::Complete;
                        inner.result = Some(payload);
                    }
                }
                Err(e) => {
                    tracing::warn!(session = %self.id, error = %e, "reassembly failed");
                    inner.state = SessionState::Error;
                    inner.failure = Some(e.to_string());
                }
            }
        }

        Ok(ChunkAck {
            received: match inner.state {
                SessionState::Receiving => inner.received.len() as u32,
                _ => expected,
            },
            expected,
            state: inner.state,
        })
    }

    /// Non-destructive result read. Repeated polling is safe; eviction is
    /// TTL- or explicit-cleanup-driven only.
    pub fn poll(&self) -> Result<SessionPoll, SessionError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            SessionState::Complete => Ok(SessionPoll::Complete(
                inner.result.clone().unwrap_or_default(),
            )),
            SessionState::Error => Ok(SessionPoll::Failed(
                inner
                    .failure
                    .clone()
                    .unwrap_or_else(|| "reassembly failed".to_string()),
            )),
            SessionState::Expired => Err(SessionError::Expired(self.id.clone())),
            SessionState::Created | SessionState::Receiving | SessionState::Processing => {
                if inner.last_activity.elapsed() > inner.ttl {
                    inner.expire();
                    return Err(SessionError::Expired(self.id.clone()));
                }
                Ok(SessionPoll::Pending {
                    received: inner.received.len() as u32,
                    expected: inner.expected_chunks,
                })
            }
        }
    }

    /// Read-only snapshot for responses and monitoring.
    pub fn status(&self) -> SessionStatus {
        let inner = self.inner.lock().unwrap();
        SessionStatus {
            session_id: self.id.clone(),
            state: inner.state,
            received_chunks: match inner.state {
                SessionState::Created | SessionState::Receiving | SessionState::Expired => {
                    inner.received.len() as u32
                }
                _ => inner.expected_chunks,
            },
            expected_chunks: inner.expected_chunks,
        }
    }

    /// Expires an in-flight session whose TTL elapsed, releasing chunk
    /// storage. Returns `true` if this call performed the transition.
    /// Terminal states are never transitioned.
    pub(crate) fn expire_if_idle(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.state.is_terminal() {
            return false;
        }
        if inner.last_activity.elapsed() > inner.ttl {
            inner.expire();
            return true;
        }
        false
    }

    /// `true` for a terminal session whose TTL has also elapsed: nothing
    /// will read it again, the store may drop it.
    pub(crate) fn is_reclaimable(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.state.is_terminal() && inner.last_activity.elapsed() > inner.ttl
    }
}

impl SessionInner {
    fn expire(&mut self) {
        self.state = SessionState::Expired;
        self.received = HashMap::new();
        self.result = None;
    }
}
