use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use datalift_chunk::Chunk;
use datalift_protocol::SessionStatus;
use datalift_protocol::constants::DEFAULT_SESSION_TTL;

use crate::session::{ChunkAck, Session, SessionMeta, SessionPoll};
use crate::store::{MemoryStore, SessionStore};
use crate::SessionError;

/// Owns all session state and provides the only mutation path for chunked
/// transfers. Cheap to clone via `Arc`.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    default_ttl: Duration,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    /// Creates a manager over an in-memory store.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Creates a manager over the given store backend.
    pub fn with_store(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            default_ttl: DEFAULT_SESSION_TTL,
        }
    }

    /// Overrides the TTL applied when a session declares none.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Allocates a new session expecting `expected_chunks` chunks.
    pub fn create_session(
        &self,
        expected_chunks: u32,
        ttl: Option<Duration>,
        meta: SessionMeta,
    ) -> Result<String, SessionError> {
        if expected_chunks == 0 {
            return Err(SessionError::InvalidArgument(
                "expected_chunks must be greater than zero",
            ));
        }

        // Random token + creation timestamp, so ids sort roughly by age in
        // store dumps.
        let id = format!(
            "{}-{}",
            Uuid::new_v4().simple(),
            Utc::now().timestamp_millis()
        );
        let ttl = ttl.unwrap_or(self.default_ttl);
        let session = Arc::new(Session::new(id.clone(), expected_chunks, ttl, meta));
        self.store.insert(session);
        tracing::debug!(session = %id, expected_chunks, ttl_secs = ttl.as_secs(), "session created");
        Ok(id)
    }

    /// Routes one chunk into its session.
    pub fn add_chunk(&self, session_id: &str, chunk: Chunk) -> Result<ChunkAck, SessionError> {
        let session = self
            .store
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        session.add_chunk(chunk)
    }

    /// Non-destructive result read; safe to poll repeatedly.
    pub fn get_result(&self, session_id: &str) -> Result<SessionPoll, SessionError> {
        let session = self
            .store
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        session.poll()
    }

    /// Read-only snapshot for responses and monitoring.
    pub fn status(&self, session_id: &str) -> Result<SessionStatus, SessionError> {
        let session = self
            .store
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        Ok(session.status())
    }

    /// Transfer metadata declared at the session's init.
    pub fn meta(&self, session_id: &str) -> Result<SessionMeta, SessionError> {
        let session = self
            .store
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        Ok(session.meta())
    }

    /// Removes a session outright (caller knows the transfer is abandoned
    /// or consumed). Returns `true` if it existed.
    pub fn remove_session(&self, session_id: &str) -> bool {
        self.store.remove(session_id).is_some()
    }

    /// Number of stored sessions, expired tombstones included.
    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    /// One maintenance pass: in-flight sessions past their TTL transition
    /// to `Expired` (releasing chunk storage), and terminal sessions whose
    /// TTL has also elapsed are removed from the store. Returns the number
    /// of sessions newly expired.
    ///
    /// An `Expired` record survives the pass that created it, so late
    /// calls see `SessionExpired` rather than `SessionNotFound` until a
    /// later pass drops it. Each session is locked only for its own check,
    /// never across the whole scan.
    pub fn expire_sweep(&self) -> usize {
        let mut newly_expired = 0;
        for id in self.store.ids() {
            let Some(session) = self.store.get(&id) else {
                continue;
            };
            if session.expire_if_idle() {
                newly_expired += 1;
                tracing::info!(session = %id, "session expired");
            } else if session.is_reclaimable() {
                self.store.remove(&id);
            }
        }
        newly_expired
    }

    /// Spawns the periodic sweep as a background task, independent of
    /// request handling. The returned handle stops it.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> SweeperHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let expired = manager.expire_sweep();
                        if expired > 0 {
                            tracing::debug!(expired, "sweep pass");
                        }
                    }
                    _ = token.cancelled() => break,
                }
            }
        });
        SweeperHandle { cancel }
    }
}

/// Handle to the background sweep task.
pub struct SweeperHandle {
    cancel: CancellationToken,
}

impl SweeperHandle {
    /// Stops the sweep task.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
