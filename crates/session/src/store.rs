use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::session::Session;

/// Storage backend for session records.
///
/// The trait abstracts only the id-to-session map; per-session mutation
/// stays behind each session's own lock, so the completion check cannot
/// race regardless of backend. The in-memory implementation below serves
/// tests and single-node deployments; a distributed cache implements the
/// same trait for multi-node setups.
pub trait SessionStore: Send + Sync {
    fn insert(&self, session: Arc<Session>);
    fn get(&self, id: &str) -> Option<Arc<Session>>;
    fn remove(&self, id: &str) -> Option<Arc<Session>>;
    /// Ids of all stored sessions (snapshot; used by the sweep).
    fn ids(&self) -> Vec<String>;
    fn len(&self) -> usize;
}

/// In-memory session store.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn insert(&self, session: Arc<Session>) {
        let mut map = self.sessions.write().unwrap();
        map.insert(session.id().to_string(), session);
    }

    fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().unwrap().get(id).cloned()
    }

    fn remove(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.write().unwrap().remove(id)
    }

    fn ids(&self) -> Vec<String> {
        self.sessions.read().unwrap().keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }
}
