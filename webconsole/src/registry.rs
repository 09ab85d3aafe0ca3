//! Registry of live sessions.

use crate::errors::SessionError;
use crate::id::SessionId;
use crate::session::Session;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Maps session ids to live sessions.
///
/// Construct one per process and share it by `Arc`. Sessions are only ever
/// inserted; nothing is evicted.
pub struct SessionRegistry<B> {
    sessions: RwLock<HashMap<SessionId, Arc<Session<B>>>>,
}

impl<B> Default for SessionRegistry<B> {
    fn default() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl<B> SessionRegistry<B> {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a fully built session under its id.
    pub fn register(&self, session: Arc<Session<B>>) {
        let id = session.id().clone();
        let total = {
            let mut sessions = self.sessions.write();
            sessions.insert(id.clone(), session);
            sessions.len()
        };
        debug!(session_id = %id, total, "Registered session");
    }

    /// Looks up a session by id.
    pub fn find(&self, id: &str) -> Result<Arc<Session<B>>, SessionError> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::not_found(id))
    }

    /// Checks if a session is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.read().contains_key(id)
    }

    /// Lists registered ids.
    #[must_use]
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Returns the number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns true if no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl<B> std::fmt::Debug for SessionRegistry<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("session_count", &self.len())
            .finish()
    }
}
