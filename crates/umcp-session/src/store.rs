//! In-memory session store.
//!
//! The map lives behind one `RwLock`; every transition takes the write lock,
//! so concurrent `mark_ready` and `touch` calls on the same session serialize.
//! Sessions are dropped with the process.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::SessionError;
use crate::types::{Session, SessionId, SessionState};

/// Registry of live sessions keyed by [`SessionId`].
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh session in the `Created` state.
    pub async fn create(&self) -> SessionId {
        let mut sessions = self.sessions.write().await;
        let id = loop {
            let candidate = SessionId::generate();
            if !sessions.contains_key(candidate.as_str()) {
                break candidate;
            }
        };
        sessions.insert(id.clone(), Session::new(id.clone()));
        tracing::debug!(session_id = %id, total = sessions.len(), "Session created");
        id
    }

    /// Move a session to `Ready`. Calling it again is a no-op.
    pub async fn mark_ready(&self, id: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or_else(|| not_found(id))?;
        if session.state != SessionState::Ready {
            session.state = SessionState::Ready;
            tracing::info!(session_id = %id, "Session ready");
        }
        session.last_activity = Utc::now();
        Ok(())
    }

    /// Record activity on a session.
    pub async fn touch(&self, id: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id).ok_or_else(|| not_found(id))?;
        session.last_activity = Utc::now();
        Ok(())
    }

    /// Snapshot of a session.
    pub async fn get(&self, id: &str) -> Result<Session, SessionError> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned().ok_or_else(|| not_found(id))
    }

    /// Terminate a session.
    pub async fn remove(&self, id: &str) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.remove(id).ok_or_else(|| not_found(id))?;
        tracing::debug!(session_id = %id, "Session removed");
        Ok(session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

fn not_found(id: &str) -> SessionError {
    SessionError::NotFound { id: id.to_string() }
}
