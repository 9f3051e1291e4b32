//! Session data types.

use std::borrow::Borrow;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

/// Characters a session id is drawn from. Excludes look-alikes (`0 O o 1 l I`).
const ID_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz";

/// Length of every generated session id.
pub const SESSION_ID_LEN: usize = 32;

/// Opaque, unguessable session identifier. Safe to carry in an HTTP header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Draw a fresh id from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id = (0..SESSION_ID_LEN)
            .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Handshake progress of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// `initialize` answered, waiting for `notifications/initialized`.
    Created,
    /// Handshake complete; tools may be listed and called.
    Ready,
}

/// A live client session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: SessionState::Created,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }
}
