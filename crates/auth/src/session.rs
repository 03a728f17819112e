//! Opaque session tokens and the token → user mapping.
//!
//! Sessions are process-lifetime state: a restart invalidates every token.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use maintops_core::UserId;

/// 128 random bits, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        let mut raw = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut raw);
        Self(raw.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("unknown session")]
    Unknown,

    #[error("session expired")]
    Expired,

    #[error("session table lock poisoned")]
    Poisoned,
}

/// Session table contract.
pub trait SessionStore: Send + Sync {
    /// Mint a fresh token bound to `user_id`.
    fn issue(&self, user_id: UserId) -> Result<SessionToken, SessionError>;

    /// Resolve a live token to its user.
    fn resolve(&self, token: &str) -> Result<UserId, SessionError>;

    /// Drop a token. Unknown tokens are ignored.
    fn revoke(&self, token: &str) -> Result<(), SessionError>;

    /// Drop every token of a user (used when the account is deleted or blocked).
    fn revoke_user(&self, user_id: UserId) -> Result<usize, SessionError>;
}

impl<S> SessionStore for Arc<S>
where
    S: SessionStore + ?Sized,
{
    fn issue(&self, user_id: UserId) -> Result<SessionToken, SessionError> {
        (**self).issue(user_id)
    }

    fn resolve(&self, token: &str) -> Result<UserId, SessionError> {
        (**self).resolve(token)
    }

    fn revoke(&self, token: &str) -> Result<(), SessionError> {
        (**self).revoke(token)
    }

    fn revoke_user(&self, user_id: UserId) -> Result<usize, SessionError> {
        (**self).revoke_user(user_id)
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    user_id: UserId,
    expires_at: Option<DateTime<Utc>>,
}

/// `RwLock<HashMap>` session table with optional time-to-live.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    ttl: Option<Duration>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Some(ttl),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for InMemorySessionStore {
    fn issue(&self, user_id: UserId) -> Result<SessionToken, SessionError> {
        let token = SessionToken::generate();
        let entry = SessionEntry {
            user_id,
            expires_at: self.ttl.map(|ttl| Utc::now() + ttl),
        };
        let mut sessions = self.sessions.write().map_err(|_| SessionError::Poisoned)?;
        sessions.insert(token.as_str().to_string(), entry);
        Ok(token)
    }

    fn resolve(&self, token: &str) -> Result<UserId, SessionError> {
        let entry = {
            let sessions = self.sessions.read().map_err(|_| SessionError::Poisoned)?;
            sessions.get(token).cloned().ok_or(SessionError::Unknown)?
        };

        match entry.expires_at {
            Some(at) if at <= Utc::now() => {
                let mut sessions = self.sessions.write().map_err(|_| SessionError::Poisoned)?;
                sessions.remove(token);
                Err(SessionError::Expired)
            }
            _ => Ok(entry.user_id),
        }
    }

    fn revoke(&self, token: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().map_err(|_| SessionError::Poisoned)?;
        sessions.remove(token);
        Ok(())
    }

    fn revoke_user(&self, user_id: UserId) -> Result<usize, SessionError> {
        let mut sessions = self.sessions.write().map_err(|_| SessionError::Poisoned)?;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.user_id != user_id);
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_32_hex_chars_and_unique() {
        let a = SessionToken::generate();
        let b = SessionToken::generate();
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn issue_resolve_revoke() {
        let store = InMemorySessionStore::new();
        let user = UserId::new();
        let token = store.issue(user).unwrap();

        assert_eq!(store.resolve(token.as_str()).unwrap(), user);

        store.revoke(token.as_str()).unwrap();
        store.revoke(token.as_str()).unwrap();
        assert_eq!(store.resolve(token.as_str()), Err(SessionError::Unknown));
    }

    #[test]
    fn never_issued_token_is_unknown() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.resolve("deadbeef"), Err(SessionError::Unknown));
    }

    #[test]
    fn expired_sessions_are_rejected_and_dropped() {
        let store = InMemorySessionStore::with_ttl(Duration::zero());
        let token = store.issue(UserId::new()).unwrap();
        assert_eq!(store.resolve(token.as_str()), Err(SessionError::Expired));
        assert!(store.is_empty());
    }

    #[test]
    fn revoke_user_drops_all_of_their_tokens() {
        let store = InMemorySessionStore::new();
        let alice = UserId::new();
        let bob = UserId::new();
        store.issue(alice).unwrap();
        store.issue(alice).unwrap();
        let keep = store.issue(bob).unwrap();

        assert_eq!(store.revoke_user(alice).unwrap(), 2);
        assert_eq!(store.resolve(keep.as_str()).unwrap(), bob);
    }
}
