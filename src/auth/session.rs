//! Session Manager
//!
//! Tracks one session per account with an idle timeout. Login issues a random
//! bearer token; only its SHA-256 hash is kept. Every successful check
//! refreshes the last-activity time, and an expired session is evicted the
//! first time it is seen.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::domain::AccountId;

use super::credentials::sha256_hex;

#[derive(Debug, Clone)]
struct Session {
    token_hash: String,
    last_activity: DateTime<Utc>,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.last_activity + timeout < now
    }
}

/// In-process session store keyed by account id
#[derive(Debug)]
pub struct SessionManager {
    sessions: DashMap<AccountId, Session>,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start a session, replacing any previous one. Returns the bearer token,
    /// or `None` for a non-positive id.
    pub fn create(&self, account_id: AccountId) -> Option<String> {
        self.create_at(account_id, Utc::now())
    }

    pub fn create_at(&self, account_id: AccountId, now: DateTime<Utc>) -> Option<String> {
        if account_id <= 0 {
            return None;
        }

        let token = hex::encode(rand::random::<[u8; 32]>());
        self.sessions.insert(
            account_id,
            Session {
                token_hash: sha256_hex(token.as_bytes()),
                last_activity: now,
            },
        );
        Some(token)
    }

    /// Whether the account has a live session. Refreshes it when it does.
    pub fn is_valid(&self, account_id: AccountId) -> bool {
        self.touch(account_id, None, Utc::now())
    }

    pub fn is_valid_at(&self, account_id: AccountId, now: DateTime<Utc>) -> bool {
        self.touch(account_id, None, now)
    }

    /// Like [`is_valid`](Self::is_valid), and the token must match too.
    pub fn authenticate(&self, account_id: AccountId, token: &str) -> bool {
        self.touch(account_id, Some(token), Utc::now())
    }

    pub fn authenticate_at(&self, account_id: AccountId, token: &str, now: DateTime<Utc>) -> bool {
        self.touch(account_id, Some(token), now)
    }

    /// End the session. Returns whether one existed.
    pub fn invalidate(&self, account_id: AccountId) -> bool {
        self.sessions.remove(&account_id).is_some()
    }

    /// Drop every expired session, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| !session.is_expired(now, self.timeout));
        before.saturating_sub(self.sessions.len())
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    fn touch(&self, account_id: AccountId, token: Option<&str>, now: DateTime<Utc>) -> bool {
        let expired = self
            .sessions
            .remove_if(&account_id, |_, session| session.is_expired(now, self.timeout));
        if expired.is_some() {
            tracing::debug!(account_id, "Session expired");
            return false;
        }

        let token_hash = token.map(|t| sha256_hex(t.as_bytes()));
        match self.sessions.get_mut(&account_id) {
            Some(mut session) if token_hash.as_ref().map_or(true, |h| *h == session.token_hash) => {
                session.last_activity = now;
                true
            }
            _ => false,
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(Duration::minutes(30))
    }
}
