//! Login session records and the repository that holds them.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Where a login-code handshake stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Scanned,
    Success,
    Expired,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Expired | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scanned => "scanned",
            Self::Success => "success",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }
}

/// One login-code handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginSession {
    pub key: String,
    pub auth_code: String,
    pub login_url: String,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
    pub message: String,
}

impl LoginSession {
    pub fn new(key: String, auth_code: String, login_url: String, now: DateTime<Utc>) -> Self {
        Self {
            key,
            auth_code,
            login_url,
            created_at: now,
            status: SessionStatus::Pending,
            message: "waiting for scan".to_string(),
        }
    }

    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at > ttl
    }
}

/// Storage for in-progress login sessions, keyed by session key.
///
/// Implementations must make `remove` atomic: exactly one caller gets the
/// session back, which is how a terminal result is delivered only once.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, session: LoginSession);

    fn get(&self, key: &str) -> Option<LoginSession>;

    /// Replace an existing session. Returns false when the key is gone.
    fn update(&self, session: &LoginSession) -> bool;

    fn remove(&self, key: &str) -> Option<LoginSession>;

    /// Drop every session older than `ttl`. Returns how many were dropped.
    fn sweep_expired(&self, now: DateTime<Utc>, ttl: Duration) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local session map behind a mutex.
#[derive(Default)]
pub struct MemorySessions {
    inner: Mutex<HashMap<String, LoginSession>>,
}

impl MemorySessions {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, LoginSession>> {
        // A panic mid-update leaves the map itself consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionRepository for MemorySessions {
    fn insert(&self, session: LoginSession) {
        self.lock().insert(session.key.clone(), session);
    }

    fn get(&self, key: &str) -> Option<LoginSession> {
        self.lock().get(key).cloned()
    }

    fn update(&self, session: &LoginSession) -> bool {
        match self.lock().get_mut(&session.key) {
            Some(slot) => {
                *slot = session.clone();
                true
            }
            None => false,
        }
    }

    fn remove(&self, key: &str) -> Option<LoginSession> {
        self.lock().remove(key)
    }

    fn sweep_expired(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let mut map = self.lock();
        let before = map.len();
        map.retain(|_, s| !s.is_stale(now, ttl));
        before - map.len()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}
