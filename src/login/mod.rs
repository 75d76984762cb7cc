//! Account login: the login-code handshake and direct cookie import.
//!
//! A handshake is driven entirely by inbound polls. Each `check` asks the
//! passport service once and moves the session along
//! `pending -> scanned -> {success, expired, failed}`. Terminal results are
//! handed out exactly once; the session is gone afterwards.

mod qr;
mod sessions;


pub use qr::generate_qr_image;
pub use sessions::{LoginSession, MemorySessions, SessionRepository, SessionStatus};

use chrono::{DateTime, Duration, Utc};
use goban_core::{
    config::LoginConfig,
    error::{GobanError, RemoteError},
    model::{Account, ClientOptions, LoginPoll},
    traits::{AccountStore, ClientFactory, LoginPeer},
};
use goban_remote::extract_credential;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A freshly started handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginTicket {
    pub key: String,
    /// URL to show as a QR code.
    pub url: String,
}

/// Result of one poll of a handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginCheck {
    pub status: SessionStatus,
    pub message: String,
    /// Set only on `Success`.
    pub account: Option<Account>,
}

impl LoginCheck {
    fn new(status: SessionStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            account: None,
        }
    }
}

/// Drives login sessions and registers the resulting accounts.
pub struct LoginService {
    peer: Arc<dyn LoginPeer>,
    sessions: Arc<dyn SessionRepository>,
    accounts: Arc<dyn AccountStore>,
    clients: Arc<dyn ClientFactory>,
    client_options: ClientOptions,
    config: LoginConfig,
}

impl LoginService {
    pub fn new(
        peer: Arc<dyn LoginPeer>,
        sessions: Arc<dyn SessionRepository>,
        accounts: Arc<dyn AccountStore>,
        clients: Arc<dyn ClientFactory>,
        client_options: ClientOptions,
        config: LoginConfig,
    ) -> Self {
        Self {
            peer,
            sessions,
            accounts,
            clients,
            client_options,
            config,
        }
    }

    /// Issue a login code and open a pending session for it.
    pub async fn start(&self) -> Result<LoginTicket, GobanError> {
        let code = self.peer.issue_code().await?;
        let key = Uuid::new_v4().to_string();
        self.sessions.insert(LoginSession::new(
            key.clone(),
            code.auth_code,
            code.url.clone(),
            Utc::now(),
        ));
        info!("login session {key} started");
        Ok(LoginTicket { key, url: code.url })
    }

    pub async fn check(&self, key: &str) -> Result<LoginCheck, GobanError> {
        self.check_at(key, Utc::now()).await
    }

    /// Poll the peer once for session `key` as of `now`.
    ///
    /// Returns `NotFound` for unknown keys, including sessions whose terminal
    /// result was already delivered.
    pub async fn check_at(&self, key: &str, now: DateTime<Utc>) -> Result<LoginCheck, GobanError> {
        let mut session = self
            .sessions
            .get(key)
            .ok_or_else(|| GobanError::NotFound("session not found".to_string()))?;

        if session.status.is_terminal() || session.is_stale(now, self.config.session_ttl()) {
            self.claim(key)?;
            if session.status.is_terminal() {
                return Ok(LoginCheck::new(session.status, session.message));
            }
            info!("login session {key} expired");
            return Ok(LoginCheck::new(SessionStatus::Expired, "login code expired"));
        }

        let poll = match self.peer.poll_code(&session.auth_code).await {
            Ok(p) => p,
            Err(e) => {
                warn!("login session {key}: poll failed: {e}");
                return Ok(LoginCheck::new(SessionStatus::Pending, "checking"));
            }
        };
        debug!("login session {key}: {poll:?}");

        match poll {
            LoginPoll::Confirmed { redirect_url } => {
                self.claim(key)?;
                match self.complete(&redirect_url, now).await {
                    Ok(account) => {
                        info!("login session {key}: account {} logged in", account.uid);
                        Ok(LoginCheck {
                            status: SessionStatus::Success,
                            message: format!("logged in as {}", account.name),
                            account: Some(account),
                        })
                    }
                    Err(reason) => {
                        warn!("login session {key} failed: {reason}");
                        Ok(LoginCheck::new(SessionStatus::Failed, reason))
                    }
                }
            }
            LoginPoll::Expired => {
                self.claim(key)?;
                Ok(LoginCheck::new(SessionStatus::Expired, "login code expired"))
            }
            LoginPoll::Scanned => {
                session.status = SessionStatus::Scanned;
                session.message = "scanned, confirm on your phone".to_string();
                self.save(&session)?;
                Ok(LoginCheck::new(session.status, session.message))
            }
            LoginPoll::AwaitingScan | LoginPoll::Unknown { .. } => {
                session.status = SessionStatus::Pending;
                session.message = "waiting for scan".to_string();
                self.save(&session)?;
                Ok(LoginCheck::new(session.status, session.message))
            }
        }
    }

    /// Abandon a handshake. Returns false when there was nothing to cancel.
    pub fn cancel(&self, key: &str) -> bool {
        let removed = self.sessions.remove(key).is_some();
        if removed {
            info!("login session {key} cancelled");
        }
        removed
    }

    /// Register an account from a pasted cookie string.
    pub async fn login_with_cookie(&self, cookies: &str) -> Result<Account, GobanError> {
        let cookies = cookies.trim();
        if cookies.is_empty() {
            return Err(GobanError::Login("cookie is empty".to_string()));
        }
        self.register(cookies, Utc::now()).await.map_err(|e| match e {
            GobanError::Remote(RemoteError::InvalidCredential) => {
                GobanError::Login("cookie expired or malformed".to_string())
            }
            other => other,
        })
    }

    /// Drop sessions nobody polled to completion.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        self.sessions.sweep_expired(now, self.config.session_ttl())
    }

    /// Sweep stale sessions every `sweep_interval_secs` until `stop` fires.
    pub async fn sweep_loop(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        let period = std::time::Duration::from_secs(self.config.sweep_interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let dropped = self.sweep(Utc::now());
                    if dropped > 0 {
                        info!("dropped {dropped} stale login sessions");
                    }
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
    }

    pub fn pending_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Take the session out of the repository. Only the caller that removes
    /// it may report its terminal state.
    fn claim(&self, key: &str) -> Result<LoginSession, GobanError> {
        self.sessions
            .remove(key)
            .ok_or_else(|| GobanError::NotFound("session not found".to_string()))
    }

    fn save(&self, session: &LoginSession) -> Result<(), GobanError> {
        if self.sessions.update(session) {
            Ok(())
        } else {
            Err(GobanError::NotFound("session not found".to_string()))
        }
    }

    async fn complete(&self, redirect_url: &str, now: DateTime<Utc>) -> Result<Account, String> {
        let cookies = extract_credential(redirect_url)
            .ok_or_else(|| "login confirmation carried no usable credential".to_string())?;
        self.register(&cookies, now)
            .await
            .map_err(|e| format!("failed to register account: {e}"))
    }

    /// Verify `cookies` against the platform and upsert the account they belong to.
    async fn register(&self, cookies: &str, now: DateTime<Utc>) -> Result<Account, GobanError> {
        let client = self.clients.build(cookies, &self.client_options)?;
        let identity = client.fetch_identity().await?;
        let expires = Duration::try_days(self.config.credential_lifetime_days)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                GobanError::Config(format!(
                    "credential lifetime of {} days is out of range",
                    self.config.credential_lifetime_days
                ))
            })?;
        self.accounts
            .upsert_account(&identity, cookies, now, expires)
            .await
    }
}
