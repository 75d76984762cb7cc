//! Domain types shared by the scheduler, the login flow, and the store.

use crate::keywords::parse_keywords;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A monitoring job: one account watching one target's uploads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub account_id: i64,
    pub target_uid: i64,
    pub target_name: String,
    /// How many of the newest uploads to inspect per run.
    pub item_count: u32,
    /// How many comments to inspect per upload.
    pub comment_count: u32,
    /// Comma-separated keyword list, in priority order.
    pub keywords: String,
    pub enabled: bool,
    pub interval_secs: u64,
    /// Pause after each filed complaint. Non-positive means "use the default".
    pub action_delay_secs: i64,
    pub max_retries: u32,
    /// Base backoff for remote retries. Zero means "use the default policy".
    pub retry_base_secs: u64,
    pub proxy_url: Option<String>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Parsed keyword list in configured order.
    pub fn keyword_list(&self) -> Vec<String> {
        parse_keywords(&self.keywords)
    }

    /// A task that was never checked is always due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_checked_at {
            None => true,
            Some(last) => (now - last).num_seconds() >= self.interval_secs as i64,
        }
    }

    /// Delay between two complaints filed by the same run.
    pub fn action_delay(&self, default_secs: u64) -> Duration {
        if self.action_delay_secs > 0 {
            Duration::from_secs(self.action_delay_secs as u64)
        } else {
            Duration::from_secs(default_secs)
        }
    }

    /// The task's own retry policy, or `default` when it has no backoff base.
    pub fn retry_policy(&self, default: RetryPolicy) -> RetryPolicy {
        if self.retry_base_secs == 0 {
            return default;
        }
        RetryPolicy {
            max_retries: self.max_retries,
            base_interval: Duration::from_secs(self.retry_base_secs),
        }
    }

    /// Proxy address, ignoring blank values.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy_url.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

/// Bounded exponential backoff settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_interval: Duration::from_secs(2),
        }
    }
}

/// Per-client transport settings.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub proxy_url: Option<String>,
    pub retry: RetryPolicy,
}

/// An upload on the platform. Fetched per run, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteItem {
    /// Numeric id (`aid`), used as the comment thread id.
    pub id: i64,
    /// Public id (`bvid`).
    pub external_id: String,
    pub title: String,
    pub owner_id: i64,
    pub created_at: i64,
}

/// A top-level comment under an upload.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteComment {
    pub id: i64,
    pub item_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub body: String,
    pub created_at: i64,
}

/// Profile of the account a credential belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: i64,
    pub name: String,
    pub avatar_url: String,
    pub level: i64,
}

/// A registered platform account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub uid: i64,
    pub name: String,
    pub avatar_url: String,
    pub level: i64,
    #[serde(skip_serializing)]
    pub cookies: String,
    pub logged_in: bool,
    pub login_time: Option<DateTime<Utc>>,
    pub expire_time: Option<DateTime<Utc>>,
}

/// The cookie credential an account acts with.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub account_id: i64,
    pub cookies: String,
    pub logged_in: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.logged_in
            && !self.cookies.trim().is_empty()
            && self.expires_at.map_or(true, |exp| exp > now)
    }
}

/// One filed (or attempted) complaint, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActionRecord {
    pub task_id: i64,
    pub item_id: i64,
    pub item_external_id: String,
    pub item_title: String,
    pub comment_id: i64,
    pub comment_body: String,
    pub comment_author: String,
    pub matched_keyword: String,
    pub reason_code: i32,
    pub success: bool,
    pub message: String,
}

/// A persisted complaint record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRecord {
    pub id: i64,
    pub task_id: i64,
    pub item_id: i64,
    pub item_external_id: String,
    pub item_title: String,
    pub comment_id: i64,
    pub comment_body: String,
    pub comment_author: String,
    pub matched_keyword: String,
    pub reason_code: i32,
    pub success: bool,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Result of inserting an action record under the (task, comment) uniqueness rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionInsert {
    Created,
    /// A record for this (task, comment) already existed; nothing was written.
    Duplicate,
}

/// Severity of a task log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A freshly issued login code.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginCode {
    pub auth_code: String,
    /// URL to encode in the QR code shown to the user.
    pub url: String,
}

/// What the platform reports for a login code.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginPoll {
    /// Login confirmed; the redirect URL carries the session cookies.
    Confirmed { redirect_url: String },
    /// Scanned on a phone, waiting for the user to confirm.
    Scanned,
    /// Nobody has scanned the code yet.
    AwaitingScan,
    /// The code is no longer usable.
    Expired,
    /// A code this client does not know.
    Unknown { code: i64 },
}
