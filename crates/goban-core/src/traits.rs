use crate::{
    error::{GobanError, RemoteError},
    model::{
        Account, ActionInsert, ClientOptions, Credential, Identity, LogLevel, LoginCode,
        LoginPoll, NewActionRecord, RemoteComment, RemoteItem, Task,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Content platform API, bound to one account's credential.
///
/// Every call except the local token check in `submit_complaint` goes
/// through the client's retry policy before an error reaches the caller.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Profile of the credential's own account.
    async fn fetch_identity(&self) -> Result<Identity, RemoteError>;

    /// Newest uploads of `target_uid`, in platform order.
    async fn list_items(&self, target_uid: i64, count: u32) -> Result<Vec<RemoteItem>, RemoteError>;

    /// First page of comments under an upload. Closed comment sections yield an empty list.
    async fn list_comments(&self, item_id: i64, count: u32) -> Result<Vec<RemoteComment>, RemoteError>;

    /// Report a comment with the given reason code.
    async fn submit_complaint(
        &self,
        item_id: i64,
        comment_id: i64,
        reason_code: i32,
    ) -> Result<(), RemoteError>;

    /// Display name of any user.
    async fn fetch_user_name(&self, uid: i64) -> Result<String, RemoteError>;
}

/// Builds platform clients. Lets the scheduler and login flow stay transport-agnostic.
pub trait ClientFactory: Send + Sync {
    fn build(&self, cookies: &str, options: &ClientOptions)
        -> Result<Arc<dyn Platform>, RemoteError>;
}

/// Login-code endpoints of the platform's passport service.
#[async_trait]
pub trait LoginPeer: Send + Sync {
    async fn issue_code(&self) -> Result<LoginCode, RemoteError>;

    async fn poll_code(&self, auth_code: &str) -> Result<LoginPoll, RemoteError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_enabled_tasks(&self) -> Result<Vec<Task>, GobanError>;

    async fn update_last_checked(&self, task_id: i64, at: DateTime<Utc>) -> Result<(), GobanError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Credential of the account that owns `task`, if the account exists.
    async fn credential_for(&self, task: &Task) -> Result<Option<Credential>, GobanError>;

    /// Create the account for `identity.uid`, or refresh its profile and credential.
    async fn upsert_account(
        &self,
        identity: &Identity,
        cookies: &str,
        login_time: DateTime<Utc>,
        expire_time: DateTime<Utc>,
    ) -> Result<Account, GobanError>;

    /// Flag an account whose credential the platform refused. It stays unusable until the next login.
    async fn mark_logged_out(&self, account_id: i64) -> Result<(), GobanError>;
}

/// Append-only complaint records, unique per (task, comment).
#[async_trait]
pub trait ActionStore: Send + Sync {
    async fn action_exists(&self, task_id: i64, comment_id: i64) -> Result<bool, GobanError>;

    async fn create_action(&self, record: &NewActionRecord) -> Result<ActionInsert, GobanError>;
}

/// Per-task log visible to operators.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn append(&self, task_id: i64, level: LogLevel, message: &str) -> Result<(), GobanError>;
}
