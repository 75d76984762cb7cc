//! Platform accounts and their credentials.

use super::{from_db_time, to_db_time, Store};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use goban_core::{
    error::GobanError,
    model::{Account, Credential, Identity, Task},
    traits::AccountStore,
};

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i64,
    uid: i64,
    name: String,
    avatar_url: String,
    level: i64,
    cookies: String,
    logged_in: bool,
    login_time: Option<String>,
    expire_time: Option<String>,
}

impl From<AccountRow> for Account {
    fn from(r: AccountRow) -> Self {
        Account {
            id: r.id,
            uid: r.uid,
            name: r.name,
            avatar_url: r.avatar_url,
            level: r.level,
            cookies: r.cookies,
            logged_in: r.logged_in,
            login_time: from_db_time(r.login_time),
            expire_time: from_db_time(r.expire_time),
        }
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, uid, name, avatar_url, level, cookies, logged_in, login_time, expire_time";

impl Store {
    pub async fn get_account_by_uid(&self, uid: i64) -> Result<Option<Account>, GobanError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE uid = ?"
        ))
        .bind(uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GobanError::Store(format!("get account failed: {e}")))?;
        Ok(row.map(Account::from))
    }

    pub async fn count_accounts(&self) -> Result<i64, GobanError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| GobanError::Store(format!("count accounts failed: {e}")))?;
        Ok(n)
    }
}

#[async_trait]
impl AccountStore for Store {
    async fn credential_for(&self, task: &Task) -> Result<Option<Credential>, GobanError> {
        let row: Option<(i64, String, bool, Option<String>)> = sqlx::query_as(
            "SELECT id, cookies, logged_in, expire_time FROM accounts WHERE id = ?",
        )
        .bind(task.account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| GobanError::Store(format!("credential lookup failed: {e}")))?;

        Ok(row.map(|(account_id, cookies, logged_in, expire_time)| Credential {
            account_id,
            cookies,
            logged_in,
            expires_at: from_db_time(expire_time),
        }))
    }

    async fn upsert_account(
        &self,
        identity: &Identity,
        cookies: &str,
        login_time: DateTime<Utc>,
        expire_time: DateTime<Utc>,
    ) -> Result<Account, GobanError> {
        sqlx::query(
            "INSERT INTO accounts (uid, name, avatar_url, level, cookies, logged_in, login_time, expire_time) \
             VALUES (?, ?, ?, ?, ?, 1, ?, ?) \
             ON CONFLICT(uid) DO UPDATE SET \
                name = excluded.name, \
                avatar_url = excluded.avatar_url, \
                level = excluded.level, \
                cookies = excluded.cookies, \
                logged_in = 1, \
                login_time = excluded.login_time, \
                expire_time = excluded.expire_time, \
                updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')",
        )
        .bind(identity.uid)
        .bind(&identity.name)
        .bind(&identity.avatar_url)
        .bind(identity.level)
        .bind(cookies)
        .bind(to_db_time(login_time))
        .bind(to_db_time(expire_time))
        .execute(&self.pool)
        .await
        .map_err(|e| GobanError::Store(format!("upsert account failed: {e}")))?;

        self.get_account_by_uid(identity.uid)
            .await?
            .ok_or_else(|| GobanError::NotFound(format!("account uid {}", identity.uid)))
    }

    async fn mark_logged_out(&self, account_id: i64) -> Result<(), GobanError> {
        sqlx::query(
            "UPDATE accounts SET logged_in = 0, \
             updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') WHERE id = ?",
        )
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(|e| GobanError::Store(format!("mark logged out failed: {e}")))?;
        Ok(())
    }
}
