//! Monitoring task rows.

use super::{from_db_time, to_db_time, Store};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use goban_core::{error::GobanError, model::Task, traits::TaskStore};

/// Fields for creating a task. The CRUD surface owns task creation.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct NewTask {
    pub account_id: i64,
    pub target_uid: i64,
    pub target_name: String,
    pub item_count: u32,
    pub comment_count: u32,
    pub keywords: String,
    pub enabled: bool,
    pub interval_secs: u64,
    pub action_delay_secs: i64,
    pub max_retries: u32,
    pub retry_base_secs: u64,
    pub proxy_url: Option<String>,
}

#[cfg(test)]
impl Default for NewTask {
    fn default() -> Self {
        Self {
            account_id: 0,
            target_uid: 0,
            target_name: String::new(),
            item_count: 5,
            comment_count: 50,
            keywords: String::new(),
            enabled: true,
            interval_secs: 300,
            action_delay_secs: 6,
            max_retries: 3,
            retry_base_secs: 2,
            proxy_url: None,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: i64,
    account_id: i64,
    target_uid: i64,
    target_name: String,
    item_count: i64,
    comment_count: i64,
    keywords: String,
    enabled: bool,
    interval_secs: i64,
    action_delay_secs: i64,
    max_retries: i64,
    retry_base_secs: i64,
    proxy_url: Option<String>,
    last_checked_at: Option<String>,
}

impl From<TaskRow> for Task {
    fn from(r: TaskRow) -> Self {
        Task {
            id: r.id,
            account_id: r.account_id,
            target_uid: r.target_uid,
            target_name: r.target_name,
            item_count: r.item_count.max(0) as u32,
            comment_count: r.comment_count.max(0) as u32,
            keywords: r.keywords,
            enabled: r.enabled,
            interval_secs: r.interval_secs.max(0) as u64,
            action_delay_secs: r.action_delay_secs,
            max_retries: r.max_retries.max(0) as u32,
            retry_base_secs: r.retry_base_secs.max(0) as u64,
            proxy_url: r.proxy_url,
            last_checked_at: from_db_time(r.last_checked_at),
        }
    }
}

const TASK_COLUMNS: &str = "id, account_id, target_uid, target_name, item_count, comment_count, \
     keywords, enabled, interval_secs, action_delay_secs, max_retries, retry_base_secs, \
     proxy_url, last_checked_at";

impl Store {
    /// Insert a task and return its id.
    #[cfg(test)]
    pub(crate) async fn insert_task(&self, task: &NewTask) -> Result<i64, GobanError> {
        let result = sqlx::query(
            "INSERT INTO tasks (account_id, target_uid, target_name, item_count, comment_count, \
             keywords, enabled, interval_secs, action_delay_secs, max_retries, retry_base_secs, proxy_url) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task.account_id)
        .bind(task.target_uid)
        .bind(&task.target_name)
        .bind(task.item_count as i64)
        .bind(task.comment_count as i64)
        .bind(&task.keywords)
        .bind(task.enabled)
        .bind(task.interval_secs as i64)
        .bind(task.action_delay_secs)
        .bind(task.max_retries as i64)
        .bind(task.retry_base_secs as i64)
        .bind(&task.proxy_url)
        .execute(&self.pool)
        .await
        .map_err(|e| GobanError::Store(format!("create task failed: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    #[cfg(test)]
    pub(crate) async fn get_task(&self, id: i64) -> Result<Task, GobanError> {
        let row: Option<TaskRow> =
            sqlx::query_as(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| GobanError::Store(format!("get task failed: {e}")))?;

        row.map(Task::from)
            .ok_or_else(|| GobanError::NotFound(format!("task {id}")))
    }

    /// (total, enabled) task counts.
    pub async fn count_tasks(&self) -> Result<(i64, i64), GobanError> {
        let counts: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN enabled THEN 1 ELSE 0 END), 0) FROM tasks",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| GobanError::Store(format!("count tasks failed: {e}")))?;
        Ok(counts)
    }
}

#[async_trait]
impl TaskStore for Store {
    async fn list_enabled_tasks(&self) -> Result<Vec<Task>, GobanError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE enabled = 1 ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GobanError::Store(format!("list enabled tasks failed: {e}")))?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn update_last_checked(&self, task_id: i64, at: DateTime<Utc>) -> Result<(), GobanError> {
        sqlx::query("UPDATE tasks SET last_checked_at = ? WHERE id = ?")
            .bind(to_db_time(at))
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(|e| GobanError::Store(format!("update last_checked_at failed: {e}")))?;
        Ok(())
    }
}
