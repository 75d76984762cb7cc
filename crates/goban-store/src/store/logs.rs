use super::{to_db_time, Store};
use async_trait::async_trait;
use chrono::Utc;
use goban_core::{error::GobanError, model::LogLevel, traits::LogSink};

/// One line of a task's operator log.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct TaskLogEntry {
    pub level: String,
    pub message: String,
    pub created_at: Option<chrono::DateTime<Utc>>,
}

#[cfg(test)]
impl Store {
    /// Newest entries first.
    pub(crate) async fn recent_logs(
        &self,
        task_id: i64,
        limit: i64,
    ) -> Result<Vec<TaskLogEntry>, GobanError> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT level, message, created_at FROM task_logs \
             WHERE task_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(task_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GobanError::Store(format!("read task logs failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(level, message, created_at)| TaskLogEntry {
                level,
                message,
                created_at: super::from_db_time(Some(created_at)),
            })
            .collect())
    }
}

#[async_trait]
impl LogSink for Store {
    async fn append(&self, task_id: i64, level: LogLevel, message: &str) -> Result<(), GobanError> {
        sqlx::query("INSERT INTO task_logs (task_id, level, message, created_at) VALUES (?, ?, ?, ?)")
            .bind(task_id)
            .bind(level.as_str())
            .bind(message)
            .bind(to_db_time(Utc::now()))
            .execute(&self.pool)
            .await
            .map_err(|e| GobanError::Store(format!("append task log failed: {e}")))?;
        Ok(())
    }
}
