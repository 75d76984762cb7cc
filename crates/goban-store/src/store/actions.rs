//! Complaint records.

use super::{to_db_time, Store};
use async_trait::async_trait;
use chrono::Utc;
use goban_core::{
    error::GobanError,
    model::{ActionInsert, NewActionRecord},
    traits::ActionStore,
};
use tracing::debug;

#[cfg(test)]
#[derive(sqlx::FromRow)]
struct ActionRow {
    id: i64,
    task_id: i64,
    item_id: i64,
    item_external_id: String,
    item_title: String,
    comment_id: i64,
    comment_body: String,
    comment_author: String,
    matched_keyword: String,
    reason_code: i64,
    success: bool,
    message: String,
    created_at: String,
}

#[cfg(test)]
impl From<ActionRow> for goban_core::model::ActionRecord {
    fn from(r: ActionRow) -> Self {
        Self {
            id: r.id,
            task_id: r.task_id,
            item_id: r.item_id,
            item_external_id: r.item_external_id,
            item_title: r.item_title,
            comment_id: r.comment_id,
            comment_body: r.comment_body,
            comment_author: r.comment_author,
            matched_keyword: r.matched_keyword,
            reason_code: r.reason_code as i32,
            success: r.success,
            message: r.message,
            created_at: super::from_db_time(Some(r.created_at)).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
impl Store {
    /// Newest records first.
    pub(crate) async fn list_actions_for_task(
        &self,
        task_id: i64,
        limit: i64,
    ) -> Result<Vec<goban_core::model::ActionRecord>, GobanError> {
        let rows: Vec<ActionRow> = sqlx::query_as(
            "SELECT id, task_id, item_id, item_external_id, item_title, comment_id, comment_body, \
             comment_author, matched_keyword, reason_code, success, message, created_at \
             FROM action_records WHERE task_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(task_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GobanError::Store(format!("list actions failed: {e}")))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ActionStore for Store {
    async fn action_exists(&self, task_id: i64, comment_id: i64) -> Result<bool, GobanError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM action_records WHERE task_id = ? AND comment_id = ?")
                .bind(task_id)
                .bind(comment_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| GobanError::Store(format!("action lookup failed: {e}")))?;
        Ok(row.is_some())
    }

    async fn create_action(&self, record: &NewActionRecord) -> Result<ActionInsert, GobanError> {
        let result = sqlx::query(
            "INSERT INTO action_records (task_id, item_id, item_external_id, item_title, \
             comment_id, comment_body, comment_author, matched_keyword, reason_code, success, \
             message, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(task_id, comment_id) DO NOTHING",
        )
        .bind(record.task_id)
        .bind(record.item_id)
        .bind(&record.item_external_id)
        .bind(&record.item_title)
        .bind(record.comment_id)
        .bind(&record.comment_body)
        .bind(&record.comment_author)
        .bind(&record.matched_keyword)
        .bind(record.reason_code)
        .bind(record.success)
        .bind(&record.message)
        .bind(to_db_time(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| GobanError::Store(format!("create action failed: {e}")))?;

        if result.rows_affected() == 0 {
            debug!(
                "action for task {} comment {} already recorded",
                record.task_id, record.comment_id
            );
            return Ok(ActionInsert::Duplicate);
        }
        Ok(ActionInsert::Created)
    }
}
