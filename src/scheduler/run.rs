//! A single monitoring run: fetch uploads, scan comments, file complaints.

use super::Scheduler;
use goban_core::{
    error::RemoteError,
    keywords::first_match,
    model::{
        ActionInsert, ClientOptions, Credential, LogLevel, NewActionRecord, RemoteComment,
        RemoteItem, Task,
    },
    traits::Platform,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What one run did. Logged at the end of the run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub items: usize,
    pub items_skipped: usize,
    pub comments: usize,
    pub matches: usize,
    pub reported: usize,
    pub failed: usize,
    pub already_handled: usize,
}

impl Scheduler {
    pub(crate) async fn run_task(&self, task: &Task, credential: &Credential) -> RunReport {
        let mut report = RunReport::default();

        let keywords = task.keyword_list();
        if keywords.is_empty() {
            warn!("task {}: no keywords configured, skipping", task.id);
            self.log(task.id, LogLevel::Warning, "no keywords configured, skipping")
                .await;
            return report;
        }

        let options = ClientOptions {
            proxy_url: task.proxy().map(str::to_string),
            retry: task.retry_policy(self.default_retry),
        };
        let client = match self.clients.build(&credential.cookies, &options) {
            Ok(c) => c,
            Err(e) => {
                error!("task {}: cannot build client: {e}", task.id);
                self.log(task.id, LogLevel::Error, &format!("cannot build client: {e}"))
                    .await;
                return report;
            }
        };

        let target = self.target_label(task, client.as_ref()).await;
        info!("task {}: checking {target}", task.id);
        self.log(task.id, LogLevel::Info, &format!("checking {target}"))
            .await;
        if let Some(proxy) = &options.proxy_url {
            self.log(task.id, LogLevel::Info, &format!("using proxy {proxy}"))
                .await;
        }

        let items = match client.list_items(task.target_uid, task.item_count).await {
            Ok(items) => items,
            Err(RemoteError::InvalidCredential) => {
                self.credential_rejected(task, credential).await;
                return report;
            }
            Err(e) => {
                error!("task {}: failed to fetch uploads: {e}", task.id);
                self.log(task.id, LogLevel::Error, &format!("failed to fetch uploads: {e}"))
                    .await;
                return report;
            }
        };
        report.items = items.len();

        for item in &items {
            let comments = match client.list_comments(item.id, task.comment_count).await {
                Ok(c) => c,
                Err(RemoteError::InvalidCredential) => {
                    self.credential_rejected(task, credential).await;
                    return report;
                }
                Err(e) => {
                    warn!("task {}: comments of {} unavailable: {e}", task.id, item.external_id);
                    self.log(
                        task.id,
                        LogLevel::Error,
                        &format!("failed to fetch comments of {}: {e}", item.external_id),
                    )
                    .await;
                    report.items_skipped += 1;
                    continue;
                }
            };
            report.comments += comments.len();

            for comment in &comments {
                let Some(keyword) = first_match(&comment.body, &keywords) else {
                    continue;
                };
                report.matches += 1;
                info!(
                    "task {}: comment {} matches \"{keyword}\"",
                    task.id, comment.id
                );
                self.handle_match(task, &client, item, comment, &keyword, &mut report)
                    .await;
            }
        }

        info!("task {}: run finished {report:?}", task.id);
        self.log(
            task.id,
            LogLevel::Info,
            &format!(
                "run finished: {} uploads, {} comments, {} reported, {} failed",
                report.items, report.comments, report.reported, report.failed
            ),
        )
        .await;
        report
    }

    /// Dedup, file the complaint, record it, then pause before the next one.
    async fn handle_match(
        &self,
        task: &Task,
        client: &Arc<dyn Platform>,
        item: &RemoteItem,
        comment: &RemoteComment,
        keyword: &str,
        report: &mut RunReport,
    ) {
        match self.actions.action_exists(task.id, comment.id).await {
            Ok(true) => {
                report.already_handled += 1;
                return;
            }
            Ok(false) => {}
            Err(e) => {
                // Without the lookup a second complaint could be filed.
                warn!("task {}: dedup lookup failed, not reporting: {e}", task.id);
                return;
            }
        }

        let outcome = client
            .submit_complaint(item.id, comment.id, self.config.report_reason)
            .await;
        let (success, message) = match &outcome {
            Ok(()) => (true, "reported".to_string()),
            Err(e) => (false, e.to_string()),
        };

        let record = NewActionRecord {
            task_id: task.id,
            item_id: item.id,
            item_external_id: item.external_id.clone(),
            item_title: item.title.clone(),
            comment_id: comment.id,
            comment_body: comment.body.clone(),
            comment_author: comment.author_name.clone(),
            matched_keyword: keyword.to_string(),
            reason_code: self.config.report_reason,
            success,
            message,
        };
        // The index stops a second record, not a second filing: the complaint
        // already went out when a concurrent run won the insert.
        let duplicate = match self.actions.create_action(&record).await {
            Ok(ActionInsert::Created) => false,
            Ok(ActionInsert::Duplicate) => {
                info!("task {}: comment {} already handled", task.id, comment.id);
                true
            }
            Err(e) => {
                error!("task {}: failed to save action record: {e}", task.id);
                false
            }
        };

        match outcome {
            _ if duplicate => report.already_handled += 1,
            Ok(()) => {
                report.reported += 1;
                self.log(
                    task.id,
                    LogLevel::Info,
                    &format!("reported comment {} (keyword \"{keyword}\")", comment.id),
                )
                .await;
            }
            Err(e) => {
                report.failed += 1;
                self.log(
                    task.id,
                    LogLevel::Error,
                    &format!("report of comment {} failed: {e}", comment.id),
                )
                .await;
            }
        }

        tokio::time::sleep(task.action_delay(self.config.default_action_delay_secs)).await;
    }

    /// The platform refused the cookie: park the account until it logs in again.
    async fn credential_rejected(&self, task: &Task, credential: &Credential) {
        error!(
            "task {}: credential of account {} rejected, marking logged out",
            task.id, credential.account_id
        );
        if let Err(e) = self.accounts.mark_logged_out(credential.account_id).await {
            error!("task {}: failed to mark account logged out: {e}", task.id);
        }
        self.log(
            task.id,
            LogLevel::Error,
            "credential rejected by the platform, account logged out",
        )
        .await;
    }

    /// The task's target name, looked up on the platform when unset.
    async fn target_label(&self, task: &Task, client: &dyn Platform) -> String {
        if !task.target_name.trim().is_empty() {
            return format!("{} ({})", task.target_name, task.target_uid);
        }
        match client.fetch_user_name(task.target_uid).await {
            Ok(name) if !name.is_empty() => format!("{name} ({})", task.target_uid),
            Ok(_) => task.target_uid.to_string(),
            Err(e) => {
                warn!("task {}: target name lookup failed: {e}", task.id);
                task.target_uid.to_string()
            }
        }
    }
}
