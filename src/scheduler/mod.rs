//! Polling scheduler: ticks, gates due tasks, and spawns bounded concurrent runs.

mod run;


use chrono::{DateTime, Utc};
use goban_core::{
    config::SchedulerConfig,
    model::{Credential, LogLevel, RetryPolicy, Task},
    traits::{AccountStore, ActionStore, ClientFactory, LogSink, TaskStore},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Periodically runs every due monitoring task.
///
/// Cheap to clone; each spawned run holds its own clone.
#[derive(Clone)]
pub struct Scheduler {
    tasks: Arc<dyn TaskStore>,
    accounts: Arc<dyn AccountStore>,
    actions: Arc<dyn ActionStore>,
    logs: Arc<dyn LogSink>,
    clients: Arc<dyn ClientFactory>,
    config: SchedulerConfig,
    default_retry: RetryPolicy,
    permits: Arc<Semaphore>,
}

impl Scheduler {
    /// Build a scheduler over a store that covers every persistence trait.
    pub fn new<S>(
        store: Arc<S>,
        clients: Arc<dyn ClientFactory>,
        config: SchedulerConfig,
        default_retry: RetryPolicy,
    ) -> Self
    where
        S: TaskStore + AccountStore + ActionStore + LogSink + 'static,
    {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_runs.max(1)));
        Self {
            tasks: store.clone(),
            accounts: store.clone(),
            actions: store.clone(),
            logs: store,
            clients,
            config,
            default_retry,
            permits,
        }
    }

    /// Tick until `stop` flips to true, then wait for in-flight runs.
    pub async fn run_loop(self, mut stop: watch::Receiver<bool>) {
        let period = Duration::from_secs(self.config.tick_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; wait a full period before polling.
        ticker.tick().await;

        info!(
            "scheduler started (tick {}s, max {} concurrent runs)",
            period.as_secs(),
            self.config.max_concurrent_runs
        );

        let mut in_flight: Vec<JoinHandle<()>> = Vec::new();
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    in_flight.retain(|h| !h.is_finished());
                    in_flight.extend(self.tick(Utc::now()).await);
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        let pending = in_flight.iter().filter(|h| !h.is_finished()).count();
        info!("scheduler stopping, waiting for {pending} in-flight runs");
        for handle in in_flight {
            if let Err(e) = handle.await {
                error!("task run panicked: {e}");
            }
        }
        info!("scheduler stopped");
    }

    /// One scheduling pass. Returns handles of the runs it spawned.
    pub async fn tick(&self, now: DateTime<Utc>) -> Vec<JoinHandle<()>> {
        let tasks = match self.tasks.list_enabled_tasks().await {
            Ok(t) => t,
            Err(e) => {
                error!("scheduler: failed to load tasks: {e}");
                return Vec::new();
            }
        };

        let mut spawned = Vec::new();
        for task in tasks {
            if !task.is_due(now) {
                continue;
            }

            let Some(credential) = self.usable_credential(&task, now).await else {
                error!("task {}: account not logged in, skipping", task.id);
                self.log(task.id, LogLevel::Error, "account not logged in, skipping")
                    .await;
                continue;
            };

            // Over capacity: leave last_checked_at alone so the task stays due.
            let permit = match self.permits.clone().try_acquire_owned() {
                Ok(p) => p,
                Err(_) => {
                    debug!("task {}: all run slots busy, deferring", task.id);
                    continue;
                }
            };

            if let Err(e) = self.tasks.update_last_checked(task.id, now).await {
                error!("task {}: failed to mark checked: {e}", task.id);
                continue;
            }

            let this = self.clone();
            spawned.push(tokio::spawn(async move {
                let _permit = permit;
                this.run_task(&task, &credential).await;
            }));
        }
        spawned
    }

    async fn usable_credential(&self, task: &Task, now: DateTime<Utc>) -> Option<Credential> {
        match self.accounts.credential_for(task).await {
            Ok(cred) => cred.filter(|c| c.is_valid(now)),
            Err(e) => {
                warn!("task {}: credential lookup failed: {e}", task.id);
                None
            }
        }
    }

    /// Append to the task log. Failures only reach the tracing log.
    async fn log(&self, task_id: i64, level: LogLevel, message: &str) {
        if let Err(e) = self.logs.append(task_id, level, message).await {
            warn!("task {task_id}: failed to write task log: {e}");
        }
    }
}
