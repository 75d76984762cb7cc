use super::*;
use chrono::{Duration, TimeZone, Utc};
use goban_core::model::{ActionInsert, Identity, LogLevel, NewActionRecord, Task};
use goban_core::traits::{AccountStore, ActionStore, LogSink, TaskStore};

async fn test_store() -> Store {
    Store::in_memory().await.unwrap()
}

fn identity(uid: i64, name: &str) -> Identity {
    Identity {
        uid,
        name: name.to_string(),
        avatar_url: format!("https://img/{uid}.jpg"),
        level: 4,
    }
}

/// An account plus one enabled task watching uid 1000.
async fn seed(store: &Store) -> (i64, i64) {
    let now = Utc::now();
    let account = store
        .upsert_account(&identity(42, "watcher"), "SESSDATA=a; bili_jct=b", now, now + Duration::days(30))
        .await
        .unwrap();
    let task_id = store
        .insert_task(&NewTask {
            account_id: account.id,
            target_uid: 1000,
            target_name: "target".to_string(),
            keywords: "spam,scam".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    (account.id, task_id)
}

fn record(task_id: i64, comment_id: i64) -> NewActionRecord {
    NewActionRecord {
        task_id,
        item_id: 7,
        item_external_id: "BV1xx".to_string(),
        item_title: "upload".to_string(),
        comment_id,
        comment_body: "this is SPAM".to_string(),
        comment_author: "bot".to_string(),
        matched_keyword: "spam".to_string(),
        reason_code: 11,
        success: true,
        message: String::new(),
    }
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let store = test_store().await;
    Store::run_migrations(store.pool()).await.unwrap();
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _migrations")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(n, 1);
}

#[tokio::test]
async fn test_insert_and_list_enabled_tasks() {
    let store = test_store().await;
    let (account_id, task_id) = seed(&store).await;
    store
        .insert_task(&NewTask {
            account_id,
            target_uid: 2000,
            enabled: false,
            ..Default::default()
        })
        .await
        .unwrap();

    let tasks = store.list_enabled_tasks().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, task_id);
    assert_eq!(tasks[0].keyword_list(), vec!["spam", "scam"]);
    assert!(tasks[0].last_checked_at.is_none());
    assert_eq!(store.count_tasks().await.unwrap(), (2, 1));
}

#[tokio::test]
async fn test_update_last_checked() {
    let store = test_store().await;
    let (_, task_id) = seed(&store).await;
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

    store.update_last_checked(task_id, at).await.unwrap();

    let task: Task = store.get_task(task_id).await.unwrap();
    assert_eq!(task.last_checked_at, Some(at));
    assert!(!task.is_due(at + Duration::seconds(10)));
    assert!(task.is_due(at + Duration::seconds(300)));
}

#[tokio::test]
async fn test_get_task_not_found() {
    let store = test_store().await;
    let err = store.get_task(99).await.unwrap_err();
    assert!(matches!(err, goban_core::error::GobanError::NotFound(_)));
}

#[tokio::test]
async fn test_upsert_account_refreshes_profile() {
    let store = test_store().await;
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let first = store
        .upsert_account(&identity(42, "old"), "SESSDATA=a", now, now + Duration::days(30))
        .await
        .unwrap();
    store.mark_logged_out(first.id).await.unwrap();

    let later = now + Duration::days(2);
    let second = store
        .upsert_account(&identity(42, "new"), "SESSDATA=b", later, later + Duration::days(30))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.name, "new");
    assert_eq!(second.cookies, "SESSDATA=b");
    assert!(second.logged_in);
    assert_eq!(second.login_time, Some(later));
    assert_eq!(store.count_accounts().await.unwrap(), 1);
}

#[tokio::test]
async fn test_credential_for_task() {
    let store = test_store().await;
    let (account_id, task_id) = seed(&store).await;
    let task = store.get_task(task_id).await.unwrap();

    let cred = store.credential_for(&task).await.unwrap().unwrap();
    assert_eq!(cred.account_id, account_id);
    assert!(cred.is_valid(Utc::now()));

    store.mark_logged_out(account_id).await.unwrap();
    let cred = store.credential_for(&task).await.unwrap().unwrap();
    assert!(!cred.is_valid(Utc::now()));
}

#[tokio::test]
async fn test_credential_for_missing_account() {
    let store = test_store().await;
    let (_, task_id) = seed(&store).await;
    let mut task = store.get_task(task_id).await.unwrap();
    task.account_id = 999;
    assert!(store.credential_for(&task).await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_action_twice_keeps_one_record() {
    let store = test_store().await;
    let (_, task_id) = seed(&store).await;

    assert!(!store.action_exists(task_id, 555).await.unwrap());
    let first = store.create_action(&record(task_id, 555)).await.unwrap();
    let mut retry = record(task_id, 555);
    retry.success = false;
    retry.message = "second attempt".to_string();
    let second = store.create_action(&retry).await.unwrap();

    assert_eq!(first, ActionInsert::Created);
    assert_eq!(second, ActionInsert::Duplicate);
    assert!(store.action_exists(task_id, 555).await.unwrap());

    let actions = store.list_actions_for_task(task_id, 10).await.unwrap();
    assert_eq!(actions.len(), 1);
    assert!(actions[0].success);
    assert_eq!(actions[0].matched_keyword, "spam");
    assert_eq!(actions[0].reason_code, 11);
}

#[tokio::test]
async fn test_same_comment_different_tasks() {
    let store = test_store().await;
    let (account_id, task_a) = seed(&store).await;
    let task_b = store
        .insert_task(&NewTask {
            account_id,
            target_uid: 1000,
            keywords: "spam".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(
        store.create_action(&record(task_a, 1)).await.unwrap(),
        ActionInsert::Created
    );
    assert_eq!(
        store.create_action(&record(task_b, 1)).await.unwrap(),
        ActionInsert::Created
    );
}

#[tokio::test]
async fn test_task_logs_newest_first() {
    let store = test_store().await;
    let (_, task_id) = seed(&store).await;

    store.append(task_id, LogLevel::Info, "run started").await.unwrap();
    store
        .append(task_id, LogLevel::Error, "account not logged in")
        .await
        .unwrap();
    store.append(task_id + 1, LogLevel::Info, "other").await.unwrap();

    let logs = store.recent_logs(task_id, 10).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].level, "error");
    assert_eq!(logs[0].message, "account not logged in");
    assert_eq!(logs[1].level, "info");
    assert!(logs[1].created_at.is_some());
}

#[tokio::test]
async fn test_new_creates_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("goban.db");
    let config = goban_core::config::StoreConfig {
        db_path: db_path.to_string_lossy().into_owned(),
    };

    let store = Store::new(&config).await.unwrap();
    assert!(db_path.exists());
    assert_eq!(store.count_accounts().await.unwrap(), 0);
}
