//! Wires the store, remote clients, scheduler, login flow, and API together.

use crate::{
    api,
    login::{LoginService, MemorySessions},
    scheduler::Scheduler,
};
use goban_core::{config::Config, model::ClientOptions};
use goban_remote::{HttpClientFactory, PassportClient};
use goban_store::Store;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Run every background loop until Ctrl-C, then shut down in order.
pub async fn run(cfg: Config) -> anyhow::Result<()> {
    let store = Arc::new(Store::new(&cfg.store).await?);
    let clients = Arc::new(HttpClientFactory::new(cfg.remote.clone()));
    let passport = Arc::new(PassportClient::new(&cfg.remote)?);
    let default_retry = cfg.remote.default_retry();

    let login = Arc::new(LoginService::new(
        passport,
        Arc::new(MemorySessions::new()),
        store.clone(),
        clients.clone(),
        ClientOptions {
            proxy_url: None,
            retry: default_retry,
        },
        cfg.login.clone(),
    ));

    let (stop_tx, stop_rx) = watch::channel(false);

    let sched_handle = if cfg.scheduler.enabled {
        let scheduler = Scheduler::new(
            store.clone(),
            clients.clone(),
            cfg.scheduler.clone(),
            default_retry,
        );
        let rx = stop_rx.clone();
        Some(tokio::spawn(scheduler.run_loop(rx)))
    } else {
        info!("scheduler disabled");
        None
    };

    let sweep_handle = tokio::spawn(login.clone().sweep_loop(stop_rx.clone()));

    let api_handle = if cfg.api.enabled {
        Some(tokio::spawn(api::serve(
            cfg.api.clone(),
            login.clone(),
            stop_rx.clone(),
        )))
    } else {
        None
    };

    info!("{} started", cfg.goban.name);

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
    }
    info!("Received shutdown signal");
    let _ = stop_tx.send(true);

    for (name, handle) in [
        ("scheduler", sched_handle),
        ("session sweeper", Some(sweep_handle)),
        ("api", api_handle),
    ] {
        if let Some(h) = handle {
            join(name, h).await;
        }
    }

    store.pool().close().await;
    info!("{} stopped", cfg.goban.name);
    Ok(())
}

async fn join(name: &str, handle: JoinHandle<()>) {
    if let Err(e) = handle.await {
        error!("{name} task failed: {e}");
    }
}
