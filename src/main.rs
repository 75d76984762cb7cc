mod api;
mod login;
mod scheduler;
mod service;

use clap::{Parser, Subcommand};
use goban_core::config::{self, shellexpand, Config};
use goban_store::Store;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "goban",
    version,
    about = "Watches uploads for keyword comments and reports them"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, env = "GOBAN_CONFIG", default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the scheduler, login API, and session sweeper.
    Start,
    /// Show configuration and store counts.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Start => {
            let _guard = init_tracing(&cfg, true);
            service::run(cfg).await?;
        }
        Commands::Status => {
            let _guard = init_tracing(&cfg, false);
            print_status(&cli.config, &cfg).await?;
        }
    }

    Ok(())
}

/// Stderr logging, plus a daily log file under `<data_dir>/logs` when `to_file`.
///
/// The returned guard flushes the file writer on drop.
fn init_tracing(cfg: &Config, to_file: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.goban.log_level.as_str()));
    let stderr = fmt::layer().with_writer(std::io::stderr);

    if !to_file {
        tracing_subscriber::registry().with(filter).with(stderr).init();
        return None;
    }

    let log_dir = format!("{}/logs", shellexpand(&cfg.goban.data_dir));
    let appender = tracing_appender::rolling::daily(&log_dir, "goban.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Some(guard)
}

async fn print_status(config_path: &str, cfg: &Config) -> anyhow::Result<()> {
    println!("{} status\n", cfg.goban.name);
    println!("Config:    {config_path}");
    println!("Database:  {}", shellexpand(&cfg.store.db_path));
    println!(
        "Scheduler: {} (tick {}s, max {} concurrent runs)",
        if cfg.scheduler.enabled { "enabled" } else { "disabled" },
        cfg.scheduler.tick_secs,
        cfg.scheduler.max_concurrent_runs
    );
    println!(
        "API:       {}",
        if cfg.api.enabled {
            format!("http://{}:{}", cfg.api.host, cfg.api.port)
        } else {
            "disabled".to_string()
        }
    );
    println!();

    let store = Store::new(&cfg.store).await?;
    let accounts = store.count_accounts().await?;
    let (tasks, enabled) = store.count_tasks().await?;
    println!("  accounts: {accounts}");
    println!("  tasks:    {tasks} ({enabled} enabled)");
    Ok(())
}
