mod defaults;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::GobanError;
use crate::model::RetryPolicy;
use defaults::*;

/// Top-level Goban configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub goban: GobanConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GobanConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GobanConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// SQLite store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Polling scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tick period. Independent of each task's own poll interval.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Upper bound on task runs in flight at once.
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
    /// Pause between complaints when a task sets none (keeps under 10 reports/min).
    #[serde(default = "default_action_delay_secs")]
    pub default_action_delay_secs: u64,
    /// Reason code attached to every complaint.
    #[serde(default = "default_report_reason")]
    pub report_reason: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_secs: default_tick_secs(),
            max_concurrent_runs: default_max_concurrent_runs(),
            default_action_delay_secs: default_action_delay_secs(),
            report_reason: default_report_reason(),
        }
    }
}

/// Login-code handshake settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginConfig {
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// How long a freshly captured credential is trusted.
    #[serde(default = "default_credential_lifetime_days")]
    pub credential_lifetime_days: i64,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            credential_lifetime_days: default_credential_lifetime_days(),
        }
    }
}

impl LoginConfig {
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl_secs as i64)
    }
}

/// Platform endpoints and transport defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_passport_base")]
    pub passport_base: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,
    #[serde(default = "default_retry_base_secs")]
    pub default_retry_base_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            api_base: default_api_base(),
            passport_base: default_passport_base(),
            user_agent: default_user_agent(),
            default_max_retries: default_max_retries(),
            default_retry_base_secs: default_retry_base_secs(),
        }
    }
}

impl RemoteConfig {
    /// Retry policy for tasks that do not set their own.
    pub fn default_retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.default_max_retries,
            base_interval: Duration::from_secs(self.default_retry_base_secs.max(1)),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// HTTP API for the login handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Bearer token for API authentication. Empty = no auth (for local-only use).
    #[serde(default)]
    pub api_key: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_api_host(),
            port: default_api_port(),
            api_key: String::new(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Upper bound for `login.credential_lifetime_days` (ten years).
pub const MAX_CREDENTIAL_LIFETIME_DAYS: i64 = 3650;

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, GobanError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| GobanError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| GobanError::Config(format!("failed to parse config: {}", e)))?;

    if config.scheduler.max_concurrent_runs == 0 {
        return Err(GobanError::Config(
            "scheduler.max_concurrent_runs must be at least 1".to_string(),
        ));
    }
    if config.scheduler.tick_secs == 0 {
        return Err(GobanError::Config(
            "scheduler.tick_secs must be at least 1".to_string(),
        ));
    }
    if !(1..=MAX_CREDENTIAL_LIFETIME_DAYS).contains(&config.login.credential_lifetime_days) {
        return Err(GobanError::Config(format!(
            "login.credential_lifetime_days must be between 1 and {MAX_CREDENTIAL_LIFETIME_DAYS}"
        )));
    }

    Ok(config)
}
