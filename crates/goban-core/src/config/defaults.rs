pub(super) fn default_name() -> String {
    "goban".to_string()
}
pub(super) fn default_data_dir() -> String {
    "~/.goban".to_string()
}
pub(super) fn default_log_level() -> String {
    "info".to_string()
}
pub(super) fn default_true() -> bool {
    true
}
pub(super) fn default_db_path() -> String {
    "~/.goban/data/goban.db".to_string()
}
pub(super) fn default_tick_secs() -> u64 {
    10
}
pub(super) fn default_max_concurrent_runs() -> usize {
    8
}
pub(super) fn default_action_delay_secs() -> u64 {
    6
}
pub(super) fn default_report_reason() -> i32 {
    11
}
pub(super) fn default_session_ttl_secs() -> u64 {
    180
}
pub(super) fn default_sweep_interval_secs() -> u64 {
    60
}
pub(super) fn default_credential_lifetime_days() -> i64 {
    30
}
pub(super) fn default_timeout_secs() -> u64 {
    30
}
pub(super) fn default_api_base() -> String {
    "https://api.bilibili.com".to_string()
}
pub(super) fn default_passport_base() -> String {
    "https://passport.bilibili.com".to_string()
}
pub(super) fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36"
        .to_string()
}
pub(super) fn default_max_retries() -> u32 {
    3
}
pub(super) fn default_retry_base_secs() -> u64 {
    2
}
pub(super) fn default_api_host() -> String {
    "127.0.0.1".to_string()
}
pub(super) fn default_api_port() -> u16 {
    8080
}
