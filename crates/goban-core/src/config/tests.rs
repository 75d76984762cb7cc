use super::*;
use std::io::Write;

#[test]
fn test_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.scheduler.tick_secs, 10);
    assert_eq!(cfg.scheduler.default_action_delay_secs, 6);
    assert_eq!(cfg.scheduler.report_reason, 11);
    assert_eq!(cfg.login.session_ttl_secs, 180);
    assert_eq!(cfg.login.credential_lifetime_days, 30);
    assert_eq!(cfg.remote.default_retry(), RetryPolicy::default());
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let toml_str = r#"
        [scheduler]
        tick_secs = 5

        [api]
        port = 9000
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.scheduler.tick_secs, 5);
    assert_eq!(cfg.scheduler.max_concurrent_runs, 8);
    assert_eq!(cfg.api.port, 9000);
    assert_eq!(cfg.api.host, "127.0.0.1");
    assert_eq!(cfg.goban.log_level, "info");
}

#[test]
fn test_zero_retry_base_is_clamped() {
    let toml_str = r#"
        [remote]
        default_retry_base_secs = 0
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.remote.default_retry().base_interval, Duration::from_secs(1));
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = load("/nonexistent/__goban_config__.toml").unwrap();
    assert_eq!(cfg.store.db_path, "~/.goban/data/goban.db");
}

#[test]
fn test_load_rejects_zero_concurrency() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[scheduler]\nmax_concurrent_runs = 0").unwrap();
    let err = load(file.path().to_str().unwrap()).unwrap_err();
    assert!(matches!(err, GobanError::Config(_)));
}

#[test]
fn test_load_rejects_out_of_range_credential_lifetime() {
    for days in ["0", "-1", "9223372036854775807"] {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[login]\ncredential_lifetime_days = {days}").unwrap();
        let err = load(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, GobanError::Config(_)), "{days} accepted");
    }
}

#[test]
fn test_load_invalid_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[scheduler\ntick_secs = ").unwrap();
    assert!(load(file.path().to_str().unwrap()).is_err());
}

#[test]
fn test_shellexpand_home() {
    if let Some(home) = std::env::var_os("HOME") {
        let expanded = shellexpand("~/.goban/x.db");
        assert_eq!(expanded, format!("{}/.goban/x.db", home.to_string_lossy()));
    }
    assert_eq!(shellexpand("/abs/path"), "/abs/path");
}
