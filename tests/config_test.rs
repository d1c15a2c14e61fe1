use dispatchq::config::{Config, DispatchConfig};
use dispatchq::error::Error;
use std::time::Duration;

#[test]
fn defaults_describe_the_reference_run() {
    let cfg = DispatchConfig::default();
    assert_eq!(cfg.workers, vec!["Remy", "Linguini", "Colette"]);
    assert_eq!(cfg.producers.len(), 10);
    assert_eq!(cfg.capacity, 3);
    assert_eq!(cfg.target, 5);
    assert_eq!(cfg.deadline(), Some(Duration::from_secs(7)));
    assert_eq!(cfg.time_unit(), Duration::from_millis(500));
    cfg.validate().unwrap();
}

#[test]
fn partial_toml_keeps_defaults_for_missing_keys() {
    let cfg = DispatchConfig::from_toml_str(
        r#"
        workers = ["Solo"]
        capacity = 1
        deadline_ms = 0
        "#,
    )
    .unwrap();

    assert_eq!(cfg.workers, vec!["Solo"]);
    assert_eq!(cfg.capacity, 1);
    assert_eq!(cfg.deadline(), None);
    assert_eq!(cfg.target, 5);
    assert_eq!(cfg.producers.len(), 10);
}

#[test]
fn empty_worker_roster_is_rejected() {
    let result = DispatchConfig::from_toml_str("workers = []");
    assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("worker")));
}

#[test]
fn zero_capacity_is_rejected() {
    assert!(DispatchConfig::from_toml_str("capacity = 0").is_err());
}

#[test]
fn duplicate_names_are_rejected() {
    let result = DispatchConfig::from_toml_str(r#"producers = ["Ani", "Bai", "Ani"]"#);
    assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("duplicate producer")));
}

#[test]
fn malformed_toml_is_a_config_error() {
    assert!(matches!(
        DispatchConfig::from_toml_str("capacity = \"three\""),
        Err(Error::Config(_))
    ));
}

#[test]
fn load_reads_file_and_round_trips() {
    let mut cfg = DispatchConfig::default();
    cfg.target = 2;
    cfg.deadline_ms = 250;

    let path = std::env::temp_dir().join(format!("dispatchq-{}.toml", std::process::id()));
    std::fs::write(&path, cfg.to_toml_string().unwrap()).unwrap();
    let loaded = DispatchConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, cfg);
}

#[test]
fn load_missing_file_is_a_config_error() {
    let path = std::env::temp_dir().join("dispatchq-does-not-exist.toml");
    assert!(matches!(DispatchConfig::load(&path), Err(Error::Config(_))));
}

#[test]
fn config_from_env_reads_optional_vars() {
    unsafe {
        std::env::set_var("LOG_LEVEL", "debug");
        std::env::set_var("OTEL_ENDPOINT", "http://localhost:4317");
        std::env::remove_var("DISPATCHQ_CONFIG");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.otel_endpoint.as_deref(), Some("http://localhost:4317"));
    assert!(config.dispatch_path.is_none());
    assert_eq!(config.dispatch().unwrap(), DispatchConfig::default());

    unsafe {
        std::env::remove_var("LOG_LEVEL");
        std::env::remove_var("OTEL_ENDPOINT");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.log_level, "info");
    assert!(config.otel_endpoint.is_none());
}
