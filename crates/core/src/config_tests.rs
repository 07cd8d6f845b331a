// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

fn write_temp(suffix: &str, contents: &str) -> tempfile::TempPath {
    let mut f = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    f.write_all(contents.as_bytes()).expect("write temp file");
    f.into_temp_path()
}

#[test]
fn loads_minimal_json_with_defaults() {
    let path = write_temp(
        ".json",
        r#"{"accounts": [{"id": "a", "stateDir": "/tmp/a"}]}"#,
    );
    let cfg = OrchestratorConfig::load(&path).expect("load");

    assert_eq!(cfg.server, ServerConfig::default());
    assert_eq!(cfg.dispatcher, DispatcherConfig::default());
    assert_eq!(cfg.accounts.len(), 1);
    assert_eq!(cfg.accounts[0].id, "a");
    assert_eq!(cfg.accounts[0].max_concurrency, 1);
    assert_eq!(
        cfg.accounts[0].env.get("AG_CONFIG_DIR").map(String::as_str),
        Some("/tmp/a")
    );
}

#[test]
fn loads_yaml_by_extension() {
    let path = write_temp(
        ".yaml",
        "server:\n  host: 0.0.0.0\n  port: 9090\naccounts:\n  - id: a\n    stateDir: /tmp/a\n",
    );
    let cfg = OrchestratorConfig::load(&path).expect("load");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9090);
}

#[test]
fn dispatcher_fields_are_parsed() {
    let path = write_temp(
        ".json",
        r#"{
            "dispatcher": {
                "routing": "LRU",
                "globalQueueSize": 5,
                "perAccountQueueSize": 3,
                "taskTimeoutSeconds": 30,
                "healthCheckIntervalSeconds": 2
            },
            "accounts": [{"id": "a", "stateDir": "/tmp/a"}]
        }"#,
    );
    let cfg = OrchestratorConfig::load(&path).expect("load");
    assert_eq!(cfg.dispatcher.routing, RoutingStrategy::Lru);
    assert_eq!(cfg.dispatcher.global_queue_size, 5);
    assert_eq!(cfg.dispatcher.per_account_queue_size, 3);
    assert_eq!(cfg.dispatcher.task_timeout_seconds, 30);
    assert_eq!(cfg.dispatcher.health_check_interval_seconds, 2);
}

#[test]
fn routing_aliases_are_case_insensitive() {
    assert_eq!(
        "round-robin".parse::<RoutingStrategy>().unwrap(),
        RoutingStrategy::RoundRobin
    );
    assert_eq!(
        "Health-Score".parse::<RoutingStrategy>().unwrap(),
        RoutingStrategy::Health
    );
    assert_eq!(
        "LEAST_RECENTLY_USED".parse::<RoutingStrategy>().unwrap(),
        RoutingStrategy::Lru
    );
    assert!("bogus".parse::<RoutingStrategy>().is_err());
}

#[test]
fn missing_file_is_not_found() {
    let err = OrchestratorConfig::load(Path::new("/no/such/file.json")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn empty_accounts_is_rejected() {
    let path = write_temp(".json", r#"{"accounts": []}"#);
    let err = OrchestratorConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::NoAccounts));
}

#[test]
fn missing_account_id_is_rejected() {
    let path = write_temp(".json", r#"{"accounts": [{"stateDir": "/tmp/a"}]}"#);
    let err = OrchestratorConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::MissingAccountId));
}

#[test]
fn missing_state_dir_is_rejected() {
    let path = write_temp(".json", r#"{"accounts": [{"id": "a"}]}"#);
    let err = OrchestratorConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::MissingStateDir(id) if id == "a"));
}

#[test]
fn duplicate_account_id_is_rejected() {
    let path = write_temp(
        ".json",
        r#"{"accounts": [{"id": "a", "stateDir": "/tmp/a"}, {"id": "a", "stateDir": "/tmp/b"}]}"#,
    );
    let err = OrchestratorConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateAccountId(id) if id == "a"));
}

#[test]
fn max_concurrency_is_clamped_to_at_least_one() {
    let path = write_temp(
        ".json",
        r#"{"accounts": [{"id": "a", "stateDir": "/tmp/a", "maxConcurrency": 0}]}"#,
    );
    let cfg = OrchestratorConfig::load(&path).expect("load");
    assert_eq!(cfg.accounts[0].max_concurrency, 1);
}

#[test]
fn explicit_ag_config_dir_wins_over_default() {
    let path = write_temp(
        ".json",
        r#"{"accounts": [{"id": "a", "stateDir": "/tmp/a", "env": {"AG_CONFIG_DIR": "/custom"}}]}"#,
    );
    let cfg = OrchestratorConfig::load(&path).expect("load");
    assert_eq!(
        cfg.accounts[0].env.get("AG_CONFIG_DIR").map(String::as_str),
        Some("/custom")
    );
}

#[test]
fn tilde_is_expanded_in_state_dir() {
    let Some(home) = dirs::home_dir() else {
        return;
    };
    let path = write_temp(
        ".json",
        r#"{"accounts": [{"id": "a", "stateDir": "~/agyc-state"}]}"#,
    );
    let cfg = OrchestratorConfig::load(&path).expect("load");
    assert_eq!(cfg.accounts[0].state_dir, home.join("agyc-state"));
}
