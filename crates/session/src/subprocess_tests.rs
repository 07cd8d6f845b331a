// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::BTreeMap;

fn account(id: &str, state_dir: &std::path::Path) -> AccountConfig {
    AccountConfig {
        id: id.to_string(),
        state_dir: state_dir.to_path_buf(),
        start_command: None,
        health_command: None,
        task_command: None,
        env: BTreeMap::new(),
        max_concurrency: 1,
    }
}

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

#[tokio::test]
async fn start_creates_state_dir_even_without_start_command() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state_dir = dir.path().join("nested").join("state");
    let sess = SubprocessSession::new(account("a", &state_dir));

    sess.start().await.expect("start");

    assert!(state_dir.is_dir());
}

#[tokio::test]
async fn start_is_noop_when_already_running() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pidfile = dir.path().join("pids");
    let mut cfg = account("a", dir.path());
    cfg.start_command = Some(sh(&format!(
        "echo $$ >> {} && sleep 5",
        pidfile.display()
    )));
    let sess = SubprocessSession::new(cfg);

    sess.start().await.expect("start");
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    sess.start().await.expect("start again");
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    sess.stop().await;

    let recorded = tokio::fs::read_to_string(&pidfile).await.expect("read pidfile");
    assert_eq!(recorded.lines().count(), 1, "second start should not respawn");
}

#[tokio::test]
async fn stop_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = account("a", dir.path());
    cfg.start_command = Some(sh("sleep 5"));
    let sess = SubprocessSession::new(cfg);

    sess.start().await.expect("start");
    sess.stop().await;
    sess.stop().await; // must not panic or hang
}

#[tokio::test]
async fn stop_without_start_is_noop() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sess = SubprocessSession::new(account("a", dir.path()));
    sess.stop().await;
}

#[tokio::test]
async fn is_healthy_true_with_no_commands_configured() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sess = SubprocessSession::new(account("a", dir.path()));
    assert!(sess.is_healthy().await);
}

#[tokio::test]
async fn is_healthy_reflects_start_command_liveness() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = account("a", dir.path());
    cfg.start_command = Some(sh("sleep 5"));
    let sess = SubprocessSession::new(cfg);

    sess.start().await.expect("start");
    assert!(sess.is_healthy().await);

    sess.stop().await;
    assert!(!sess.is_healthy().await);
}

#[tokio::test]
async fn is_healthy_runs_health_command() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = account("a", dir.path());
    cfg.health_command = Some(sh("exit 0"));
    let sess = SubprocessSession::new(cfg);
    assert!(sess.is_healthy().await);

    let mut cfg = account("b", dir.path());
    cfg.health_command = Some(sh("exit 1"));
    let sess = SubprocessSession::new(cfg);
    assert!(!sess.is_healthy().await);
}

#[tokio::test]
async fn run_task_without_task_command_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sess = SubprocessSession::new(account("a", dir.path()));

    let err = sess.run_task(serde_json::json!({})).await.unwrap_err();
    assert!(matches!(err, SessionError::NoTaskCommand { .. }));
}

#[tokio::test]
async fn run_task_parses_json_stdout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = account("a", dir.path());
    cfg.task_command = Some(sh("cat"));
    let sess = SubprocessSession::new(cfg);

    let result = sess
        .run_task(serde_json::json!({"hello": "world"}))
        .await
        .expect("run_task");

    assert_eq!(result, serde_json::json!({"hello": "world"}));
}

#[tokio::test]
async fn run_task_wraps_non_json_stdout_as_raw() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = account("a", dir.path());
    cfg.task_command = Some(sh("echo not-json"));
    let sess = SubprocessSession::new(cfg);

    let result = sess.run_task(serde_json::json!({})).await.expect("run_task");
    assert_eq!(result["raw"].as_str(), Some("not-json\n"));
}

#[tokio::test]
async fn run_task_surfaces_non_zero_exit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = account("a", dir.path());
    cfg.task_command = Some(sh("echo boom 1>&2 && exit 7"));
    let sess = SubprocessSession::new(cfg);

    let err = sess.run_task(serde_json::json!({})).await.unwrap_err();
    match err {
        SessionError::TaskFailed {
            account_id,
            exit_code,
            stderr,
        } => {
            assert_eq!(account_id, "a");
            assert_eq!(exit_code, Some(7));
            assert!(stderr.contains("boom"));
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn run_task_env_receives_account_env_and_ag_config_dir() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = account("a", dir.path());
    cfg.env.insert("AG_CONFIG_DIR".to_string(), dir.path().display().to_string());
    cfg.env.insert("FOO".to_string(), "bar".to_string());
    cfg.task_command = Some(sh("printf '{\"dir\":\"%s\",\"foo\":\"%s\"}' \"$AG_CONFIG_DIR\" \"$FOO\""));
    let sess = SubprocessSession::new(cfg);

    let result = sess.run_task(serde_json::json!({})).await.expect("run_task");
    assert_eq!(result["dir"].as_str(), Some(dir.path().display().to_string().as_str()));
    assert_eq!(result["foo"].as_str(), Some("bar"));
}
