// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

use agyc_session::{FakeSession, Session};

use super::*;

fn handle(id: &str, fake: Arc<FakeSession>) -> SessionHandle {
    SessionHandle {
        account_id: id.to_string(),
        session: fake as Arc<dyn Session>,
        max_concurrency: 1,
    }
}

#[tokio::test]
async fn start_all_starts_every_session() {
    let a = Arc::new(FakeSession::new());
    let b = Arc::new(FakeSession::new());
    let mut sessions = IndexMap::new();
    sessions.insert("a".to_string(), handle("a", a.clone()));
    sessions.insert("b".to_string(), handle("b", b.clone()));
    let manager = SessionManager::from_handles(sessions, 5);

    manager.start_all().await.unwrap();

    assert_eq!(a.start_calls(), 1);
    assert_eq!(b.start_calls(), 1);

    manager.stop_all().await;
}

#[tokio::test]
async fn start_all_propagates_a_failed_start() {
    let a = Arc::new(FakeSession::new());
    a.set_start_ok(false);
    let mut sessions = IndexMap::new();
    sessions.insert("a".to_string(), handle("a", a));
    let manager = SessionManager::from_handles(sessions, 5);

    let err = manager.start_all().await.unwrap_err();
    assert!(matches!(err, agyc_session::SessionError::Simulated(_)));
}

#[tokio::test]
async fn stop_all_stops_every_session() {
    let a = Arc::new(FakeSession::new());
    let mut sessions = IndexMap::new();
    sessions.insert("a".to_string(), handle("a", a.clone()));
    let manager = SessionManager::from_handles(sessions, 5);

    manager.start_all().await.unwrap();
    manager.stop_all().await;

    assert_eq!(a.stop_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn supervisor_restarts_an_unhealthy_session() {
    let a = Arc::new(FakeSession::new());
    let mut sessions = IndexMap::new();
    sessions.insert("a".to_string(), handle("a", a.clone()));
    let manager = SessionManager::from_handles(sessions, 1);

    manager.start_all().await.unwrap();
    assert_eq!(a.start_calls(), 1);

    a.set_healthy(false);
    tokio::time::advance(Duration::from_secs(2)).await;
    tokio::task::yield_now().await;

    assert_eq!(a.stop_calls(), 1);
    assert_eq!(a.start_calls(), 2);

    manager.stop_all().await;
}

#[tokio::test(start_paused = true)]
async fn wedged_probe_does_not_block_the_next_round() {
    let a = Arc::new(FakeSession::new());
    // The probe itself never answers within the check interval.
    a.set_health_check_delay(Some(Duration::from_secs(10))).await;
    let mut sessions = IndexMap::new();
    sessions.insert("a".to_string(), handle("a", a.clone()));
    let manager = SessionManager::from_handles(sessions, 1);

    manager.start_all().await.unwrap();

    // Two rounds' worth of interval pass; a probe bounded to the interval
    // abandons the wedged round instead of stalling the supervisor forever.
    tokio::time::advance(Duration::from_secs(3)).await;
    tokio::task::yield_now().await;

    manager.stop_all().await;
}

#[tokio::test(start_paused = true)]
async fn stop_all_returns_even_if_the_supervisor_misses_the_shutdown_signal() {
    let a = Arc::new(FakeSession::new());
    // The probe never answers, so the supervisor is never parked on
    // `.notified()` to receive the shutdown signal in the first place.
    a.set_health_check_delay(Some(Duration::from_secs(3600))).await;
    let mut sessions = IndexMap::new();
    sessions.insert("a".to_string(), handle("a", a.clone()));
    let manager = Arc::new(SessionManager::from_handles(sessions, 1));

    manager.start_all().await.unwrap();

    let m = manager.clone();
    let stopped = tokio::spawn(async move { m.stop_all().await });

    tokio::task::yield_now().await;
    // Fast-forward well past stop_all's own shutdown bound; if that bound
    // didn't exist this would hang forever instead of completing here.
    tokio::time::advance(Duration::from_secs(11)).await;

    stopped.await.expect("stop_all task panicked");
    assert_eq!(a.stop_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn supervisor_leaves_a_healthy_session_alone() {
    let a = Arc::new(FakeSession::new());
    let mut sessions = IndexMap::new();
    sessions.insert("a".to_string(), handle("a", a.clone()));
    let manager = SessionManager::from_handles(sessions, 1);

    manager.start_all().await.unwrap();
    tokio::time::advance(Duration::from_secs(5)).await;
    tokio::task::yield_now().await;

    assert_eq!(a.stop_calls(), 0);
    assert_eq!(a.start_calls(), 1);

    manager.stop_all().await;
}
