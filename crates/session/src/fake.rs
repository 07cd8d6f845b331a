// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-memory [`Session`] double for exercising the dispatcher and
//! session manager without spawning real processes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::SessionError;
use crate::Session;

/// A scripted result for one `run_task` call.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Success(Value),
    Failure(String),
    /// Sleep for the given duration, then succeed with `{"content": "ok"}`.
    /// Used to exercise dispatcher-side timeouts.
    Sleep(Duration),
}

/// Test double for [`Session`]. Queue outcomes with [`FakeSession::push`];
/// once the queue is drained, `default_outcome` is reused indefinitely.
pub struct FakeSession {
    healthy: AtomicBool,
    start_ok: AtomicBool,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    outcomes: Mutex<VecDeque<TaskOutcome>>,
    default_outcome: TaskOutcome,
    calls: Mutex<Vec<Value>>,
    health_check_delay: Mutex<Option<Duration>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            start_ok: AtomicBool::new(true),
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            outcomes: Mutex::new(VecDeque::new()),
            default_outcome: TaskOutcome::Success(serde_json::json!({"content": "ok"})),
            calls: Mutex::new(Vec::new()),
            health_check_delay: Mutex::new(None),
        }
    }

    /// Make `is_healthy` block for `delay` before answering, to simulate a
    /// wedged health-check subprocess.
    pub async fn set_health_check_delay(&self, delay: Option<Duration>) {
        *self.health_check_delay.lock().await = delay;
    }

    pub fn with_default_outcome(mut self, outcome: TaskOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    pub async fn push(&self, outcome: TaskOutcome) {
        self.outcomes.lock().await.push_back(outcome);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Make the next (and every subsequent) `start` call fail.
    pub fn set_start_ok(&self, ok: bool) {
        self.start_ok.store(ok, Ordering::SeqCst);
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub async fn recorded_calls(&self) -> Vec<Value> {
        self.calls.lock().await.clone()
    }
}

impl Default for FakeSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn start(&self) -> Result<(), SessionError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.start_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SessionError::Simulated("start failed".to_string()))
        }
    }

    async fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn is_healthy(&self) -> bool {
        let delay = *self.health_check_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.healthy.load(Ordering::SeqCst)
    }

    async fn run_task(&self, request: Value) -> Result<Value, SessionError> {
        self.calls.lock().await.push(request);
        let outcome = {
            let mut queue = self.outcomes.lock().await;
            queue.pop_front().unwrap_or_else(|| self.default_outcome.clone())
        };
        match outcome {
            TaskOutcome::Success(value) => Ok(value),
            TaskOutcome::Failure(message) => Err(SessionError::Simulated(message)),
            TaskOutcome::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                Ok(serde_json::json!({"content": "ok"}))
            }
        }
    }
}
