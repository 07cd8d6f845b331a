// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-account routing state: health score, last-used timestamp and the
//! counters exposed via `/metrics`.

use std::sync::atomic::AtomicU32;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Semaphore};

use agyc_session::Session;

use crate::time::now_secs;

/// Cumulative counters for one account, rendered verbatim into `/metrics`.
#[derive(Debug, Clone, Default)]
pub struct AccountMetrics {
    pub tasks_total: u64,
    pub errors_total: u64,
    pub latency_ms_total: f64,
    pub last_success_ts: Option<f64>,
    pub last_error_ts: Option<f64>,
}

impl AccountMetrics {
    /// Mean task latency in milliseconds, `0.0` before the first task completes.
    pub fn avg_latency_ms(&self) -> f64 {
        if self.tasks_total == 0 {
            0.0
        } else {
            self.latency_ms_total / self.tasks_total as f64
        }
    }
}

struct Mutable {
    health_score: f64,
    last_used_ts: f64,
    metrics: AccountMetrics,
}

/// Everything the router and worker fibers need to place and run a task
/// against one account. Lives for as long as the [`crate::Dispatcher`]
/// does; restarts of the underlying session happen in place and never
/// invalidate this state.
pub struct AccountState {
    pub account_id: String,
    pub session: Arc<dyn Session>,
    pub max_concurrency: u32,
    pub queue_tx: mpsc::Sender<crate::dispatcher::TaskItem>,
    pub semaphore: Arc<Semaphore>,
    pub inflight: AtomicU32,
    mutable: Mutex<Mutable>,
}

impl AccountState {
    pub fn new(
        account_id: String,
        session: Arc<dyn Session>,
        max_concurrency: u32,
        queue_tx: mpsc::Sender<crate::dispatcher::TaskItem>,
    ) -> Self {
        Self {
            account_id,
            session,
            max_concurrency,
            queue_tx,
            semaphore: Arc::new(Semaphore::new(max_concurrency as usize)),
            inflight: AtomicU32::new(0),
            mutable: Mutex::new(Mutable {
                health_score: 100.0,
                last_used_ts: 0.0,
                metrics: AccountMetrics::default(),
            }),
        }
    }

    pub fn health_score(&self) -> f64 {
        self.mutable.lock().health_score
    }

    pub fn last_used_ts(&self) -> f64 {
        self.mutable.lock().last_used_ts
    }

    pub fn metrics_snapshot(&self) -> AccountMetrics {
        self.mutable.lock().metrics.clone()
    }

    /// Account is eligible for selection: used by the router's candidate filter.
    pub fn is_usable(&self) -> bool {
        self.health_score() > 0.0
    }

    pub fn record_success(&self, elapsed: Duration) {
        let mut m = self.mutable.lock();
        let now = now_secs();
        m.last_used_ts = now;
        m.health_score = (m.health_score + 0.5).min(100.0);
        m.metrics.tasks_total += 1;
        m.metrics.latency_ms_total += elapsed.as_secs_f64() * 1000.0;
        m.metrics.last_success_ts = Some(now);
    }

    pub fn record_error(&self) {
        let mut m = self.mutable.lock();
        m.health_score = (m.health_score - 5.0).max(0.0);
        m.metrics.errors_total += 1;
        m.metrics.last_error_ts = Some(now_secs());
    }

    pub fn penalize_queue_full(&self) {
        let mut m = self.mutable.lock();
        m.health_score = (m.health_score - 1.0).max(0.0);
    }
}
