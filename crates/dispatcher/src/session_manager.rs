// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owns the fleet of [`Session`] backends: starts them in submission order,
//! probes them on a timer, and restarts whichever go unhealthy.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use agyc_core::AccountConfig;
use agyc_session::{Session, SessionError, SubprocessSession};

/// Hard bound on waiting for the supervisor to notice shutdown and exit, so
/// a probe round that missed the shutdown notification can never wedge
/// `stop_all` forever.
const SUPERVISOR_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// One account's backend plus the concurrency limit the dispatcher should
/// enforce for it.
#[derive(Clone)]
pub struct SessionHandle {
    pub account_id: String,
    pub session: Arc<dyn Session>,
    pub max_concurrency: u32,
}

/// Supervises the lifecycle of every account's [`Session`].
///
/// `start_all` brings every session up in the order accounts were
/// configured; a background task then probes `is_healthy` on a fixed
/// interval and restarts (stop, then start) whichever session reports
/// unhealthy. A failed restart is logged and retried on the next cycle —
/// it never takes down the supervisor or the other accounts.
pub struct SessionManager {
    sessions: Arc<IndexMap<String, SessionHandle>>,
    health_check_interval: Duration,
    shutdown: Arc<Notify>,
    supervisor: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Build production [`SubprocessSession`] backends from validated config.
    pub fn new(accounts: &[AccountConfig], health_check_interval_seconds: u64) -> Self {
        let sessions = accounts
            .iter()
            .map(|a| {
                let session = Arc::new(SubprocessSession::new(a.clone())) as Arc<dyn Session>;
                (
                    a.id.clone(),
                    SessionHandle {
                        account_id: a.id.clone(),
                        session,
                        max_concurrency: a.max_concurrency,
                    },
                )
            })
            .collect();
        Self::from_handles(sessions, health_check_interval_seconds)
    }

    /// Build from already-constructed handles; used by tests to inject
    /// [`agyc_session::FakeSession`] doubles.
    pub fn from_handles(sessions: IndexMap<String, SessionHandle>, health_check_interval_seconds: u64) -> Self {
        Self {
            sessions: Arc::new(sessions),
            health_check_interval: Duration::from_secs(health_check_interval_seconds.max(1)),
            shutdown: Arc::new(Notify::new()),
            supervisor: parking_lot::Mutex::new(None),
        }
    }

    pub fn sessions(&self) -> &IndexMap<String, SessionHandle> {
        &self.sessions
    }

    /// Start every session in submission order, then spawn the health
    /// supervisor. A failure to start any account is fatal and aborts
    /// startup before the supervisor is spawned.
    pub async fn start_all(&self) -> Result<(), SessionError> {
        for handle in self.sessions.values() {
            handle.session.start().await?;
        }

        let sessions = self.sessions.clone();
        let interval = self.health_check_interval;
        let shutdown = self.shutdown.clone();
        let join = tokio::spawn(supervise(sessions, interval, shutdown));
        *self.supervisor.lock() = Some(join);
        Ok(())
    }

    /// Stop the supervisor and every session. Best-effort: individual
    /// session stop failures are not surfaced (`Session::stop` is infallible).
    ///
    /// `notify_waiters` only wakes a supervisor that is already parked on
    /// `.notified()`; one that is mid-probe round won't see it until its next
    /// iteration. The join is bounded so a supervisor stuck behind a wedged
    /// probe (or one that otherwise missed the signal) can never stop shutdown
    /// from proceeding — sessions are stopped either way.
    pub async fn stop_all(&self) {
        self.shutdown.notify_waiters();
        let join = self.supervisor.lock().take();
        if let Some(join) = join {
            if tokio::time::timeout(SUPERVISOR_JOIN_TIMEOUT, join).await.is_err() {
                tracing::warn!("supervisor did not exit within the shutdown bound, stopping sessions anyway");
            }
        }
        for handle in self.sessions.values() {
            handle.session.stop().await;
        }
    }
}

async fn supervise(sessions: Arc<IndexMap<String, SessionHandle>>, interval: Duration, shutdown: Arc<Notify>) {
    loop {
        let probes = sessions.values().map(|handle| {
            let handle = handle.clone();
            async move {
                if tokio::time::timeout(interval, probe_and_restart(&handle)).await.is_err() {
                    tracing::warn!(account_id = %handle.account_id, "health probe or restart exceeded the check interval, abandoning this round");
                }
            }
        });
        futures::future::join_all(probes).await;

        tokio::select! {
            _ = shutdown.notified() => return,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

async fn probe_and_restart(handle: &SessionHandle) {
    if !handle.session.is_healthy().await {
        tracing::warn!(account_id = %handle.account_id, "session unhealthy, restarting");
        handle.session.stop().await;
        if let Err(e) = handle.session.start().await {
            tracing::error!(account_id = %handle.account_id, error = %e, "failed to restart session");
        }
    }
}

#[cfg(test)]
#[path = "session_manager_tests.rs"]
mod tests;
