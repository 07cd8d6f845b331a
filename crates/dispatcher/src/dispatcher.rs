// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The task router: a single global queue, one worker fiber per account,
//! and a router fiber that picks an account for each task according to
//! the configured routing strategy.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::Mutex as SyncMutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;

use agyc_core::{new_task_id, DispatcherConfig, RoutingStrategy};

use crate::account::AccountState;
use crate::error::DispatchError;
use crate::session_manager::SessionHandle;
use crate::time::now_secs;

/// One submitted task and the slot its result is delivered through.
pub struct TaskItem {
    pub task_id: String,
    pub request: Value,
    pub created_ts: f64,
    result_tx: oneshot::Sender<Result<Value, DispatchError>>,
}

/// Routes submitted tasks to accounts and runs them to completion.
///
/// Call [`Dispatcher::start`] once before [`Dispatcher::submit`]ting any
/// work, and [`Dispatcher::stop`] to drain and shut down the router and
/// worker fibers.
pub struct Dispatcher {
    cfg: DispatcherConfig,
    accounts: Arc<IndexMap<String, Arc<AccountState>>>,
    global_tx: mpsc::Sender<TaskItem>,
    global_rx: SyncMutex<Option<mpsc::Receiver<TaskItem>>>,
    worker_rx: SyncMutex<Option<IndexMap<String, mpsc::Receiver<TaskItem>>>>,
    rr_cursor: Arc<SyncMutex<usize>>,
    global_depth: Arc<AtomicUsize>,
    capacity_notify: Arc<Notify>,
    shutdown: Arc<Notify>,
    tasks: SyncMutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new(cfg: DispatcherConfig, sessions: &IndexMap<String, SessionHandle>) -> Self {
        let mut accounts = IndexMap::new();
        let mut worker_rx = IndexMap::new();
        for handle in sessions.values() {
            let (tx, rx) = mpsc::channel(cfg.per_account_queue_size.max(1));
            let state = Arc::new(AccountState::new(
                handle.account_id.clone(),
                handle.session.clone(),
                handle.max_concurrency,
                tx,
            ));
            accounts.insert(handle.account_id.clone(), state);
            worker_rx.insert(handle.account_id.clone(), rx);
        }

        let (global_tx, global_rx) = mpsc::channel(cfg.global_queue_size.max(1));

        Self {
            cfg,
            accounts: Arc::new(accounts),
            global_tx,
            global_rx: SyncMutex::new(Some(global_rx)),
            worker_rx: SyncMutex::new(Some(worker_rx)),
            rr_cursor: Arc::new(SyncMutex::new(0)),
            global_depth: Arc::new(AtomicUsize::new(0)),
            capacity_notify: Arc::new(Notify::new()),
            shutdown: Arc::new(Notify::new()),
            tasks: SyncMutex::new(Vec::new()),
        }
    }

    /// Spawn the router fiber and one worker fiber per account. Must be
    /// called exactly once.
    pub fn start(&self) {
        let Some(global_rx) = self.global_rx.lock().take() else {
            tracing::warn!("Dispatcher::start called more than once; ignoring");
            return;
        };
        let Some(worker_rx) = self.worker_rx.lock().take() else {
            tracing::warn!("Dispatcher::start called more than once; ignoring");
            return;
        };

        let mut handles = Vec::new();
        handles.push(tokio::spawn(router_loop(
            self.accounts.clone(),
            self.cfg.routing,
            self.rr_cursor.clone(),
            self.global_depth.clone(),
            self.capacity_notify.clone(),
            global_rx,
            self.shutdown.clone(),
        )));

        let task_timeout = Duration::from_secs(self.cfg.task_timeout_seconds.max(1));
        for (id, rx) in worker_rx {
            let account = self.accounts[&id].clone();
            handles.push(tokio::spawn(worker_loop(
                account,
                rx,
                task_timeout,
                self.capacity_notify.clone(),
                self.shutdown.clone(),
            )));
        }

        *self.tasks.lock() = handles;
    }

    /// Signal shutdown and wait (up to a hard bound) for the router and
    /// every worker to exit. Tasks still in flight receive
    /// [`DispatchError::Shutdown`] once their fiber notices the shutdown
    /// signal or its oneshot sender is dropped.
    pub async fn stop(&self) {
        self.shutdown.notify_waiters();
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        let _ = tokio::time::timeout(Duration::from_secs(10), futures::future::join_all(handles)).await;
    }

    /// Submit a task and await its result. Resolves as soon as the
    /// account chosen for it finishes running it (success, backend
    /// error, or per-task timeout).
    pub async fn submit(&self, request: Value) -> Result<Value, DispatchError> {
        let (result_tx, result_rx) = oneshot::channel();
        let item = TaskItem {
            task_id: new_task_id(),
            request,
            created_ts: now_secs(),
            result_tx,
        };

        match self.global_tx.try_send(item) {
            Ok(()) => {
                self.global_depth.fetch_add(1, Ordering::SeqCst);
            }
            Err(mpsc::error::TrySendError::Full(_)) => return Err(DispatchError::QueueFull),
            Err(mpsc::error::TrySendError::Closed(_)) => return Err(DispatchError::Shutdown),
        }

        result_rx.await.unwrap_or(Err(DispatchError::Shutdown))
    }

    /// Render the current state as Prometheus text exposition.
    pub fn metrics_text(&self) -> String {
        crate::metrics::render(self.global_depth.load(Ordering::SeqCst), &self.accounts)
    }
}

fn routing_hint(request: &Value) -> Option<RoutingStrategy> {
    request
        .get("metadata")?
        .get("routing")?
        .get("strategyHint")?
        .as_str()?
        .parse()
        .ok()
}

fn with_account_id(request: &Value, account_id: &str) -> Value {
    let mut req = request.clone();
    if let Value::Object(map) = &mut req {
        map.insert("account_id".to_string(), Value::String(account_id.to_string()));
    }
    req
}

fn inject_account_metadata(value: &mut Value, account_id: &str) {
    let Value::Object(map) = value else {
        return;
    };
    let metadata = map
        .entry("metadata".to_string())
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    if let Value::Object(meta_map) = metadata {
        meta_map.insert("account_id".to_string(), Value::String(account_id.to_string()));
    } else {
        *metadata = serde_json::json!({ "account_id": account_id });
    }
}

fn pick_account(
    accounts: &IndexMap<String, Arc<AccountState>>,
    strategy: RoutingStrategy,
    cursor: &SyncMutex<usize>,
) -> Option<Arc<AccountState>> {
    let mut usable: Vec<&Arc<AccountState>> = accounts.values().filter(|a| a.is_usable()).collect();
    if usable.is_empty() {
        return None;
    }
    usable.sort_by(|a, b| a.account_id.cmp(&b.account_id));

    match strategy {
        RoutingStrategy::RoundRobin => {
            let mut idx = cursor.lock();
            *idx %= usable.len();
            let chosen = usable[*idx].clone();
            *idx = (*idx + 1) % usable.len();
            Some(chosen)
        }
        RoutingStrategy::Lru => usable
            .into_iter()
            .min_by(|a, b| {
                a.last_used_ts()
                    .partial_cmp(&b.last_used_ts())
                    .unwrap_or(CmpOrdering::Equal)
                    .then_with(|| a.account_id.cmp(&b.account_id))
            })
            .cloned(),
        RoutingStrategy::Health => usable
            .into_iter()
            .max_by(|a, b| {
                a.health_score()
                    .partial_cmp(&b.health_score())
                    .unwrap_or(CmpOrdering::Equal)
                    .then_with(|| a.account_id.cmp(&b.account_id))
            })
            .cloned(),
    }
}

fn fail_shutdown(item: TaskItem) {
    let _ = item.result_tx.send(Err(DispatchError::Shutdown));
}

#[allow(clippy::too_many_arguments)]
async fn router_loop(
    accounts: Arc<IndexMap<String, Arc<AccountState>>>,
    default_routing: RoutingStrategy,
    cursor: Arc<SyncMutex<usize>>,
    global_depth: Arc<AtomicUsize>,
    capacity_notify: Arc<Notify>,
    mut global_rx: mpsc::Receiver<TaskItem>,
    shutdown: Arc<Notify>,
) {
    loop {
        let mut item = tokio::select! {
            _ = shutdown.notified() => return,
            maybe = global_rx.recv() => match maybe {
                Some(item) => item,
                None => return,
            },
        };
        global_depth.fetch_sub(1, Ordering::SeqCst);

        let strategy = routing_hint(&item.request).unwrap_or(default_routing);

        loop {
            let Some(account) = pick_account(&accounts, strategy, &cursor) else {
                tokio::select! {
                    _ = shutdown.notified() => { fail_shutdown(item); break; }
                    _ = tokio::time::sleep(Duration::from_millis(100)) => {}
                }
                continue;
            };

            if account.inflight.load(Ordering::SeqCst) >= account.max_concurrency {
                tokio::select! {
                    _ = shutdown.notified() => { fail_shutdown(item); break; }
                    _ = tokio::time::timeout(Duration::from_secs(1), capacity_notify.notified()) => {}
                }
                continue;
            }

            match account.queue_tx.try_send(item) {
                Ok(()) => break,
                Err(mpsc::error::TrySendError::Full(returned)) => {
                    account.penalize_queue_full();
                    item = returned;
                    tokio::task::yield_now().await;
                    continue;
                }
                Err(mpsc::error::TrySendError::Closed(returned)) => {
                    fail_shutdown(returned);
                    break;
                }
            }
        }
    }
}

/// Pulls tasks off one account's local queue and runs them to completion.
///
/// There is exactly one of these fibers per account (matching the
/// one-worker-fiber design), but it does not await each task in turn: after
/// acquiring a capacity permit it spawns the task's execution and goes
/// straight back to dequeuing, so the permit — not this loop's own
/// sequencing — is what actually limits an account to `max_concurrency`
/// simultaneous `run_task` calls.
async fn worker_loop(
    account: Arc<AccountState>,
    mut queue_rx: mpsc::Receiver<TaskItem>,
    task_timeout: Duration,
    capacity_notify: Arc<Notify>,
    shutdown: Arc<Notify>,
) {
    loop {
        let item = tokio::select! {
            _ = shutdown.notified() => return,
            maybe = queue_rx.recv() => match maybe {
                Some(item) => item,
                None => return,
            },
        };

        let permit = match account.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                fail_shutdown(item);
                continue;
            }
        };

        let account = account.clone();
        let capacity_notify = capacity_notify.clone();
        tokio::spawn(run_one_task(account, item, task_timeout, permit, capacity_notify));
    }
}

async fn run_one_task(
    account: Arc<AccountState>,
    item: TaskItem,
    task_timeout: Duration,
    permit: tokio::sync::OwnedSemaphorePermit,
    capacity_notify: Arc<Notify>,
) {
    account.inflight.fetch_add(1, Ordering::SeqCst);

    let request = with_account_id(&item.request, &account.account_id);
    let start = Instant::now();
    let outcome = tokio::time::timeout(task_timeout, account.session.run_task(request)).await;

    account.inflight.fetch_sub(1, Ordering::SeqCst);
    drop(permit);

    let result = match outcome {
        Ok(Ok(mut value)) => {
            account.record_success(start.elapsed());
            inject_account_metadata(&mut value, &account.account_id);
            Ok(value)
        }
        Ok(Err(source)) => {
            account.record_error();
            Err(DispatchError::Backend(source))
        }
        Err(_elapsed) => {
            account.record_error();
            Err(DispatchError::Timeout(task_timeout))
        }
    };

    let _ = item.result_tx.send(result);
    capacity_notify.notify_waiters();
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
