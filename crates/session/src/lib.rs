// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agyc-session: the `Session` capability and its subprocess implementation.
//!
//! A `Session` is the opaque per-account worker backend: it owns an
//! optional long-lived child process, answers health probes, and executes
//! one-shot tasks by spawning a fresh child per request. See
//! [`Session`] for the full contract.

mod error;
mod subprocess;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use error::SessionError;
pub use subprocess::SubprocessSession;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSession, TaskOutcome};

use async_trait::async_trait;
use serde_json::Value;

/// The capability set every account's worker backend exposes to the
/// dispatcher: start/stop lifecycle, a health probe, and task execution.
///
/// Implementations must be safe to share across the router and worker
/// fibers (`Send + Sync`); internal mutable state (e.g. a child process
/// handle) is expected to be guarded by the implementation itself.
#[async_trait]
pub trait Session: Send + Sync {
    /// Ensure the account's long-lived backend (if configured) is running.
    /// A no-op if no start command is configured, or if it is already live.
    async fn start(&self) -> Result<(), SessionError>;

    /// Stop the long-lived backend, if any. Idempotent: stopping an
    /// already-stopped session does nothing.
    async fn stop(&self);

    /// Probe whether the account's backend is currently usable.
    async fn is_healthy(&self) -> bool;

    /// Execute one task against the account's backend and return its
    /// result payload.
    async fn run_task(&self, request: Value) -> Result<Value, SessionError>;
}
