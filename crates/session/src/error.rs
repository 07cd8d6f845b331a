// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors from session operations.

use thiserror::Error;

/// Errors from [`Session`](crate::Session) operations. `TaskFailed` is the
/// wire-level `TaskBackendError` from the error taxonomy: a non-zero exit
/// from `taskCommand`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("account {account_id}: failed to spawn process: {source}")]
    SpawnFailed {
        account_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("account {account_id} has no taskCommand configured")]
    NoTaskCommand { account_id: String },

    #[error("account {account_id}: task command exited with status {exit_code:?}: {stderr}")]
    TaskFailed {
        account_id: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to serialize task request: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("io error communicating with child process: {0}")]
    Io(#[from] std::io::Error),

    /// A failure injected by a test double; never produced by
    /// [`SubprocessSession`](crate::SubprocessSession).
    #[error("simulated failure: {0}")]
    Simulated(String),
}
