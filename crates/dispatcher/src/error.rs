// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by [`crate::Dispatcher::submit`].

use std::time::Duration;

use thiserror::Error;

use agyc_session::SessionError;

/// Why a submitted task did not produce a result.
///
/// There is deliberately no "no usable account" variant: a task with no
/// reachable account simply waits in the router until one recovers or the
/// dispatcher is stopped, at which point it resolves as [`DispatchError::Shutdown`].
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("global queue is full")]
    QueueFull,

    #[error("task timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Backend(#[from] SessionError),

    #[error("dispatcher is shutting down")]
    Shutdown,
}
