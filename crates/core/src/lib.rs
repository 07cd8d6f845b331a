// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agyc-core: configuration model shared by the session, dispatcher and
//! server crates of the AGYC orchestrator.

mod config;
mod error;
mod id;

pub use config::{
    AccountConfig, DispatcherConfig, OrchestratorConfig, RoutingStrategy, ServerConfig,
};
pub use error::ConfigError;
pub use id::{new_message_id, new_task_id};
