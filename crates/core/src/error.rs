// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration loading errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating an [`OrchestratorConfig`](crate::OrchestratorConfig).
///
/// All variants are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0:?}")]
    NotFound(PathBuf),

    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("account id is required")]
    MissingAccountId,

    #[error("account {0} stateDir is required")]
    MissingStateDir(String),

    #[error("duplicate account id: {0}")]
    DuplicateAccountId(String),

    #[error("config must contain at least one account")]
    NoAccounts,

    #[error("unrecognized routing strategy: {0}")]
    InvalidRouting(String),
}
