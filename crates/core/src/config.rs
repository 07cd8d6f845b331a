// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validated configuration model for the orchestrator.
//!
//! Configuration is authored as JSON or YAML (see the crate docs for the
//! on-disk shape) and loaded once at startup via [`OrchestratorConfig::load`].
//! Everything downstream (session, dispatcher, server) consumes only the
//! validated types in this module.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// Routing strategy used to pick an account for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingStrategy {
    #[default]
    RoundRobin,
    Lru,
    Health,
}

impl FromStr for RoutingStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "round-robin" | "round_robin" | "roundrobin" | "" => Ok(Self::RoundRobin),
            "lru" | "least-recently-used" | "least_recently_used" => Ok(Self::Lru),
            "health" | "health-score" | "health_score" => Ok(Self::Health),
            other => Err(ConfigError::InvalidRouting(other.to_string())),
        }
    }
}

/// `server` section: where the HTTP surface binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8088,
        }
    }
}

/// `dispatcher` section: queueing, routing and timeout policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub routing: RoutingStrategy,
    pub global_queue_size: usize,
    pub per_account_queue_size: usize,
    pub task_timeout_seconds: u64,
    pub health_check_interval_seconds: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            routing: RoutingStrategy::RoundRobin,
            global_queue_size: 200,
            per_account_queue_size: 50,
            task_timeout_seconds: 600,
            health_check_interval_seconds: 10,
        }
    }
}

/// A single fleet member: an isolated worker backend plus the commands used
/// to manage its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountConfig {
    pub id: String,
    pub state_dir: PathBuf,
    pub start_command: Option<Vec<String>>,
    pub health_command: Option<Vec<String>>,
    pub task_command: Option<Vec<String>>,
    pub env: BTreeMap<String, String>,
    pub max_concurrency: u32,
}

/// The fully validated configuration consumed by the rest of the crate graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub server: ServerConfig,
    pub dispatcher: DispatcherConfig,
    pub accounts: Vec<AccountConfig>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawServer {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawDispatcher {
    routing: Option<String>,
    global_queue_size: Option<usize>,
    per_account_queue_size: Option<usize>,
    task_timeout_seconds: Option<u64>,
    health_check_interval_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawAccount {
    id: Option<String>,
    state_dir: Option<String>,
    start_command: Option<Vec<String>>,
    health_command: Option<Vec<String>>,
    task_command: Option<Vec<String>>,
    env: BTreeMap<String, String>,
    max_concurrency: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawConfig {
    server: RawServer,
    dispatcher: RawDispatcher,
    accounts: Vec<RawAccount>,
}

fn expand_tilde(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            let rest = rest.strip_prefix('/').unwrap_or(rest);
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

fn non_empty_list(list: Option<Vec<String>>) -> Option<Vec<String>> {
    list.filter(|v| !v.is_empty())
}

impl OrchestratorConfig {
    /// Load and validate configuration from a JSON or YAML file.
    ///
    /// The format is inferred from the file extension (`.yml`/`.yaml` for
    /// YAML, anything else parsed as JSON). Validation errors are fatal.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yml") | Some("yaml")
        );

        let raw: RawConfig = if is_yaml {
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let server = ServerConfig {
            host: raw.server.host.unwrap_or_else(|| ServerConfig::default().host),
            port: raw.server.port.unwrap_or_else(|| ServerConfig::default().port),
        };

        let defaults = DispatcherConfig::default();
        let routing = match raw.dispatcher.routing {
            Some(s) => s.parse()?,
            None => defaults.routing,
        };
        let dispatcher = DispatcherConfig {
            routing,
            global_queue_size: raw.dispatcher.global_queue_size.unwrap_or(defaults.global_queue_size),
            per_account_queue_size: raw
                .dispatcher
                .per_account_queue_size
                .unwrap_or(defaults.per_account_queue_size),
            task_timeout_seconds: raw
                .dispatcher
                .task_timeout_seconds
                .unwrap_or(defaults.task_timeout_seconds),
            health_check_interval_seconds: raw
                .dispatcher
                .health_check_interval_seconds
                .unwrap_or(defaults.health_check_interval_seconds),
        };

        if raw.accounts.is_empty() {
            return Err(ConfigError::NoAccounts);
        }

        let mut seen_ids = std::collections::HashSet::new();
        let mut accounts = Vec::with_capacity(raw.accounts.len());
        for raw_account in raw.accounts {
            let id = raw_account.id.unwrap_or_default().trim().to_string();
            if id.is_empty() {
                return Err(ConfigError::MissingAccountId);
            }
            if !seen_ids.insert(id.clone()) {
                return Err(ConfigError::DuplicateAccountId(id));
            }

            let state_dir_raw = raw_account.state_dir.unwrap_or_default().trim().to_string();
            if state_dir_raw.is_empty() {
                return Err(ConfigError::MissingStateDir(id));
            }
            let state_dir = expand_tilde(&state_dir_raw);

            let mut env = raw_account.env;
            env.entry("AG_CONFIG_DIR".to_string())
                .or_insert_with(|| state_dir.display().to_string());

            accounts.push(AccountConfig {
                id,
                state_dir,
                start_command: non_empty_list(raw_account.start_command),
                health_command: non_empty_list(raw_account.health_command),
                task_command: non_empty_list(raw_account.task_command),
                env,
                max_concurrency: raw_account.max_concurrency.unwrap_or(1).max(1) as u32,
            });
        }

        Ok(Self {
            server,
            dispatcher,
            accounts,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
