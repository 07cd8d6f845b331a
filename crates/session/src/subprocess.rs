// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The production `Session` implementation: a per-account long-lived
//! process plus per-task subprocess spawns.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use agyc_core::AccountConfig;

use crate::error::SessionError;
use crate::Session;

/// How long `stop` waits for a graceful exit before sending `SIGKILL`.
const GRACEFUL_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Subprocess-backed [`Session`].
///
/// Strict state isolation is achieved via `AG_CONFIG_DIR`: every spawn
/// (long-lived or per-task) gets the account's merged environment, so
/// there is no in-process coupling between accounts.
pub struct SubprocessSession {
    cfg: AccountConfig,
    child: Mutex<Option<Child>>,
}

impl SubprocessSession {
    pub fn new(cfg: AccountConfig) -> Self {
        Self {
            cfg,
            child: Mutex::new(None),
        }
    }

    fn merged_env(&self) -> BTreeMap<String, String> {
        let mut env: BTreeMap<String, String> = std::env::vars().collect();
        for (k, v) in &self.cfg.env {
            env.insert(k.clone(), v.clone());
        }
        env
    }

    fn command(&self, argv: &[String]) -> Command {
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]);
        cmd.envs(self.merged_env());
        cmd
    }

    fn spawn_err(&self, source: std::io::Error) -> SessionError {
        SessionError::SpawnFailed {
            account_id: self.cfg.id.clone(),
            source,
        }
    }

    async fn run_to_success(&self, argv: &[String]) -> bool {
        let mut cmd = self.command(argv);
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        cmd.kill_on_drop(true);
        match cmd.status().await {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::warn!(account_id = %self.cfg.id, error = %e, "health probe command failed to spawn");
                false
            }
        }
    }
}

#[async_trait]
impl Session for SubprocessSession {
    async fn start(&self) -> Result<(), SessionError> {
        tokio::fs::create_dir_all(&self.cfg.state_dir)
            .await
            .map_err(SessionError::Io)?;

        let Some(start_command) = &self.cfg.start_command else {
            return Ok(());
        };

        let mut guard = self.child.lock().await;
        if let Some(child) = guard.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                return Ok(()); // already live
            }
        }

        let mut cmd = self.command(start_command);
        cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        cmd.kill_on_drop(true);
        let child = cmd.spawn().map_err(|e| self.spawn_err(e))?;
        tracing::info!(account_id = %self.cfg.id, "started long-lived session process");
        *guard = Some(child);
        Ok(())
    }

    async fn stop(&self) {
        let mut guard = self.child.lock().await;
        let Some(mut child) = guard.take() else {
            return;
        };

        if let Some(pid) = child.id() {
            if signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_err() {
                tracing::debug!(account_id = %self.cfg.id, pid, "SIGTERM failed, process likely already gone");
            }
        }

        match tokio::time::timeout(GRACEFUL_STOP_TIMEOUT, child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                tracing::warn!(account_id = %self.cfg.id, "session did not exit gracefully, killing");
                let _ = child.kill().await;
                let _ = child.wait().await;
            }
        }
    }

    async fn is_healthy(&self) -> bool {
        if self.cfg.start_command.is_some() {
            let mut guard = self.child.lock().await;
            match guard.as_mut() {
                Some(child) if matches!(child.try_wait(), Ok(None)) => {}
                _ => return false,
            }
        }

        if let Some(health_command) = &self.cfg.health_command {
            return self.run_to_success(health_command).await;
        }

        true
    }

    async fn run_task(&self, request: Value) -> Result<Value, SessionError> {
        let Some(task_command) = &self.cfg.task_command else {
            return Err(SessionError::NoTaskCommand {
                account_id: self.cfg.id.clone(),
            });
        };

        let payload = serde_json::to_vec(&request)?;

        let mut cmd = self.command(task_command);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        let mut child = cmd.spawn().map_err(|e| self.spawn_err(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&payload).await?;
        }

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(SessionError::TaskFailed {
                account_id: self.cfg.id.clone(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        match serde_json::from_slice::<Value>(&output.stdout) {
            Ok(value) => Ok(value),
            Err(_) => Ok(serde_json::json!({
                "raw": String::from_utf8_lossy(&output.stdout).into_owned()
            })),
        }
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
