// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! agyc-server: the HTTP surface over the dispatcher, plus the entry
//! point that loads configuration, brings the fleet up, and serves
//! until a shutdown signal arrives.

mod error;
mod routes;
mod state;

pub use error::{ApiError, ServeError};
pub use state::AppState;

use std::path::Path;
use std::sync::Arc;

use agyc_core::OrchestratorConfig;
use agyc_dispatcher::{Dispatcher, SessionManager};

/// Load configuration from `config_path`, bring up the fleet, and serve
/// HTTP until a shutdown signal (Ctrl-C or SIGTERM) arrives. Performs a
/// graceful dispatcher-then-session-manager shutdown before returning.
pub async fn serve(config_path: &Path) -> Result<(), ServeError> {
    let config = OrchestratorConfig::load(config_path)?;
    serve_with_config(config).await
}

async fn serve_with_config(config: OrchestratorConfig) -> Result<(), ServeError> {
    let manager = Arc::new(SessionManager::new(
        &config.accounts,
        config.dispatcher.health_check_interval_seconds,
    ));
    manager.start_all().await?;

    let dispatcher = Arc::new(Dispatcher::new(config.dispatcher.clone(), manager.sessions()));
    dispatcher.start();

    let state = AppState::new();
    state.set_dispatcher(dispatcher.clone()).await;

    let app = routes::router(state.clone());
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("stopping dispatcher");
    state.clear_dispatcher().await;
    dispatcher.stop().await;
    manager.stop_all().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
