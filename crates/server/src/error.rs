// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by `serve`, and the HTTP-facing error taxonomy used by
//! the `/v1/messages` handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use agyc_dispatcher::DispatchError;

/// Top-level error from running the server; the CLI wraps this in
/// `anyhow::Error` for a readable exit message.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Config(#[from] agyc_core::ConfigError),

    #[error(transparent)]
    Session(#[from] agyc_session::SessionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors a request handler can return; maps to the status codes in the
/// HTTP surface contract.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("dispatcher is not ready")]
    NotReady,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Dispatch(DispatchError::QueueFull) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Dispatch(DispatchError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Dispatch(DispatchError::Shutdown) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Dispatch(DispatchError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
