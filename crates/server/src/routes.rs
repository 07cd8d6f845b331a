// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request handlers for the three public endpoints.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tower_http::trace::TraceLayer;

use agyc_core::new_message_id;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/v1/messages", post(create_message))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true, "ts": now_secs() }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.dispatcher().await {
        Some(dispatcher) => (StatusCode::OK, dispatcher.metrics_text()).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "dispatcher_not_ready 1\n").into_response(),
    }
}

async fn create_message(State(state): State<AppState>, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    let model = body
        .get("model")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("model must be a non-empty string".to_string()))?
        .to_string();

    let messages_ok = body
        .get("messages")
        .and_then(Value::as_array)
        .is_some_and(|list| !list.is_empty());
    if !messages_ok {
        return Err(ApiError::InvalidRequest(
            "messages must be a non-empty array".to_string(),
        ));
    }

    let dispatcher = state.dispatcher().await.ok_or(ApiError::NotReady)?;
    let result = dispatcher.submit(body).await?;

    Ok(Json(wrap_message(result, &model)))
}

/// Pass through an already-shaped `message` result, else wrap the
/// backend's raw payload as an Anthropic-style message response.
fn wrap_message(result: Value, model: &str) -> Value {
    if result.get("type").and_then(Value::as_str) == Some("message") {
        return result;
    }

    let text = result
        .get("content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| result.get("raw").map(display_value))
        .unwrap_or_else(|| display_value(&result));

    let account_id = result
        .get("metadata")
        .and_then(|m| m.get("account_id"))
        .or_else(|| result.get("account_id"))
        .and_then(Value::as_str);

    let metadata = match account_id {
        Some(id) => serde_json::json!({ "account_id": id }),
        None => serde_json::json!({}),
    };

    serde_json::json!({
        "id": new_message_id(),
        "type": "message",
        "role": "assistant",
        "model": model,
        "content": [{"type": "text", "text": text}],
        "metadata": metadata,
    })
}

/// A JSON string renders as its bare contents; anything else renders as its
/// JSON text form (mirroring `str(x)` over an already-parsed JSON value).
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
