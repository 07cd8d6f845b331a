// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tokio::sync::RwLock;

use agyc_dispatcher::Dispatcher;

/// Shared application state. The dispatcher is wrapped in an async
/// `RwLock<Option<..>>` so `/healthz` and `/metrics` can answer truthfully
/// while startup (session spawning, health probes) is still in progress.
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<RwLock<Option<Arc<Dispatcher>>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            dispatcher: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn set_dispatcher(&self, dispatcher: Arc<Dispatcher>) {
        *self.dispatcher.write().await = Some(dispatcher);
    }

    pub async fn clear_dispatcher(&self) {
        *self.dispatcher.write().await = None;
    }

    pub async fn dispatcher(&self) -> Option<Arc<Dispatcher>> {
        self.dispatcher.read().await.clone()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
