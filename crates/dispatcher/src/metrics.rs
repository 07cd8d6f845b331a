// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prometheus text-exposition rendering for `/metrics`.

use std::fmt::Write as _;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::account::AccountState;
use crate::time::now_secs;

/// Render the dispatcher's current state as Prometheus text exposition
/// format (accounts sorted lexicographically by id for stable output).
pub fn render(queue_depth: usize, accounts: &IndexMap<String, Arc<AccountState>>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# TYPE agyc_queue_depth gauge");
    let _ = writeln!(out, "agyc_queue_depth {queue_depth}");
    let _ = writeln!(out, "# TYPE agyc_accounts gauge");
    let _ = writeln!(out, "agyc_accounts {}", accounts.len());

    let mut ids: Vec<&String> = accounts.keys().collect();
    ids.sort();

    let _ = writeln!(out, "# TYPE agyc_account_tasks_total counter");
    let _ = writeln!(out, "# TYPE agyc_account_errors_total counter");
    let _ = writeln!(out, "# TYPE agyc_account_avg_latency_ms gauge");
    let _ = writeln!(out, "# TYPE agyc_account_health_score gauge");
    let _ = writeln!(out, "# TYPE agyc_account_last_success_seconds gauge");

    let now = now_secs();
    for id in ids {
        let account = &accounts[id];
        let m = account.metrics_snapshot();
        let _ = writeln!(out, "agyc_account_tasks_total{{account=\"{id}\"}} {}", m.tasks_total);
        let _ = writeln!(out, "agyc_account_errors_total{{account=\"{id}\"}} {}", m.errors_total);
        let _ = writeln!(
            out,
            "agyc_account_avg_latency_ms{{account=\"{id}\"}} {:.3}",
            m.avg_latency_ms()
        );
        let _ = writeln!(
            out,
            "agyc_account_health_score{{account=\"{id}\"}} {:.3}",
            account.health_score()
        );
        if let Some(last_success) = m.last_success_ts {
            let _ = writeln!(
                out,
                "agyc_account_last_success_seconds{{account=\"{id}\"}} {:.3}",
                (now - last_success).max(0.0)
            );
        }
    }

    out
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
