// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Id generation helpers.

use uuid::Uuid;

/// Generate a task id of the form `task_<12 hex chars>`.
pub fn new_task_id() -> String {
    format!("task_{}", &Uuid::new_v4().simple().to_string()[..12])
}

/// Generate a message id of the form `msg_<16 hex chars>`.
pub fn new_message_id() -> String {
    format!("msg_{}", &Uuid::new_v4().simple().to_string()[..16])
}
