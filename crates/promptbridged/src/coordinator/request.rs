// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Instant;

use tokio::net::unix::OwnedWriteHalf;
use tokio_util::sync::CancellationToken;

use crate::model::ChatHandle;

/// A permission request that has been posted to the chat service and is
/// awaiting a terminal event (button press, idle→active, hook disconnect,
/// or timeout).
///
/// The daemon owns `hook_write` exclusively from the moment the request
/// enters this table until resolution writes the final response and drops
/// it, closing the connection. The read half lives with the peer-close
/// watcher task, cancelled via `watch_cancel` once resolution claims the
/// entry.
pub struct PendingRequest {
    pub request_id: String,
    pub tool_name: String,
    pub tool_input: serde_json::Value,
    pub created_at: Instant,
    pub hook_write: OwnedWriteHalf,
    pub chat_handle: ChatHandle,
    pub watch_cancel: CancellationToken,
}
