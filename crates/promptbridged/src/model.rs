// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain types shared across the state store, IPC, chat, and coordinator
//! modules.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// The two buttons on a posted permission card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    Approve,
    Deny,
}

/// Terminal status a pending request (or notification-adjacent card) can
/// reach. Mirrors the `outcome` values the chat adapter's `update_resolved`
/// accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Approved,
    Denied,
    /// The user returned to the machine (idle → active) before answering.
    AnsweredLocally,
    /// The hook's IPC connection closed while the user was still idle —
    /// some other path resolved the prompt.
    AnsweredRemotely,
}

/// The daemon's instruction to the hook, written back over the IPC
/// connection for permission requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Approve,
    Deny,
    Passthrough,
}

/// Wire-format daemon response to a permission request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    pub action: Action,
    pub reason: String,
}

impl DaemonResponse {
    pub fn passthrough(reason: impl Into<String>) -> Self {
        Self { action: Action::Passthrough, reason: reason.into() }
    }

    pub fn approve() -> Self {
        Self { action: Action::Approve, reason: "Approved via chat".to_owned() }
    }

    pub fn deny() -> Self {
        Self { action: Action::Deny, reason: "Denied via chat".to_owned() }
    }
}

/// Display fields for a permission card, verbatim from the hook frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayFields {
    pub tool_name: String,
    pub tool_input: serde_json::Value,
}

/// Display fields for a notification post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationFields {
    pub message: String,
    pub notification_type: String,
}

/// Opaque handle returned by the chat adapter, sufficient to later edit the
/// message it identifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatHandle {
    pub channel_id: String,
    pub message_ts: String,
}

/// A point-in-time read of the idle record.
#[derive(Debug, Clone, Copy)]
pub struct IdleSnapshot {
    pub is_idle: bool,
    pub since: Instant,
    pub duration: Duration,
}

/// Descriptor of a real idle-state transition, returned by `StateStore::set_idle`
/// so callers can react outside the store's critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleTransition {
    pub is_idle: bool,
}

/// A button-press callback delivered by the chat adapter's event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonPress {
    pub request_id: String,
    pub choice: Choice,
}
