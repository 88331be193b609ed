// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Coordinator (§4.5): owns the pending-request state machine and wires
//! the four concurrent event sources (new hook connections, chat button
//! callbacks, idle transitions, hook disconnects) onto a single tagged-event
//! queue. Serialization falls out of the queue being consumed by one task —
//! no explicit lock is needed around the resolution path itself.

pub mod request;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chat::ChatAdapter;
use crate::ipc::{respond_and_close, HookConnection};
use crate::model::{ButtonPress, Choice, DaemonResponse, DisplayFields, NotificationFields, Outcome};
use crate::state::StateStore;
use request::PendingRequest;

/// Everything that can move a pending request forward, plus the two
/// fire-and-forget inputs (new permission requests, notifications).
pub enum CoordinatorEvent {
    Permission { fields: DisplayFields, conn: HookConnection },
    Notification(NotificationFields),
    ButtonPress(ButtonPress),
    IdleTransition(bool),
    HookClosed(String),
    Timeout(String),
}

pub struct Coordinator {
    state: Arc<StateStore>,
    chat: Arc<dyn ChatAdapter>,
    notification_filter: HashSet<String>,
    request_bound: Duration,
    events_tx: mpsc::Sender<CoordinatorEvent>,
    events_rx: mpsc::Receiver<CoordinatorEvent>,
}

impl Coordinator {
    pub fn new(
        state: Arc<StateStore>,
        chat: Arc<dyn ChatAdapter>,
        notification_filter: HashSet<String>,
        request_bound: Duration,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        Self { state, chat, notification_filter, request_bound, events_tx, events_rx }
    }

    /// A clone of the event sender, handed to the IPC server, the idle
    /// monitor, and the chat adapter's button-press stream so every event
    /// source feeds the same queue.
    pub fn event_sender(&self) -> mpsc::Sender<CoordinatorEvent> {
        self.events_tx.clone()
    }

    /// Consume events until `shutdown` fires, then drain every still-pending
    /// request as `answered_locally` before returning.
    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = self.events_rx.recv() => {
                    match event {
                        Some(event) => self.handle(event).await,
                        None => break,
                    }
                }
            }
        }

        self.drain_on_shutdown().await;
    }

    async fn handle(&mut self, event: CoordinatorEvent) {
        match event {
            CoordinatorEvent::Permission { fields, conn } => self.handle_permission(fields, conn).await,
            CoordinatorEvent::Notification(fields) => self.handle_notification(fields).await,
            CoordinatorEvent::ButtonPress(press) => self.handle_button_press(press).await,
            CoordinatorEvent::IdleTransition(is_idle) => self.handle_idle_transition(is_idle).await,
            CoordinatorEvent::HookClosed(request_id) => self.handle_hook_closed(&request_id).await,
            CoordinatorEvent::Timeout(request_id) => self.handle_timeout(&request_id).await,
        }
    }

    async fn handle_permission(&self, fields: DisplayFields, conn: HookConnection) {
        let (read_half, write_half) = conn.into_split();
        let snapshot = self.state.snapshot_idle();

        if !snapshot.is_idle {
            respond_and_close(write_half, &DaemonResponse::passthrough("user active locally")).await;
            return;
        }

        let request_id = Uuid::new_v4().to_string();
        match self.chat.post_request(&fields, &request_id).await {
            Ok(chat_handle) => {
                let watch_cancel = CancellationToken::new();
                let entry = PendingRequest {
                    request_id: request_id.clone(),
                    tool_name: fields.tool_name,
                    tool_input: fields.tool_input,
                    created_at: std::time::Instant::now(),
                    hook_write: write_half,
                    chat_handle,
                    watch_cancel: watch_cancel.clone(),
                };
                self.state.insert(entry);

                tokio::spawn(watch_peer_close(
                    request_id.clone(),
                    read_half,
                    self.events_tx.clone(),
                    watch_cancel.clone(),
                ));
                tokio::spawn(watch_timeout(
                    request_id,
                    self.request_bound,
                    self.events_tx.clone(),
                    watch_cancel,
                ));
            }
            Err(e) => {
                warn!(err = %e, "chat post failed, falling back to passthrough");
                respond_and_close(write_half, &DaemonResponse::passthrough("chat service unavailable")).await;
            }
        }
    }

    async fn handle_notification(&self, fields: NotificationFields) {
        if self.notification_filter.contains(&fields.notification_type) {
            debug!(notification_type = %fields.notification_type, "notification dropped by filter");
            return;
        }

        let snapshot = self.state.snapshot_idle();
        if snapshot.is_idle {
            match self.chat.post_notification(&fields).await {
                Ok(_) => info!(
                    idle_duration_secs = snapshot.duration.as_secs(),
                    notification_type = %fields.notification_type,
                    "posted notification"
                ),
                Err(e) => warn!(err = %e, "failed to post notification"),
            }
        } else {
            info!(
                is_idle = false,
                idle_duration_secs = snapshot.duration.as_secs(),
                notification_type = %fields.notification_type,
                "notification received while active, not posted"
            );
        }
    }

    async fn handle_button_press(&self, press: ButtonPress) {
        let (outcome, response) = match press.choice {
            Choice::Approve => (Outcome::Approved, DaemonResponse::approve()),
            Choice::Deny => (Outcome::Denied, DaemonResponse::deny()),
        };
        self.resolve_one(&press.request_id, outcome, Some(response)).await;
    }

    async fn handle_idle_transition(&self, is_idle: bool) {
        let Some(transition) = self.state.set_idle(is_idle) else { return };
        if !transition.is_idle {
            // Active again: every entry present at the start of the drain
            // resolves as answered_locally, in arrival order.
            for entry in self.state.drain() {
                self.resolve_entry(
                    entry,
                    Outcome::AnsweredLocally,
                    Some(DaemonResponse::passthrough("user returned")),
                )
                .await;
            }
        }
    }

    async fn handle_hook_closed(&self, request_id: &str) {
        self.resolve_one(request_id, Outcome::AnsweredRemotely, None).await;
    }

    async fn handle_timeout(&self, request_id: &str) {
        self.resolve_one(
            request_id,
            Outcome::AnsweredLocally,
            Some(DaemonResponse::passthrough("request timed out")),
        )
        .await;
    }

    /// Atomically remove `request_id` from the table (a losing race yields
    /// `None`, silently discarded) and resolve it.
    async fn resolve_one(&self, request_id: &str, outcome: Outcome, response: Option<DaemonResponse>) {
        let Some(entry) = self.state.remove(request_id) else {
            debug!(request_id, "event for unknown or already-resolved request, discarding");
            return;
        };
        self.resolve_entry(entry, outcome, response).await;
    }

    /// Finish resolving an entry already removed from the table: cancel its
    /// watchers, update the chat card, and write (or skip) the hook response.
    async fn resolve_entry(&self, entry: PendingRequest, outcome: Outcome, response: Option<DaemonResponse>) {
        entry.watch_cancel.cancel();

        if let Err(e) = self.chat.update_resolved(&entry.chat_handle, outcome).await {
            warn!(request_id = %entry.request_id, err = %e, "chat update failed, leaving stale card");
        }

        match response {
            Some(response) => respond_and_close(entry.hook_write, &response).await,
            None => drop(entry.hook_write),
        }
    }

    async fn drain_on_shutdown(&self) {
        let pending = self.state.drain();
        if !pending.is_empty() {
            info!(count = pending.len(), "draining pending requests on shutdown");
        }
        for entry in pending {
            self.resolve_entry(
                entry,
                Outcome::AnsweredLocally,
                Some(DaemonResponse::passthrough("daemon shutting down")),
            )
            .await;
        }
    }
}

/// Blocks on EOF (or an error) from the hook's read half. Either means the
/// peer is gone; the read half is dropped when this task returns, whatever
/// the reason.
async fn watch_peer_close(
    request_id: String,
    mut read_half: tokio::net::unix::OwnedReadHalf,
    events_tx: mpsc::Sender<CoordinatorEvent>,
    cancel: CancellationToken,
) {
    let mut buf = [0u8; 1];
    tokio::select! {
        _ = cancel.cancelled() => {}
        result = read_half.read(&mut buf) => {
            match result {
                Ok(0) | Err(_) => {
                    let _ = events_tx.send(CoordinatorEvent::HookClosed(request_id)).await;
                }
                Ok(_) => {
                    // The hook isn't expected to send more data after its
                    // request frame; treat any as a protocol violation and
                    // close it out the same way.
                    let _ = events_tx.send(CoordinatorEvent::HookClosed(request_id)).await;
                }
            }
        }
    }
}

async fn watch_timeout(
    request_id: String,
    bound: Duration,
    events_tx: mpsc::Sender<CoordinatorEvent>,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(bound) => {
            let _ = events_tx.send(CoordinatorEvent::Timeout(request_id)).await;
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
