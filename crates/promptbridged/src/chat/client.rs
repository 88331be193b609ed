// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket chat client: REST calls for posting/updating messages,
//! a persistent outbound WebSocket (reconnected with exponential backoff)
//! for button-press callbacks. Mirrors how a Slack-style app pairs a REST
//! Web API with a Socket Mode event stream.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ChatAdapter, ChatConfig};
use crate::error::ChatError;
use crate::model::{ButtonPress, ChatHandle, Choice, DisplayFields, NotificationFields, Outcome};

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

enum Command {
    PostRequest {
        fields: DisplayFields,
        request_id: String,
        reply: oneshot::Sender<Result<ChatHandle, ChatError>>,
    },
    PostNotification {
        fields: NotificationFields,
        reply: oneshot::Sender<Result<ChatHandle, ChatError>>,
    },
    UpdateResolved {
        handle: ChatHandle,
        outcome: Outcome,
        reply: oneshot::Sender<Result<(), ChatError>>,
    },
}

/// Chat service client. Outbound calls are serialized onto a single task
/// that owns the `reqwest::Client`; a second task owns the long-lived
/// outbound WebSocket and reconnects on its own.
pub struct ChatClient {
    cmd_tx: mpsc::Sender<Command>,
}

impl ChatClient {
    /// Connect to the configured chat service, starting both the command
    /// task and the WebSocket event-stream task. Returns the client handle
    /// and a receiver for button-press callbacks.
    pub fn connect(
        config: ChatConfig,
        shutdown: CancellationToken,
    ) -> (Self, mpsc::Receiver<ButtonPress>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (button_tx, button_rx) = mpsc::channel(32);

        let http = reqwest::Client::new();
        tokio::spawn(run_commands(http, config.clone(), cmd_rx));
        tokio::spawn(run_socket(config, button_tx, shutdown));

        (Self { cmd_tx }, button_rx)
    }
}

impl ChatAdapter for ChatClient {
    fn post_request(
        &self,
        fields: &DisplayFields,
        request_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ChatHandle, ChatError>> + Send>> {
        let cmd_tx = self.cmd_tx.clone();
        let fields = fields.clone();
        let request_id = request_id.to_owned();
        Box::pin(async move {
            let (reply, recv) = oneshot::channel();
            cmd_tx
                .send(Command::PostRequest { fields, request_id, reply })
                .await
                .map_err(|_| ChatError::Transport("chat command task gone".into()))?;
            recv.await.map_err(|_| ChatError::Transport("chat command task dropped reply".into()))?
        })
    }

    fn post_notification(
        &self,
        fields: &NotificationFields,
    ) -> Pin<Box<dyn Future<Output = Result<ChatHandle, ChatError>> + Send>> {
        let cmd_tx = self.cmd_tx.clone();
        let fields = fields.clone();
        Box::pin(async move {
            let (reply, recv) = oneshot::channel();
            cmd_tx
                .send(Command::PostNotification { fields, reply })
                .await
                .map_err(|_| ChatError::Transport("chat command task gone".into()))?;
            recv.await.map_err(|_| ChatError::Transport("chat command task dropped reply".into()))?
        })
    }

    fn update_resolved(
        &self,
        handle: &ChatHandle,
        outcome: Outcome,
    ) -> Pin<Box<dyn Future<Output = Result<(), ChatError>> + Send>> {
        let cmd_tx = self.cmd_tx.clone();
        let handle = handle.clone();
        Box::pin(async move {
            let (reply, recv) = oneshot::channel();
            cmd_tx
                .send(Command::UpdateResolved { handle, outcome, reply })
                .await
                .map_err(|_| ChatError::Transport("chat command task gone".into()))?;
            recv.await.map_err(|_| ChatError::Transport("chat command task dropped reply".into()))?
        })
    }
}

async fn run_commands(http: reqwest::Client, config: ChatConfig, mut cmd_rx: mpsc::Receiver<Command>) {
    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            Command::PostRequest { fields, request_id, reply } => {
                let result = post_request_card(&http, &config, &fields, &request_id).await;
                let _ = reply.send(result);
            }
            Command::PostNotification { fields, reply } => {
                let result = post_notification_card(&http, &config, &fields).await;
                let _ = reply.send(result);
            }
            Command::UpdateResolved { handle, outcome, reply } => {
                let result = update_message(&http, &config, &handle, outcome).await;
                let _ = reply.send(result);
            }
        }
    }
}

#[derive(Serialize)]
struct PostRequestBody<'a> {
    channel: &'a str,
    text: &'a str,
    blocks: Vec<ActionBlock<'a>>,
}

#[derive(Serialize)]
struct ActionBlock<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    elements: Vec<ActionElement<'a>>,
}

#[derive(Serialize)]
struct ActionElement<'a> {
    action_id: &'static str,
    value: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct PostNotificationBody<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct UpdateBody<'a> {
    channel: &'a str,
    ts: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct PostResponse {
    ok: bool,
    channel: Option<String>,
    ts: Option<String>,
    error: Option<String>,
}

async fn post_request_card(
    http: &reqwest::Client,
    config: &ChatConfig,
    fields: &DisplayFields,
    request_id: &str,
) -> Result<ChatHandle, ChatError> {
    let text = format!("Permission requested: {} — {}", fields.tool_name, fields.tool_input);
    let body = PostRequestBody {
        channel: &config.channel_id,
        text: &text,
        blocks: vec![ActionBlock {
            kind: "actions",
            elements: vec![
                ActionElement { action_id: "approve", value: request_id, text: "Approve" },
                ActionElement { action_id: "deny", value: request_id, text: "Deny" },
            ],
        }],
    };
    post_and_parse(http, config, "chat.postMessage", &body).await
}

async fn post_notification_card(
    http: &reqwest::Client,
    config: &ChatConfig,
    fields: &NotificationFields,
) -> Result<ChatHandle, ChatError> {
    let body =
        PostNotificationBody { channel: &config.channel_id, text: &fields.message };
    post_and_parse(http, config, "chat.postMessage", &body).await
}

async fn update_message(
    http: &reqwest::Client,
    config: &ChatConfig,
    handle: &ChatHandle,
    outcome: Outcome,
) -> Result<(), ChatError> {
    let text = match outcome {
        Outcome::Approved => "Approved via chat",
        Outcome::Denied => "Denied via chat",
        Outcome::AnsweredLocally => "Resolved locally",
        Outcome::AnsweredRemotely => "Resolved in another session",
    };
    let body = UpdateBody { channel: &handle.channel_id, ts: &handle.message_ts, text };
    let _: ChatHandle = post_and_parse(http, config, "chat.update", &body).await?;
    Ok(())
}

async fn post_and_parse<B: Serialize>(
    http: &reqwest::Client,
    config: &ChatConfig,
    method: &str,
    body: &B,
) -> Result<ChatHandle, ChatError> {
    let url = format!("{}/{method}", config.api_base);
    let resp = http
        .post(url)
        .bearer_auth(&config.bot_token)
        .json(body)
        .send()
        .await
        .map_err(|e| ChatError::Transport(e.to_string()))?;

    let parsed: PostResponse =
        resp.json().await.map_err(|e| ChatError::Transport(e.to_string()))?;

    if !parsed.ok {
        return Err(ChatError::Rejected(parsed.error.unwrap_or_else(|| "unknown".to_owned())));
    }

    Ok(ChatHandle {
        channel_id: parsed.channel.unwrap_or_else(|| config.channel_id.clone()),
        message_ts: parsed.ts.unwrap_or_default(),
    })
}

#[derive(Deserialize)]
struct BlockAction {
    action_id: String,
    value: String,
}

#[derive(Deserialize)]
struct BlockActionsEvent {
    #[serde(rename = "type")]
    kind: String,
    actions: Vec<BlockAction>,
}

async fn run_socket(config: ChatConfig, button_tx: mpsc::Sender<ButtonPress>, shutdown: CancellationToken) {
    let mut backoff = INITIAL_BACKOFF;
    let url = build_ws_url(&config.api_base, &config.app_token);

    loop {
        if shutdown.is_cancelled() {
            return;
        }

        match tokio_tungstenite::connect_async(&url).await {
            Ok((stream, _)) => {
                backoff = INITIAL_BACKOFF;
                debug!("chat event socket connected");
                let (mut write, mut read) = stream.split();

                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            let _ = write.send(Message::Close(None)).await;
                            return;
                        }
                        msg = read.next() => {
                            match msg {
                                Some(Ok(Message::Text(text))) => {
                                    if let Some(press) = parse_button_press(&text) {
                                        if button_tx.send(press).await.is_err() {
                                            return;
                                        }
                                    }
                                }
                                Some(Ok(Message::Close(_))) | None => {
                                    debug!("chat event socket closed");
                                    break;
                                }
                                Some(Err(e)) => {
                                    warn!(err = %e, "chat event socket error");
                                    break;
                                }
                                _ => {}
                            }
                        }
                    }
                }
            }
            Err(e) => {
                warn!(err = %e, backoff_ms = backoff.as_millis(), "chat event socket connect failed, retrying");
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

fn parse_button_press(text: &str) -> Option<ButtonPress> {
    let event: BlockActionsEvent = serde_json::from_str(text).ok()?;
    if event.kind != "block_actions" {
        return None;
    }
    let action = event.actions.into_iter().next()?;
    let choice = match action.action_id.as_str() {
        "approve" => Choice::Approve,
        "deny" => Choice::Deny,
        _ => return None,
    };
    Some(ButtonPress { request_id: action.value, choice })
}

fn build_ws_url(api_base: &str, app_token: &str) -> String {
    let ws_base = if let Some(rest) = api_base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        api_base.to_owned()
    };
    format!("{ws_base}/socket?token={app_token}")
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
