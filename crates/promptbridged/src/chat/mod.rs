// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Chat Adapter (§4.4): posts request/notification cards over HTTPS and
//! delivers button-press callbacks from a persistent outbound WebSocket.

pub mod client;

use std::future::Future;
use std::pin::Pin;

use crate::error::ChatError;
use crate::model::{ChatHandle, DisplayFields, NotificationFields, Outcome};

/// Credentials and destination for the configured chat service.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_base: String,
    pub bot_token: String,
    pub app_token: String,
    pub channel_id: String,
}

/// The interactive/informational posting surface the coordinator calls.
/// Implemented by [`client::ChatClient`]; a trait (rather than a concrete
/// type) so the coordinator can be exercised in tests against a fake.
pub trait ChatAdapter: Send + Sync {
    fn post_request(
        &self,
        fields: &DisplayFields,
        request_id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<ChatHandle, ChatError>> + Send>>;

    fn post_notification(
        &self,
        fields: &NotificationFields,
    ) -> Pin<Box<dyn Future<Output = Result<ChatHandle, ChatError>> + Send>>;

    fn update_resolved(
        &self,
        handle: &ChatHandle,
        outcome: Outcome,
    ) -> Pin<Box<dyn Future<Output = Result<(), ChatError>> + Send>>;
}
