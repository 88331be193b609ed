// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsing and classification of the one-line-JSON hook wire format (§6).

use serde::Deserialize;

use crate::model::{DisplayFields, NotificationFields};

/// A classified hook frame. Classification follows §4.3: a frame carrying
/// `hook_event_name` is a notification; otherwise it's a permission request.
#[derive(Debug, Clone)]
pub enum HookFrame {
    Permission(DisplayFields),
    Notification(NotificationFields),
}

#[derive(Deserialize)]
struct RawFrame {
    tool_name: Option<String>,
    #[serde(default)]
    tool_input: serde_json::Value,
    hook_event_name: Option<String>,
    notification_type: Option<String>,
    message: Option<String>,
}

/// Parse and classify one line of hook JSON. Returns `None` for malformed or
/// incomplete frames — the caller closes the connection with no response.
pub fn parse_frame(line: &str) -> Option<HookFrame> {
    let raw: RawFrame = serde_json::from_str(line).ok()?;

    if raw.hook_event_name.is_some() {
        let notification_type = raw.notification_type?;
        let message = raw.message.unwrap_or_default();
        return Some(HookFrame::Notification(NotificationFields { message, notification_type }));
    }

    let tool_name = raw.tool_name?;
    Some(HookFrame::Permission(DisplayFields { tool_name, tool_input: raw.tool_input }))
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
