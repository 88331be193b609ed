// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::Context;

use super::{build_ws_url, parse_button_press};
use crate::model::Choice;

#[test]
fn ws_url_rewrites_https_scheme() {
    let url = build_ws_url("https://chat.example.com/api", "app-token");
    assert_eq!(url, "wss://chat.example.com/api/socket?token=app-token");
}

#[test]
fn ws_url_rewrites_http_scheme() {
    let url = build_ws_url("http://localhost:9000", "app-token");
    assert_eq!(url, "ws://localhost:9000/socket?token=app-token");
}

#[test]
fn ws_url_passes_through_unrecognized_scheme() {
    let url = build_ws_url("wss://already-ws.example.com", "app-token");
    assert_eq!(url, "wss://already-ws.example.com/socket?token=app-token");
}

#[test]
fn parses_approve_button_press() -> anyhow::Result<()> {
    let event = r#"{"type":"block_actions","actions":[{"action_id":"approve","value":"req-1"}]}"#;
    let press = parse_button_press(event).context("press parses")?;
    assert_eq!(press.request_id, "req-1");
    assert_eq!(press.choice, Choice::Approve);
    Ok(())
}

#[test]
fn parses_deny_button_press() -> anyhow::Result<()> {
    let event = r#"{"type":"block_actions","actions":[{"action_id":"deny","value":"req-2"}]}"#;
    let press = parse_button_press(event).context("press parses")?;
    assert_eq!(press.choice, Choice::Deny);
    Ok(())
}

#[test]
fn ignores_events_that_are_not_block_actions() {
    let event = r#"{"type":"hello","actions":[]}"#;
    assert!(parse_button_press(event).is_none());
}

#[test]
fn ignores_unrecognized_action_id() {
    let event = r#"{"type":"block_actions","actions":[{"action_id":"snooze","value":"req-3"}]}"#;
    assert!(parse_button_press(event).is_none());
}

#[test]
fn malformed_event_text_is_ignored() {
    assert!(parse_button_press("not json").is_none());
}
