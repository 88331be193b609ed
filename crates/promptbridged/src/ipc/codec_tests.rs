// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{parse_frame, HookFrame};

#[test]
fn parses_permission_request() -> anyhow::Result<()> {
    let frame = parse_frame(r#"{"tool_name":"Bash","tool_input":{"command":"ls"}}"#);
    match frame {
        Some(HookFrame::Permission(fields)) => {
            assert_eq!(fields.tool_name, "Bash");
            assert_eq!(fields.tool_input["command"], "ls");
        }
        _ => anyhow::bail!("expected Permission"),
    }
    Ok(())
}

#[test]
fn permission_request_without_tool_input_defaults_to_null() -> anyhow::Result<()> {
    let frame = parse_frame(r#"{"tool_name":"Bash"}"#);
    match frame {
        Some(HookFrame::Permission(fields)) => assert!(fields.tool_input.is_null()),
        _ => anyhow::bail!("expected Permission"),
    }
    Ok(())
}

#[test]
fn parses_notification() -> anyhow::Result<()> {
    let frame = parse_frame(
        r#"{"hook_event_name":"Notification","notification_type":"idle_prompt","message":"waiting"}"#,
    );
    match frame {
        Some(HookFrame::Notification(fields)) => {
            assert_eq!(fields.notification_type, "idle_prompt");
            assert_eq!(fields.message, "waiting");
        }
        _ => anyhow::bail!("expected Notification"),
    }
    Ok(())
}

#[test]
fn notification_without_message_defaults_to_empty() -> anyhow::Result<()> {
    let frame = parse_frame(r#"{"hook_event_name":"Notification","notification_type":"idle_prompt"}"#);
    match frame {
        Some(HookFrame::Notification(fields)) => assert_eq!(fields.message, ""),
        _ => anyhow::bail!("expected Notification"),
    }
    Ok(())
}

#[test]
fn notification_without_type_is_rejected() {
    let frame = parse_frame(r#"{"hook_event_name":"Notification","message":"waiting"}"#);
    assert!(frame.is_none());
}

#[test]
fn permission_request_without_tool_name_is_rejected() {
    let frame = parse_frame(r#"{"tool_input":{"command":"ls"}}"#);
    assert!(frame.is_none());
}

#[test]
fn malformed_json_is_rejected() {
    assert!(parse_frame("not json").is_none());
    assert!(parse_frame("").is_none());
    assert!(parse_frame("{").is_none());
}

#[test]
fn hook_event_name_takes_precedence_over_tool_name() {
    let frame = parse_frame(
        r#"{"tool_name":"Bash","hook_event_name":"Notification","notification_type":"permission_prompt"}"#,
    );
    assert!(matches!(frame, Some(HookFrame::Notification(_))));
}
