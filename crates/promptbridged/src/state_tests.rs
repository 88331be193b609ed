// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use super::StateStore;
use crate::coordinator::request::PendingRequest;
use crate::model::ChatHandle;

fn fake_entry(request_id: &str) -> anyhow::Result<PendingRequest> {
    // OwnedWriteHalf can't be constructed without a live socket; tests that
    // only exercise the table (insert/remove/contains/drain) never touch
    // `hook_write`, so we build one from a connected pair and immediately
    // discard the peer.
    let (a, _b) = std::os::unix::net::UnixStream::pair().context("socketpair")?;
    a.set_nonblocking(true).context("nonblocking")?;
    let stream = tokio::net::UnixStream::from_std(a).context("tokio stream")?;
    let (_read, write) = stream.into_split();

    Ok(PendingRequest {
        request_id: request_id.to_owned(),
        tool_name: "Bash".to_owned(),
        tool_input: serde_json::json!({"command": "ls"}),
        created_at: std::time::Instant::now(),
        hook_write: write,
        chat_handle: ChatHandle { channel_id: "C1".to_owned(), message_ts: "100.1".to_owned() },
        watch_cancel: CancellationToken::new(),
    })
}

#[test]
fn idle_set_is_noop_when_unchanged() {
    let store = StateStore::new();
    assert!(store.set_idle(false).is_none());
    assert!(store.set_idle(true).is_some());
    assert!(store.set_idle(true).is_none());
}

#[test]
fn idle_snapshot_duration_is_non_decreasing_across_same_state() {
    let store = StateStore::new();
    store.set_idle(true);
    let first = store.snapshot_idle();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let second = store.snapshot_idle();
    assert!(second.duration >= first.duration);
}

#[tokio::test]
async fn insert_remove_round_trips() -> anyhow::Result<()> {
    let store = StateStore::new();
    store.insert(fake_entry("r1")?);
    assert!(store.contains("r1"));
    assert_eq!(store.pending_len(), 1);

    let entry = store.remove("r1").context("entry present")?;
    assert_eq!(entry.request_id, "r1");
    assert!(!store.contains("r1"));
    assert_eq!(store.pending_len(), 0);
    Ok(())
}

#[test]
fn remove_of_missing_id_is_none() {
    let store = StateStore::new();
    assert!(store.remove("missing").is_none());
}

#[tokio::test]
async fn drain_preserves_insertion_order() -> anyhow::Result<()> {
    let store = StateStore::new();
    store.insert(fake_entry("r1")?);
    store.insert(fake_entry("r2")?);
    store.insert(fake_entry("r3")?);

    let drained = store.drain();
    let ids: Vec<_> = drained.iter().map(|e| e.request_id.clone()).collect();
    assert_eq!(ids, vec!["r1", "r2", "r3"]);
    assert_eq!(store.pending_len(), 0);
    Ok(())
}
