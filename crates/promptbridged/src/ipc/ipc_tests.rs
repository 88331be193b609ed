// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::os::unix::fs::PermissionsExt;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;

use super::IpcServer;
use crate::coordinator::CoordinatorEvent;
use crate::model::DaemonResponse;

async fn write_frame(stream: &mut UnixStream, frame: &str) -> anyhow::Result<()> {
    stream.write_all(frame.as_bytes()).await.context("write frame")?;
    stream.write_all(b"\n").await.context("write newline")?;
    Ok(())
}

#[tokio::test]
async fn bind_creates_owner_only_socket() -> anyhow::Result<()> {
    let dir = tempfile::tempdir().context("tempdir")?;
    let path = dir.path().join("bridge.sock");

    let server = IpcServer::bind(&path).await.context("bind")?;
    let mode = std::fs::metadata(&path).context("metadata")?.permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
    drop(server);
    assert!(!path.exists(), "Drop should unlink the endpoint");
    Ok(())
}

#[tokio::test]
async fn bind_removes_stale_socket_left_by_a_dead_process() -> anyhow::Result<()> {
    let dir = tempfile::tempdir().context("tempdir")?;
    let path = dir.path().join("bridge.sock");

    {
        // Bind and immediately leak the listener without cleanup, simulating
        // a crashed prior instance that left the socket file behind.
        let listener = tokio::net::UnixListener::bind(&path).context("bind stale listener")?;
        drop(listener);
    }
    assert!(path.exists());

    let server = IpcServer::bind(&path).await.context("bind should remove the stale file and succeed")?;
    assert_eq!(server.path(), path);
    Ok(())
}

#[tokio::test]
async fn bind_refuses_when_another_instance_is_listening() -> anyhow::Result<()> {
    let dir = tempfile::tempdir().context("tempdir")?;
    let path = dir.path().join("bridge.sock");

    let _live = IpcServer::bind(&path).await.context("first bind")?;
    let result = IpcServer::bind(&path).await;
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn permission_request_is_handed_to_the_coordinator_with_connection_intact() -> anyhow::Result<()> {
    let dir = tempfile::tempdir().context("tempdir")?;
    let path = dir.path().join("bridge.sock");
    let server = IpcServer::bind(&path).await.context("bind")?;

    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel(4);
    let shutdown = CancellationToken::new();
    let server_path = path.clone();
    tokio::spawn(server.run(events_tx, shutdown.clone()));

    let mut client = UnixStream::connect(&server_path).await.context("connect")?;
    write_frame(&mut client, r#"{"tool_name":"Bash","tool_input":{"command":"ls"}}"#).await?;

    let event = tokio::time::timeout(std::time::Duration::from_secs(1), events_rx.recv())
        .await
        .context("event within timeout")?
        .context("event present")?;

    match event {
        CoordinatorEvent::Permission { fields, conn } => {
            assert_eq!(fields.tool_name, "Bash");
            let response = DaemonResponse::passthrough("test");
            super::respond_and_close(conn.write_half, &response).await;
        }
        _ => anyhow::bail!("expected a Permission event"),
    }

    let mut buf = String::new();
    let mut reader = BufReader::new(client);
    reader.read_line(&mut buf).await.context("read response line")?;
    assert!(buf.contains("passthrough"));

    shutdown.cancel();
    Ok(())
}

#[tokio::test]
async fn notification_closes_connection_with_no_response() -> anyhow::Result<()> {
    let dir = tempfile::tempdir().context("tempdir")?;
    let path = dir.path().join("bridge.sock");
    let server = IpcServer::bind(&path).await.context("bind")?;

    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel(4);
    let shutdown = CancellationToken::new();
    tokio::spawn(server.run(events_tx, shutdown.clone()));

    let mut client = UnixStream::connect(&path).await.context("connect")?;
    write_frame(
        &mut client,
        r#"{"hook_event_name":"Notification","notification_type":"idle_prompt","message":"hi"}"#,
    )
    .await?;

    let event = tokio::time::timeout(std::time::Duration::from_secs(1), events_rx.recv())
        .await
        .context("event within timeout")?
        .context("event present")?;
    assert!(matches!(event, CoordinatorEvent::Notification(_)));

    let mut buf = [0u8; 16];
    let n = client.read(&mut buf).await.context("read")?;
    assert_eq!(n, 0, "server should close without writing a response");

    shutdown.cancel();
    Ok(())
}

#[tokio::test]
async fn malformed_frame_is_closed_with_no_response_and_no_event() -> anyhow::Result<()> {
    let dir = tempfile::tempdir().context("tempdir")?;
    let path = dir.path().join("bridge.sock");
    let server = IpcServer::bind(&path).await.context("bind")?;

    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel(4);
    let shutdown = CancellationToken::new();
    tokio::spawn(server.run(events_tx, shutdown.clone()));

    let mut client = UnixStream::connect(&path).await.context("connect")?;
    write_frame(&mut client, "not json").await?;

    let mut buf = [0u8; 16];
    let n = client.read(&mut buf).await.context("read")?;
    assert_eq!(n, 0);
    assert!(events_rx.try_recv().is_err(), "malformed frame must not reach the coordinator");

    shutdown.cancel();
    Ok(())
}
