// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The IPC Server (§4.3): accepts hook connections on a local Unix-domain
//! socket, reads exactly one newline-terminated JSON frame per connection,
//! classifies it, and hands it off to the coordinator's event queue.

pub mod codec;

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::coordinator::CoordinatorEvent;
use crate::model::DaemonResponse;
use codec::{parse_frame, HookFrame};

/// Maximum bytes read while hunting for the newline terminator of a single
/// frame. Well past any realistic tool_input payload; guards against a
/// pathological peer that never sends `\n`.
const MAX_FRAME_BYTES: usize = 1 << 20;

/// Listens on the hook IPC endpoint and feeds classified frames into the
/// coordinator's event queue.
pub struct IpcServer {
    listener: UnixListener,
    path: PathBuf,
}

impl IpcServer {
    /// Bind the endpoint at `path`, removing a stale socket file left behind
    /// by a crashed previous instance.
    ///
    /// A stale socket is detected by attempting to connect to it: a refused
    /// connection means no one is listening and it's safe to unlink before
    /// binding.
    pub async fn bind(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            if UnixStream::connect(path).await.is_err() {
                debug!(path = %path.display(), "removing stale IPC endpoint");
                std::fs::remove_file(path)?;
            } else {
                anyhow::bail!(
                    "IPC endpoint {} is already in use by another instance",
                    path.display()
                );
            }
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let listener = UnixListener::bind(path)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        Ok(Self { listener, path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept connections until `shutdown` fires, dispatching each parsed
    /// frame onto `events`.
    pub async fn run(self, events: mpsc::Sender<CoordinatorEvent>, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let events = events.clone();
                            tokio::spawn(handle_connection(stream, events));
                        }
                        Err(e) => {
                            warn!(err = %e, "IPC accept failed");
                        }
                    }
                }
            }
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Read one frame from a freshly-accepted connection, classify it, and hand
/// it to the coordinator. Notifications are fully handled here (the server
/// closes the connection itself); permission requests transfer connection
/// ownership to the coordinator and this task exits without touching it
/// again.
async fn handle_connection(stream: UnixStream, events: mpsc::Sender<CoordinatorEvent>) {
    let mut reader = BufReader::new(stream);
    let line = match read_line(&mut reader).await {
        Ok(Some(line)) => line,
        Ok(None) => return, // peer closed before sending a full frame
        Err(e) => {
            warn!(err = %e, "IPC read failed");
            return;
        }
    };

    let Some(frame) = parse_frame(line.trim()) else {
        warn!("malformed hook frame, closing connection with no response");
        return;
    };

    match frame {
        HookFrame::Notification(fields) => {
            let _ = events.send(CoordinatorEvent::Notification(fields)).await;
            // Server closes the connection immediately; dropping `reader`
            // (and the stream it wraps) does that.
        }
        HookFrame::Permission(fields) => {
            let stream = reader.into_inner();
            let (read_half, write_half) = stream.into_split();
            let conn = HookConnection { read_half, write_half };
            let _ = events.send(CoordinatorEvent::Permission { fields, conn }).await;
        }
    }
}

/// Read bytes until a `\n` is found or the peer closes. Returns the line
/// without its terminator, or `None` on clean EOF with no data.
async fn read_line(reader: &mut BufReader<UnixStream>) -> std::io::Result<Option<String>> {
    let mut buf = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte).await?;
        if n == 0 {
            return if buf.is_empty() { Ok(None) } else { Ok(Some(String::from_utf8_lossy(&buf).into_owned())) };
        }
        if byte[0] == b'\n' {
            break;
        }
        buf.push(byte[0]);
        if buf.len() > MAX_FRAME_BYTES {
            return Ok(None);
        }
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// The live hook connection, split into independent read/write halves so the
/// peer-close watcher and the eventual resolver can each own one side.
pub struct HookConnection {
    pub read_half: tokio::net::unix::OwnedReadHalf,
    pub write_half: tokio::net::unix::OwnedWriteHalf,
}

impl HookConnection {
    pub fn into_split(self) -> (tokio::net::unix::OwnedReadHalf, tokio::net::unix::OwnedWriteHalf) {
        (self.read_half, self.write_half)
    }
}

/// Write a response frame and close the connection.
pub async fn respond_and_close(
    mut write_half: tokio::net::unix::OwnedWriteHalf,
    response: &DaemonResponse,
) {
    let Ok(mut line) = serde_json::to_vec(response) else { return };
    line.push(b'\n');
    if let Err(e) = write_half.write_all(&line).await {
        debug!(err = %e, "failed to write hook response (peer likely gone)");
    }
    let _ = write_half.shutdown().await;
}

#[cfg(test)]
#[path = "ipc_tests.rs"]
mod tests;
