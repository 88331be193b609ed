// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-driven backend: spawns an external helper and reads its stdout,
//! one `idle` or `active` line per transition.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::IdleBackend;
use crate::error::IdleError;

/// Drives a configured helper command that prints `idle`/`active` lines to
/// its standard output as the session's idle state changes.
pub struct ExternalHelperBackend {
    program: String,
    args: Vec<String>,
}

impl ExternalHelperBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }
}

impl IdleBackend for ExternalHelperBackend {
    fn run(
        self: Box<Self>,
        tx: mpsc::Sender<Result<bool, IdleError>>,
        shutdown: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let mut child = match Command::new(&self.program)
                .args(&self.args)
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
            {
                Ok(child) => child,
                Err(e) => {
                    let _ = tx.send(Err(IdleError::BackendFailed(e.to_string()))).await;
                    return;
                }
            };

            let Some(stdout) = child.stdout.take() else {
                let _ = tx
                    .send(Err(IdleError::BackendFailed("helper produced no stdout pipe".into())))
                    .await;
                return;
            };
            let mut lines = BufReader::new(stdout).lines();

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        let _ = child.kill().await;
                        return;
                    }
                    next = lines.next_line() => {
                        match next {
                            Ok(Some(line)) => {
                                match line.trim() {
                                    "idle" => {
                                        if tx.send(Ok(true)).await.is_err() { return; }
                                    }
                                    "active" => {
                                        if tx.send(Ok(false)).await.is_err() { return; }
                                    }
                                    other => warn!(line = other, "idle helper emitted unrecognized line"),
                                }
                            }
                            Ok(None) => {
                                let _ = tx
                                    .send(Err(IdleError::BackendFailed("helper closed stdout".into())))
                                    .await;
                                return;
                            }
                            Err(e) => {
                                let _ = tx.send(Err(IdleError::BackendFailed(e.to_string()))).await;
                                return;
                            }
                        }
                    }
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        "external_helper"
    }
}
