// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling backend modeled on a `logind`-style `IdleHint` session property:
//! queries the session manager on a fixed cadence rather than subscribing,
//! keeping the `IdleBackend` contract poll-based regardless of what the
//! underlying platform actually supports.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::IdleBackend;
use crate::error::IdleError;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polls `loginctl show-session -p IdleHint` for the current session.
pub struct LogindPollBackend {
    session_id: String,
}

impl LogindPollBackend {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into() }
    }

    async fn query_idle_hint(&self) -> Result<bool, IdleError> {
        let output = Command::new("loginctl")
            .args(["show-session", &self.session_id, "-p", "IdleHint", "--value"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| IdleError::BackendFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(IdleError::BackendFailed(format!(
                "loginctl exited with {}",
                output.status
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        match text.trim() {
            "yes" => Ok(true),
            "no" => Ok(false),
            other => Err(IdleError::BackendFailed(format!("unexpected IdleHint value: {other}"))),
        }
    }
}

impl IdleBackend for LogindPollBackend {
    fn run(
        self: Box<Self>,
        tx: mpsc::Sender<Result<bool, IdleError>>,
        shutdown: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = interval.tick() => {}
                }

                let sample = self.query_idle_hint().await;
                let is_err = sample.is_err();
                if tx.send(sample).await.is_err() {
                    return;
                }
                if is_err {
                    return;
                }
            }
        })
    }

    fn name(&self) -> &'static str {
        "poll_logind"
    }
}
