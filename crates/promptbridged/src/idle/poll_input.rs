// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling backend modeled on a compositor idle-notify protocol: rather than
//! subscribing to idle/resume notifications, polls a helper that reports
//! milliseconds since the last input event and compares it to a configured
//! threshold. Keeping this poll-based (instead of subscribing) is what lets
//! it share the same `IdleBackend` contract as the `logind`-style backend.

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

/// Polls a helper (e.g. `xprintidle`) that prints milliseconds-since-last-input
/// and compares against `threshold`.
pub struct InputIdlePollBackend {
    program: String,
    threshold: Duration,
}

impl InputIdlePollBackend {
    pub fn new(program: impl Into<String>, threshold: Duration) -> Self {
        Self { program: program.into(), threshold }
    }

    async fn query_idle_millis(&self) -> Result<u64, IdleError> {
        let output = Command::new(&self.program)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| IdleError::BackendFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(IdleError::BackendFailed(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse::<u64>()
            .map_err(|e| IdleError::BackendFailed(format!("unparseable idle-millis output: {e}")))
    }
}

impl IdleBackend for InputIdlePollBackend {
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

                let sample = self
                    .query_idle_millis()
                    .await
                    .map(|millis| Duration::from_millis(millis) >= self.threshold);
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
        "poll_input"
    }
}
