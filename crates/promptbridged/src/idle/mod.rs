// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Idle Monitor (§4.2): wraps a platform-specific backend and produces a
//! deduplicated stream of `{idle, active}` transitions.

pub mod external;
pub mod poll_input;
pub mod poll_logind;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::error::IdleError;

/// A source of raw idle-state observations. Implementations may poll a
/// system API at their own cadence or block on an external helper's output;
/// either way `run` owns the backend's lifetime until cancelled.
pub trait IdleBackend: Send + 'static {
    /// Drive the backend, sending every observed sample (not yet
    /// deduplicated) to `tx` until `shutdown` fires or the backend gives up.
    fn run(
        self: Box<Self>,
        tx: mpsc::Sender<Result<bool, IdleError>>,
        shutdown: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

/// Consecutive backend failures within this window trigger permanent
/// degrade-to-active (§4.2).
const FAILURE_WINDOW: Duration = Duration::from_secs(60);
const FAILURE_LIMIT: u32 = 3;

/// A deduplicated transition: `true` means the session just went idle,
/// `false` means it just became active.
pub struct IdleMonitor {
    backend_name: &'static str,
}

impl IdleMonitor {
    /// Spawn the backend and a supervising task that deduplicates its raw
    /// samples into transitions, restarting the backend once on failure and
    /// degrading permanently to active after repeated rapid failures.
    ///
    /// Returns immediately; transitions arrive on `transitions` for as long
    /// as `shutdown` is not cancelled.
    pub fn spawn<F>(
        make_backend: F,
        transitions: mpsc::Sender<bool>,
        shutdown: CancellationToken,
    ) -> Self
    where
        F: Fn() -> Box<dyn IdleBackend> + Send + 'static,
    {
        let backend_name = make_backend().name();
        tokio::spawn(async move {
            let mut last: Option<bool> = None;
            let mut failures: Vec<tokio::time::Instant> = Vec::new();

            loop {
                let (sample_tx, mut sample_rx) = mpsc::channel(8);
                let run_shutdown = shutdown.clone();
                let backend = make_backend();
                let handle = tokio::spawn(backend.run(sample_tx, run_shutdown));

                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            handle.abort();
                            return;
                        }
                        sample = sample_rx.recv() => {
                            match sample {
                                Some(Ok(is_idle)) => {
                                    if last != Some(is_idle) {
                                        last = Some(is_idle);
                                        if transitions.send(is_idle).await.is_err() {
                                            return;
                                        }
                                    }
                                }
                                Some(Err(e)) => {
                                    warn!(backend = backend_name, err = %e, "idle backend reported failure");
                                    break;
                                }
                                None => break,
                            }
                        }
                    }
                }

                if shutdown.is_cancelled() {
                    return;
                }

                // The backend's channel closed or reported failure. Fail open
                // to active, then decide whether to restart.
                if last != Some(false) {
                    last = Some(false);
                    if transitions.send(false).await.is_err() {
                        return;
                    }
                }

                let now = tokio::time::Instant::now();
                failures.retain(|t| now.duration_since(*t) < FAILURE_WINDOW);
                failures.push(now);
                if failures.len() as u32 > FAILURE_LIMIT {
                    error!(backend = backend_name, "idle backend failed repeatedly, degrading to permanent active");
                    return;
                }
            }
        });

        Self { backend_name }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
