// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup wiring (§4.6): config → tracing init → bind IPC listener → start
//! Idle Monitor → connect Chat Adapter → run the Coordinator → graceful
//! shutdown on SIGTERM/SIGINT.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::chat::client::ChatClient;
use crate::chat::{ChatAdapter, ChatConfig};
use crate::config::Config;
use crate::coordinator::{Coordinator, CoordinatorEvent};
use crate::idle::external::ExternalHelperBackend;
use crate::idle::poll_input::InputIdlePollBackend;
use crate::idle::poll_logind::LogindPollBackend;
use crate::idle::{IdleBackend, IdleMonitor};
use crate::ipc::IpcServer;
use crate::state::StateStore;

/// Initialize `tracing-subscriber` from the resolved config. Safe to call
/// more than once (e.g. from tests) since it uses `try_init`.
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.effective_log_level()));

    let result = match config.log_format.as_str() {
        "pretty" => fmt::fmt().with_env_filter(filter).pretty().try_init(),
        _ => fmt::fmt().with_env_filter(filter).json().try_init(),
    };
    drop(result);
}

/// The idle backend choice, resolved once at startup (fallible: a chosen
/// backend may need configuration that's missing) so the restart factory
/// handed to `IdleMonitor::spawn` can build fresh instances infallibly.
enum IdleBackendSpec {
    External { helper: String },
    Logind { session_id: String },
    Input { threshold: Duration },
}

impl IdleBackendSpec {
    fn resolve(config: &Config) -> anyhow::Result<Self> {
        match config.idle_backend.as_str() {
            "external" => {
                let helper = config
                    .idle_helper
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("idle backend 'external' requires --idle-helper"))?;
                Ok(Self::External { helper })
            }
            "logind" => {
                let session_id = std::env::var("XDG_SESSION_ID").unwrap_or_else(|_| "auto".to_owned());
                Ok(Self::Logind { session_id })
            }
            "input" => Ok(Self::Input { threshold: config.idle_threshold() }),
            other => anyhow::bail!("unrecognized idle backend: {other}"),
        }
    }

    fn build(&self) -> Box<dyn IdleBackend> {
        match self {
            Self::External { helper } => Box::new(ExternalHelperBackend::new(helper.clone(), Vec::new())),
            Self::Logind { session_id } => Box::new(LogindPollBackend::new(session_id.clone())),
            Self::Input { threshold } => Box::new(InputIdlePollBackend::new("xprintidle", *threshold)),
        }
    }
}

/// Run the daemon to completion. Returns the process exit code.
pub async fn run(config: Config) -> anyhow::Result<i32> {
    init_tracing(&config);

    let ipc_path = config.resolved_ipc_path();
    let ipc_server = IpcServer::bind(&ipc_path).await?;
    info!(path = %ipc_server.path().display(), "IPC listener bound");

    let state = Arc::new(StateStore::new());
    let shutdown = CancellationToken::new();

    let chat_config = ChatConfig {
        api_base: config.chat_api_base.clone().unwrap_or_default(),
        bot_token: config.chat_bot_token.clone().unwrap_or_default(),
        app_token: config.chat_app_token.clone().unwrap_or_default(),
        channel_id: config.chat_channel.clone().unwrap_or_default(),
    };
    let (chat_client, mut button_rx) = ChatClient::connect(chat_config, shutdown.clone());
    let chat: Arc<dyn ChatAdapter> = Arc::new(chat_client);

    let coordinator =
        Coordinator::new(Arc::clone(&state), chat, config.notification_filter_set(), config.request_bound());
    let events_tx = coordinator.event_sender();

    // Idle Monitor: dedup is the monitor's job; this task just forwards
    // transitions onto the coordinator's queue.
    let (idle_tx, mut idle_rx) = tokio::sync::mpsc::channel(8);
    let idle_spec = IdleBackendSpec::resolve(&config)?;
    let idle_monitor = IdleMonitor::spawn(move || idle_spec.build(), idle_tx, shutdown.clone());
    info!(backend = idle_monitor.backend_name(), "idle monitor started");

    {
        let events_tx = events_tx.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    transition = idle_rx.recv() => {
                        match transition {
                            Some(is_idle) => {
                                let _ = events_tx.send(CoordinatorEvent::IdleTransition(is_idle)).await;
                            }
                            None => return,
                        }
                    }
                }
            }
        });
    }

    {
        let events_tx = events_tx.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    press = button_rx.recv() => {
                        match press {
                            Some(press) => {
                                let _ = events_tx.send(CoordinatorEvent::ButtonPress(press)).await;
                            }
                            None => return,
                        }
                    }
                }
            }
        });
    }

    tokio::spawn(ipc_server.run(events_tx, shutdown.clone()));

    spawn_signal_handler(shutdown.clone());

    coordinator.run(shutdown.clone()).await;

    // Bounded grace period for background tasks (idle monitor, chat
    // adapter) to notice cancellation and unwind.
    tokio::time::sleep(Duration::from_millis(200)).await;

    info!("daemon shut down cleanly");
    Ok(0)
}

/// First SIGTERM/SIGINT triggers graceful shutdown; a second forces exit.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

        tokio::select! {
            _ = async { if let Some(s) = sigterm.as_mut() { s.recv().await } else { std::future::pending().await } } => {
                info!("received SIGTERM");
            }
            _ = async { if let Some(s) = sigint.as_mut() { s.recv().await } else { std::future::pending().await } } => {
                info!("received SIGINT");
            }
        }
        shutdown.cancel();

        tokio::select! {
            _ = async { if let Some(s) = sigterm.as_mut() { s.recv().await } else { std::future::pending().await } } => {
                info!("received SIGTERM again, forcing exit");
            }
            _ = async { if let Some(s) = sigint.as_mut() { s.recv().await } else { std::future::pending().await } } => {
                info!("received SIGINT again, forcing exit");
            }
        }
        std::process::exit(130);
    });
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
