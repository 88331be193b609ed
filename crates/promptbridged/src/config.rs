// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration (§4.6): layered file < env < CLI flag, merged before
//! `clap::Parser::parse` runs so the same struct documents both the
//! environment and the flag surface.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

/// Bridges locally generated tool-permission prompts to a remote chat
/// service while the user is away.
#[derive(Debug, Parser)]
#[command(name = "promptbridged", version, about)]
pub struct Config {
    /// Path to the IPC endpoint (default: $XDG_RUNTIME_DIR/promptbridged.sock,
    /// falling back to /tmp when unset).
    #[arg(long, env = "PROMPTBRIDGED_IPC_PATH")]
    pub ipc_path: Option<PathBuf>,

    /// Informational idle threshold in seconds. The backend, not this value,
    /// is what actually fires transitions.
    #[arg(long, env = "PROMPTBRIDGED_IDLE_THRESHOLD", default_value = "60")]
    pub idle_threshold_secs: u64,

    /// Upper bound in seconds on how long a request may wait for resolution.
    #[arg(long, env = "PROMPTBRIDGED_REQUEST_BOUND", default_value = "300")]
    pub request_bound_secs: u64,

    /// Chat service API base URL.
    #[arg(long, env = "PROMPTBRIDGED_CHAT_API_BASE")]
    pub chat_api_base: Option<String>,

    /// Chat service bot/API token.
    #[arg(long, env = "PROMPTBRIDGED_CHAT_BOT_TOKEN")]
    pub chat_bot_token: Option<String>,

    /// Chat service app/socket-level token for the event stream.
    #[arg(long, env = "PROMPTBRIDGED_CHAT_APP_TOKEN")]
    pub chat_app_token: Option<String>,

    /// Chat destination (channel/conversation identifier).
    #[arg(long, env = "PROMPTBRIDGED_CHAT_CHANNEL")]
    pub chat_channel: Option<String>,

    /// Comma-separated notification types to drop rather than post.
    #[arg(long, env = "PROMPTBRIDGED_NOTIFICATION_FILTER", default_value = "permission_prompt")]
    pub notification_filter: String,

    /// Idle-detection backend: "external", "logind", or "input".
    #[arg(long, env = "PROMPTBRIDGED_IDLE_BACKEND", default_value = "external")]
    pub idle_backend: String,

    /// External idle helper program (only used when `idle_backend = external`).
    #[arg(long, env = "PROMPTBRIDGED_IDLE_HELPER")]
    pub idle_helper: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format: json (default, for supervised deployments) or pretty.
    #[arg(long, env = "PROMPTBRIDGED_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Path to a TOML config file. Skipped if unset and the default path
    /// doesn't exist.
    #[arg(long, env = "PROMPTBRIDGED_CONFIG")]
    pub config_file: Option<PathBuf>,
}

/// The subset of `Config` that may come from the TOML file layer. Every
/// field is optional; the file layer only pre-seeds environment variables
/// for keys it actually sets.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    ipc_path: Option<PathBuf>,
    idle_threshold_secs: Option<u64>,
    request_bound_secs: Option<u64>,
    chat_api_base: Option<String>,
    chat_bot_token: Option<String>,
    chat_app_token: Option<String>,
    chat_channel: Option<String>,
    notification_filter: Option<String>,
    idle_backend: Option<String>,
    idle_helper: Option<String>,
    log_format: Option<String>,
}

impl FileConfig {
    /// Pre-seed `std::env::set_var` for each field this file sets, unless
    /// the environment already overrides it — giving file < env precedence
    /// before `clap` layers the CLI flags on top.
    fn seed_env(&self) {
        fn seed(key: &str, value: &Option<impl ToString>) {
            if std::env::var_os(key).is_none() {
                if let Some(value) = value {
                    std::env::set_var(key, value.to_string());
                }
            }
        }

        seed("PROMPTBRIDGED_IPC_PATH", &self.ipc_path.as_ref().map(|p| p.display().to_string()));
        seed("PROMPTBRIDGED_IDLE_THRESHOLD", &self.idle_threshold_secs);
        seed("PROMPTBRIDGED_REQUEST_BOUND", &self.request_bound_secs);
        seed("PROMPTBRIDGED_CHAT_API_BASE", &self.chat_api_base);
        seed("PROMPTBRIDGED_CHAT_BOT_TOKEN", &self.chat_bot_token);
        seed("PROMPTBRIDGED_CHAT_APP_TOKEN", &self.chat_app_token);
        seed("PROMPTBRIDGED_CHAT_CHANNEL", &self.chat_channel);
        seed("PROMPTBRIDGED_NOTIFICATION_FILTER", &self.notification_filter);
        seed("PROMPTBRIDGED_IDLE_BACKEND", &self.idle_backend);
        seed("PROMPTBRIDGED_IDLE_HELPER", &self.idle_helper);
        seed("PROMPTBRIDGED_LOG_FORMAT", &self.log_format);
    }
}

/// Default per-user config file path: `$XDG_CONFIG_HOME/promptbridged/config.toml`,
/// falling back to `~/.config/promptbridged/config.toml`.
fn default_config_path() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg).join("promptbridged/config.toml"));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/promptbridged/config.toml"))
}

/// Parse configuration: merge an optional TOML file into the environment,
/// then let `clap` parse flags (which take precedence over both).
pub fn parse() -> anyhow::Result<Config> {
    let explicit_path = std::env::args()
        .collect::<Vec<_>>()
        .windows(2)
        .find(|w| w[0] == "--config-file")
        .map(|w| PathBuf::from(&w[1]));

    let path = explicit_path.or_else(default_config_path);
    if let Some(path) = path {
        if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
            let file_config: FileConfig = toml::from_str(&text)
                .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?;
            file_config.seed_env();
        }
    }

    Ok(Config::parse())
}

impl Config {
    /// Validate after merging: chat credentials present, idle backend
    /// recognized (and its helper configured if required), IPC path's
    /// parent directory exists and is writable.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chat_api_base.is_none() {
            anyhow::bail!("chat API base URL is required (--chat-api-base)");
        }
        if self.chat_bot_token.is_none() {
            anyhow::bail!("chat bot token is required (--chat-bot-token)");
        }
        if self.chat_app_token.is_none() {
            anyhow::bail!("chat app token is required (--chat-app-token)");
        }
        if self.chat_channel.is_none() {
            anyhow::bail!("chat destination is required (--chat-channel)");
        }

        match self.idle_backend.as_str() {
            "external" => {
                if self.idle_helper.is_none() {
                    anyhow::bail!("--idle-helper is required when --idle-backend=external");
                }
            }
            "logind" | "input" => {}
            other => anyhow::bail!("unrecognized idle backend: {other}"),
        }

        let ipc_path = self.resolved_ipc_path();
        if let Some(parent) = ipc_path.parent() {
            if !parent.exists() {
                anyhow::bail!("IPC endpoint directory does not exist: {}", parent.display());
            }
        }

        Ok(())
    }

    pub fn resolved_ipc_path(&self) -> PathBuf {
        if let Some(path) = &self.ipc_path {
            return path.clone();
        }
        let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/tmp"));
        runtime_dir.join("promptbridged.sock")
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_secs)
    }

    pub fn request_bound(&self) -> Duration {
        Duration::from_secs(self.request_bound_secs)
    }

    pub fn notification_filter_set(&self) -> HashSet<String> {
        self.notification_filter.split(',').map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()).collect()
    }

    /// Effective tracing filter level: `-v` raises `info` to `debug`, `-vv`
    /// or more to `trace`.
    pub fn effective_log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
