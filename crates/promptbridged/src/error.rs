// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error classification for the chat adapter and idle monitor.
//!
//! The rest of the crate propagates `anyhow::Result` at component boundaries;
//! these two enums exist only where a caller needs to distinguish failure
//! kinds rather than just log-and-continue.

use std::fmt;

/// Failure posting to or updating the chat service.
#[derive(Debug)]
pub enum ChatError {
    /// The outbound request failed (network, auth, rate limit, ...).
    Transport(String),
    /// The service reported the request was rejected.
    Rejected(String),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "chat transport error: {msg}"),
            Self::Rejected(msg) => write!(f, "chat service rejected request: {msg}"),
        }
    }
}

impl std::error::Error for ChatError {}

/// Failure starting or running an idle-detection backend.
#[derive(Debug)]
pub enum IdleError {
    /// No backend is usable on this host.
    NoBackendAvailable,
    /// The backend process/API failed after startup.
    BackendFailed(String),
}

impl fmt::Display for IdleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBackendAvailable => write!(f, "no idle-detection backend is available"),
            Self::BackendFailed(msg) => write!(f, "idle backend failed: {msg}"),
        }
    }
}

impl std::error::Error for IdleError {}
