// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;
use serial_test::serial;

use super::{init_tracing, IdleBackendSpec};
use crate::config::Config;

fn config_with(args: &[&str]) -> Config {
    let mut full = vec!["promptbridged"];
    full.extend_from_slice(args);
    Config::parse_from(full)
}

#[test]
#[serial]
fn init_tracing_is_idempotent() {
    let config = config_with(&[
        "--chat-api-base",
        "https://chat.example.com",
        "--chat-bot-token",
        "t",
        "--chat-app-token",
        "t",
        "--chat-channel",
        "C1",
    ]);
    // try_init swallows the "already set" error on the second call; this
    // just exercises that neither call panics.
    init_tracing(&config);
    init_tracing(&config);
}

#[test]
fn external_backend_requires_helper() {
    let config = config_with(&["--idle-backend", "external"]);
    let result = IdleBackendSpec::resolve(&config);
    assert!(result.is_err());
}

#[test]
fn external_backend_resolves_with_helper_configured() -> anyhow::Result<()> {
    let config = config_with(&["--idle-backend", "external", "--idle-helper", "/usr/bin/idle-helper"]);
    let spec = IdleBackendSpec::resolve(&config)?;
    assert!(matches!(spec, IdleBackendSpec::External { helper } if helper == "/usr/bin/idle-helper"));
    Ok(())
}

#[test]
fn logind_backend_resolves_without_extra_configuration() -> anyhow::Result<()> {
    let config = config_with(&["--idle-backend", "logind"]);
    let spec = IdleBackendSpec::resolve(&config)?;
    assert!(matches!(spec, IdleBackendSpec::Logind { .. }));
    Ok(())
}

#[test]
fn input_backend_carries_the_configured_threshold() -> anyhow::Result<()> {
    let config = config_with(&["--idle-backend", "input", "--idle-threshold-secs", "45"]);
    let spec = IdleBackendSpec::resolve(&config)?;
    assert!(matches!(spec, IdleBackendSpec::Input { threshold } if threshold == Duration::from_secs(45)));
    Ok(())
}

#[test]
fn unrecognized_backend_is_rejected() {
    let config = config_with(&["--idle-backend", "carrier-pigeon"]);
    assert!(IdleBackendSpec::resolve(&config).is_err());
}

#[test]
fn each_backend_spec_builds_a_backend_with_the_expected_name() {
    let external = IdleBackendSpec::External { helper: "helper".to_owned() };
    let logind = IdleBackendSpec::Logind { session_id: "auto".to_owned() };
    let input = IdleBackendSpec::Input { threshold: Duration::from_secs(60) };

    assert_eq!(external.build().name(), "external_helper");
    assert_eq!(logind.build().name(), "poll_logind");
    assert_eq!(input.build().name(), "poll_input");
}
