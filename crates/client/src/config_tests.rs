// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;
use serde_json::json;

use super::{Command, Config};
use crate::credential::{LOGIN_HASH, LOGIN_NAME};

fn parse(args: &[&str]) -> Config {
    Config::parse_from(args)
}

#[test]
fn listen_with_defaults() -> anyhow::Result<()> {
    let config = parse(&["sockline", "listen"]);
    config.validate()?;
    assert_eq!(config.command, Command::Listen);
    assert_eq!(config.server_url()?.as_str(), "http://127.0.0.1:8080/");
    assert_eq!(config.ws_port, None);
    Ok(())
}

#[test]
fn send_with_message() -> anyhow::Result<()> {
    let config = parse(&["sockline", "send", "greet", r#"{"name":"x"}"#]);
    config.validate()?;
    assert_eq!(
        config.command,
        Command::Send { action: "greet".into(), message: Some(r#"{"name":"x"}"#.into()) }
    );
    assert_eq!(config.message()?, Some(json!({"name": "x"})));
    Ok(())
}

#[test]
fn send_without_message_is_null_payload() -> anyhow::Result<()> {
    let config = parse(&["sockline", "send", "ping"]);
    config.validate()?;
    assert_eq!(config.message()?, None);
    Ok(())
}

#[yare::parameterized(
    bad_url = { &["sockline", "--server", "not a url", "listen"], "invalid --server" },
    bad_scheme = { &["sockline", "--server", "ftp://host", "listen"], "unsupported --server scheme" },
    zero_port = { &["sockline", "--ws-port", "0", "listen"], "non-zero" },
    both_creds = { &["sockline", "--login-name", "a", "--credentials", "/tmp/c.json", "listen"],
                   "cannot combine" },
    bad_log_format = { &["sockline", "--log-format", "xml", "listen"], "invalid log format" },
    bad_message = { &["sockline", "send", "greet", "{nope"], "invalid JSON message" },
)]
fn invalid_config(args: &[&str], expected_substr: &str) {
    let config = parse(args);
    crate::assert_err_contains!(config.validate(), expected_substr);
}

#[test]
fn duration_overrides_win() {
    let mut config = Config::test();
    assert_eq!(config.reload_delay(), Duration::from_millis(50));
    config.reload_delay_ms = Some(5_000);
    config.port_timeout_ms = Some(250);
    assert_eq!(config.reload_delay(), Duration::from_secs(5));
    assert_eq!(config.port_timeout(), Duration::from_millis(250));
}

#[test]
fn fixed_port_skips_discovery() -> anyhow::Result<()> {
    let config = parse(&["sockline", "--ws-port", "9001", "listen"]);
    assert_eq!(config.port_resolver()?.cached(), Some(9001));
    Ok(())
}

#[test]
fn discovered_port_starts_unresolved() -> anyhow::Result<()> {
    let config = parse(&["sockline", "listen"]);
    assert_eq!(config.port_resolver()?.cached(), None);
    Ok(())
}

#[test]
fn inline_credentials() {
    let config = parse(&["sockline", "--login-name", "alice", "--login-hash", "h", "listen"]);
    let store = config.credential_store();
    assert_eq!(store.get(LOGIN_NAME).as_deref(), Some("alice"));
    assert_eq!(store.get(LOGIN_HASH).as_deref(), Some("h"));
}

#[test]
fn connect_options_carry_server_and_delay() -> anyhow::Result<()> {
    let config = Config::test();
    let options = config.connect_options()?;
    assert_eq!(options.server.host_str(), Some("127.0.0.1"));
    assert_eq!(options.reload_delay, Duration::from_millis(50));
    Ok(())
}
