// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::Value;

use crate::connection::ConnectOptions;
use crate::credential::{CredentialStore, JsonFileStore, StaticCredentials};
use crate::port::PortResolver;

/// WebSocket action client with request/response correlation.
#[derive(Debug, Parser)]
#[command(name = "sockline", version, about)]
pub struct Config {
    /// Base URL of the backend. `/wsport` is fetched from here and its host
    /// is used for the WebSocket.
    #[arg(long, env = "SOCKLINE_SERVER", default_value = "http://127.0.0.1:8080")]
    pub server: String,

    /// WebSocket port. Skips the `/wsport` lookup when set.
    #[arg(long, env = "SOCKLINE_WS_PORT")]
    pub ws_port: Option<u16>,

    /// Login name sent with every request.
    #[arg(long, env = "SOCKLINE_LOGIN_NAME")]
    pub login_name: Option<String>,

    /// Login hash sent with every request.
    #[arg(long, env = "SOCKLINE_LOGIN_HASH", hide_env_values = true)]
    pub login_hash: Option<String>,

    /// JSON file holding `loginName` / `loginHash`, re-read on every request.
    #[arg(long, env = "SOCKLINE_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Log format (json or text).
    #[arg(long, env = "SOCKLINE_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "SOCKLINE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,

    // -- Duration overrides (skip from CLI; set in Config::test()) --------
    #[clap(skip)]
    pub reload_delay_ms: Option<u64>,
    #[clap(skip)]
    pub port_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, clap::Subcommand)]
pub enum Command {
    /// Send one action, print the response, and exit.
    Send {
        /// Action name.
        action: String,
        /// JSON payload (omitted means null).
        message: Option<String>,
    },
    /// Print every inbound frame as a JSON line until interrupted.
    Listen,
}

fn env_duration_ms(var: &str, default: u64) -> Duration {
    let ms = std::env::var(var).ok().and_then(|v| v.parse().ok()).unwrap_or(default);
    Duration::from_millis(ms)
}

macro_rules! duration_field {
    ($method:ident, $field:ident, $env:literal, $default:expr) => {
        pub fn $method(&self) -> Duration {
            match self.$field {
                Some(ms) => Duration::from_millis(ms),
                None => env_duration_ms($env, $default),
            }
        }
    };
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server_url()?;

        if self.ws_port == Some(0) {
            anyhow::bail!("--ws-port must be non-zero");
        }

        let inline = self.login_name.is_some() || self.login_hash.is_some();
        if inline && self.credentials.is_some() {
            anyhow::bail!("cannot combine --login-name/--login-hash with --credentials");
        }

        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }

        self.message()?;
        Ok(())
    }

    // -- Tuning knobs (field override → env var → compiled default) --------

    duration_field!(reload_delay, reload_delay_ms, "SOCKLINE_RELOAD_DELAY_MS", 5_000);
    duration_field!(port_timeout, port_timeout_ms, "SOCKLINE_PORT_TIMEOUT_MS", 10_000);

    /// Build a minimal `Config` for tests (`listen`, tiny delays).
    #[doc(hidden)]
    pub fn test() -> Self {
        Self {
            server: "http://127.0.0.1:8080".into(),
            ws_port: None,
            login_name: None,
            login_hash: None,
            credentials: None,
            log_format: "text".into(),
            log_level: "debug".into(),
            command: Command::Listen,
            reload_delay_ms: Some(50),
            port_timeout_ms: Some(1_000),
        }
    }

    /// Parse `--server` into a URL, accepting only http and https.
    pub fn server_url(&self) -> anyhow::Result<reqwest::Url> {
        let url = reqwest::Url::parse(&self.server)
            .map_err(|e| anyhow::anyhow!("invalid --server {:?}: {e}", self.server))?;
        match url.scheme() {
            "http" | "https" => {}
            other => anyhow::bail!("unsupported --server scheme: {other}"),
        }
        if url.host_str().is_none() {
            anyhow::bail!("--server has no host: {}", self.server);
        }
        Ok(url)
    }

    /// Payload of `send`, parsed from JSON.
    pub fn message(&self) -> anyhow::Result<Option<Value>> {
        match self.command {
            Command::Send { message: Some(ref raw), .. } => {
                let value = serde_json::from_str(raw)
                    .map_err(|e| anyhow::anyhow!("invalid JSON message: {e}"))?;
                Ok(Some(value))
            }
            _ => Ok(None),
        }
    }

    pub fn port_resolver(&self) -> anyhow::Result<PortResolver> {
        Ok(match self.ws_port {
            Some(port) => PortResolver::fixed(port),
            None => PortResolver::http(&self.server_url()?, self.port_timeout()),
        })
    }

    pub fn credential_store(&self) -> Arc<dyn CredentialStore> {
        match self.credentials {
            Some(ref path) => Arc::new(JsonFileStore::new(path)),
            None => Arc::new(StaticCredentials {
                login_name: self.login_name.clone(),
                login_hash: self.login_hash.clone(),
            }),
        }
    }

    pub fn connect_options(&self) -> anyhow::Result<ConnectOptions> {
        Ok(ConnectOptions { server: self.server_url()?, reload_delay: self.reload_delay() })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
