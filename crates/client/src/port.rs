// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket port discovery via `GET /wsport`.

use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::FailureKind;

enum Source {
    Http { url: String, client: Client },
    Fixed,
}

/// Resolves the backend's WebSocket port once and caches it.
///
/// Share one resolver (behind an `Arc`) across connection cycles so the
/// lookup happens once per process.
pub struct PortResolver {
    source: Source,
    port: OnceCell<u16>,
}

impl PortResolver {
    /// Discover the port from `<server>/wsport`.
    pub fn http(server: &reqwest::Url, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();
        let url = format!("{}/wsport", server.as_str().trim_end_matches('/'));
        Self { source: Source::Http { url, client }, port: OnceCell::new() }
    }

    /// Skip discovery and use `port`.
    pub fn fixed(port: u16) -> Self {
        Self { source: Source::Fixed, port: OnceCell::new_with(Some(port)) }
    }

    /// The cached port, if it has been resolved.
    pub fn cached(&self) -> Option<u16> {
        self.port.get().copied()
    }

    /// Return the cached port or fetch it. A failed fetch leaves the cache
    /// empty and is returned to the caller; there is no retry.
    pub async fn resolve(&self) -> anyhow::Result<u16> {
        if let Some(port) = self.cached() {
            debug!(port, "using cached websocket port");
            return Ok(port);
        }
        let port = self.port.get_or_try_init(|| self.fetch()).await?;
        Ok(*port)
    }

    async fn fetch(&self) -> anyhow::Result<u16> {
        let (url, client) = match self.source {
            Source::Http { ref url, ref client } => (url, client),
            Source::Fixed => anyhow::bail!("{}: no port configured", FailureKind::PortResolution),
        };
        let body = async {
            let resp = client.get(url).send().await?.error_for_status()?;
            anyhow::Ok(resp.text().await?)
        }
        .await
        .with_context(|| format!("{}: GET {url}", FailureKind::PortResolution))?;
        let port = parse_port(&body)?;
        info!(port, "resolved websocket port");
        Ok(port)
    }
}

/// Parse the `/wsport` body. Leading whitespace is skipped and the leading
/// run of digits is taken, so `"8081\n"` and `"8081 (ws)"` both yield 8081.
pub fn parse_port(body: &str) -> anyhow::Result<u16> {
    let trimmed = body.trim_start();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = trimmed.find(|c: char| !c.is_ascii_digit()).unwrap_or(trimmed.len());
    let digits = &trimmed[..end];
    if digits.is_empty() {
        anyhow::bail!("{}: not a port number: {body:?}", FailureKind::PortResolution);
    }
    let port: u16 = digits.parse().map_err(|_| {
        anyhow::anyhow!("{}: port out of range: {digits}", FailureKind::PortResolution)
    })?;
    if port == 0 {
        anyhow::bail!("{}: port 0 is not connectable", FailureKind::PortResolution);
    }
    Ok(port)
}

#[cfg(test)]
#[path = "port_tests.rs"]
mod tests;
