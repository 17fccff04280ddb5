// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommands of the `sockline` binary.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::connection::{session, CycleEnd};
use crate::host::SessionHost;

/// Send one request and return its response payload.
///
/// Fails if the request is abandoned (connection lost, server error) or if
/// `shutdown` fires first.
pub async fn send(
    config: &Config,
    host: Arc<dyn SessionHost>,
    action: &str,
    message: Option<Value>,
    shutdown: CancellationToken,
) -> anyhow::Result<Value> {
    let resolver = config.port_resolver()?;
    let (handle, driver) = session(host, config.credential_store(), config.connect_options()?);
    let stop = shutdown.child_token();
    let cycle = driver.run(&resolver, stop.clone());
    tokio::pin!(cycle);

    tokio::select! {
        reply = handle.request(action, message) => {
            stop.cancel();
            (&mut cycle).await?;
            reply
        }
        end = &mut cycle => match end? {
            CycleEnd::Shutdown => anyhow::bail!("interrupted before {action:?} was answered"),
            CycleEnd::ConnectionLost => {
                anyhow::bail!("connection lost before {action:?} was answered")
            }
        },
    }
}

/// Print every inbound frame through `sink` as one JSON line, starting a
/// fresh session whenever the previous one is lost. The WebSocket port is
/// resolved once and reused across sessions.
///
/// Returns the number of sessions started once `shutdown` fires.
pub async fn listen(
    config: &Config,
    host: Arc<dyn SessionHost>,
    shutdown: CancellationToken,
    sink: impl Fn(String) + Clone + Send + Sync + 'static,
) -> anyhow::Result<u32> {
    let resolver = config.port_resolver()?;
    let options = config.connect_options()?;
    let credentials = config.credential_store();

    let mut sessions = 0u32;
    loop {
        let (handle, driver) =
            session(Arc::clone(&host), Arc::clone(&credentials), options.clone());
        let sink = sink.clone();
        handle.on("listen", move |action, message| {
            sink(json!({"action": action, "message": message}).to_string());
        });
        sessions += 1;

        match driver.run(&resolver, shutdown.clone()).await? {
            CycleEnd::Shutdown => return Ok(sessions),
            CycleEnd::ConnectionLost => info!(sessions, "starting a fresh session"),
        }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
