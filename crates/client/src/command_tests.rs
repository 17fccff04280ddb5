// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::test_support::{MockBackend, RecordingHost};

const WAIT: Duration = Duration::from_secs(5);

fn config_for(backend: &MockBackend) -> Config {
    let mut config = Config::test();
    config.server = format!("http://{}", backend.addr);
    config
}

async fn next_line(rx: &mut mpsc::UnboundedReceiver<String>) -> anyhow::Result<Value> {
    let line = timeout(WAIT, rx.recv()).await?.ok_or_else(|| anyhow::anyhow!("sink closed"))?;
    Ok(serde_json::from_str(&line)?)
}

#[tokio::test]
async fn send_returns_the_reply() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let config = config_for(&backend);
    let host = RecordingHost::new();

    let reply = timeout(
        WAIT,
        send(&config, host.clone(), "echo", Some(json!({"a": 1})), CancellationToken::new()),
    )
    .await??;

    assert_eq!(reply, json!({"a": 1}));
    assert_eq!(host.unrecoverable_count(), 0);
    Ok(())
}

#[tokio::test]
async fn send_fails_on_server_error() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let config = config_for(&backend);
    let host = RecordingHost::new();

    let result =
        timeout(WAIT, send(&config, host.clone(), "fail", None, CancellationToken::new())).await?;

    crate::assert_err_contains!(result, "abandoned");
    let errors = host.server_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "boom");
    Ok(())
}

#[tokio::test]
async fn send_fails_when_the_server_hangs_up() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let config = config_for(&backend);

    let result = timeout(
        WAIT,
        send(&config, RecordingHost::new(), "kick", None, CancellationToken::new()),
    )
    .await?;

    crate::assert_err_contains!(result, "abandoned");
    Ok(())
}

#[tokio::test]
async fn listen_restarts_after_loss_and_reuses_port() -> anyhow::Result<()> {
    let backend = MockBackend::spawn().await?;
    let config = config_for(&backend);
    let host = RecordingHost::new();
    let shutdown = CancellationToken::new();
    let (line_tx, mut line_rx) = mpsc::unbounded_channel();

    let task = tokio::spawn({
        let host = host.clone();
        let shutdown = shutdown.clone();
        async move {
            let sink = move |line: String| {
                let _ = line_tx.send(line);
            };
            listen(&config, host, shutdown, sink).await
        }
    });

    assert_eq!(next_line(&mut line_rx).await?["action"], "init");
    backend.close_all()?;
    assert_eq!(next_line(&mut line_rx).await?["action"], "init");

    backend.push(&json!({"action": "tick", "message": 1}))?;
    assert_eq!(next_line(&mut line_rx).await?, json!({"action": "tick", "message": 1}));

    shutdown.cancel();
    let sessions = timeout(WAIT, task).await???;
    assert_eq!(sessions, 2);
    assert_eq!(backend.port_hits(), 1);
    assert_eq!(backend.connections(), 2);
    assert_eq!(host.unrecoverable_count(), 1);
    Ok(())
}

#[tokio::test]
async fn listen_stops_on_port_failure() -> anyhow::Result<()> {
    let backend = MockBackend::builder().port_body("0").spawn().await?;
    let config = config_for(&backend);

    let result = timeout(
        WAIT,
        listen(&config, RecordingHost::new(), CancellationToken::new(), |_| {}),
    )
    .await?;

    crate::assert_err_contains!(result, "PORT_RESOLUTION");
    Ok(())
}
