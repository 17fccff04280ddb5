// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a scriptable backend, a recording host, and
//! assertion helpers.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc};

use crate::credential::CredentialStore;
use crate::error::ServerError;
use crate::frame::InitInfo;
use crate::host::{Notice, SessionHost};

/// Everything a [`RecordingHost`] was told, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Init(InitInfo),
    Notice(Notice),
    ServerError(ServerError),
    Unrecoverable,
}

/// [`SessionHost`] that records every call.
#[derive(Debug, Default)]
pub struct RecordingHost {
    events: Mutex<Vec<HostEvent>>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Notice(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn server_errors(&self) -> Vec<ServerError> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                HostEvent::ServerError(err) => Some(err.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn unrecoverable_count(&self) -> usize {
        self.events.lock().iter().filter(|e| **e == HostEvent::Unrecoverable).count()
    }
}

impl SessionHost for RecordingHost {
    fn on_init(&self, init: &InitInfo) {
        self.events.lock().push(HostEvent::Init(init.clone()));
    }

    fn notify(&self, notice: Notice) {
        self.events.lock().push(HostEvent::Notice(notice));
    }

    fn render_server_error(&self, error: &ServerError) {
        self.events.lock().push(HostEvent::ServerError(error.clone()));
    }

    fn on_unrecoverable_disconnect(&self) {
        self.events.lock().push(HostEvent::Unrecoverable);
    }
}

/// Mutable in-memory credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryCredentials {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_owned(), value.to_owned());
    }

    pub fn remove(&self, key: &str) {
        self.values.lock().remove(key);
    }
}

impl CredentialStore for MemoryCredentials {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }
}

/// Drain every frame currently buffered on a session's wire channel.
pub fn drain_wire(rx: &mut mpsc::UnboundedReceiver<String>) -> anyhow::Result<Vec<Value>> {
    let mut frames = Vec::new();
    while let Ok(text) = rx.try_recv() {
        frames.push(serde_json::from_str(&text)?);
    }
    Ok(frames)
}

/// Default payload of the mock backend's `init` reply.
pub fn default_init_payload() -> Value {
    json!({
        "userData": null,
        "package": {"version": "1.0.0"},
        "latestVersion": "1.0.0",
    })
}

struct BackendState {
    ws_port: u16,
    port_body: Option<String>,
    port_status: StatusCode,
    port_hits: AtomicU32,
    connections: AtomicU32,
    init_payload: Value,
    init_delay: Duration,
    received: Mutex<Vec<Value>>,
    push_tx: broadcast::Sender<Outgoing>,
}

/// Builder for [`MockBackend`].
pub struct MockBackendBuilder {
    port_body: Option<String>,
    port_status: StatusCode,
    init_payload: Value,
    init_delay: Duration,
}

impl MockBackendBuilder {
    /// Serve this body from `/wsport` instead of the backend's own port.
    pub fn port_body(mut self, body: &str) -> Self {
        self.port_body = Some(body.to_owned());
        self
    }

    pub fn port_status(mut self, status: StatusCode) -> Self {
        self.port_status = status;
        self
    }

    pub fn init_payload(mut self, payload: Value) -> Self {
        self.init_payload = payload;
        self
    }

    /// Hold the `init` reply back for `delay`.
    pub fn init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub async fn spawn(self) -> anyhow::Result<MockBackend> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (push_tx, _) = broadcast::channel(64);
        let state = Arc::new(BackendState {
            ws_port: addr.port(),
            port_body: self.port_body,
            port_status: self.port_status,
            port_hits: AtomicU32::new(0),
            connections: AtomicU32::new(0),
            init_payload: self.init_payload,
            init_delay: self.init_delay,
            received: Mutex::new(Vec::new()),
            push_tx,
        });
        let router = Router::new()
            .route("/wsport", get(wsport))
            .route("/", get(ws_upgrade))
            .with_state(Arc::clone(&state));
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        Ok(MockBackend { addr, state, handle })
    }
}

/// In-process backend speaking the client protocol.
///
/// Serves `/wsport` (its own port unless overridden) and a WebSocket at `/`
/// that:
/// - answers `init` with the configured payload,
/// - answers `fail` with an error descriptor,
/// - answers `dupe` twice with the same correlation id,
/// - closes the socket on `kick`,
/// - never answers `silent`,
/// - echoes the payload of anything else, after `message.delayMs` if set.
///
/// Only requests carrying a `callbackId` get a reply.
pub struct MockBackend {
    pub addr: SocketAddr,
    state: Arc<BackendState>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockBackend {
    pub fn builder() -> MockBackendBuilder {
        MockBackendBuilder {
            port_body: None,
            port_status: StatusCode::OK,
            init_payload: default_init_payload(),
            init_delay: Duration::ZERO,
        }
    }

    pub async fn spawn() -> anyhow::Result<Self> {
        Self::builder().spawn().await
    }

    pub fn server_url(&self) -> anyhow::Result<reqwest::Url> {
        Ok(reqwest::Url::parse(&format!("http://{}", self.addr))?)
    }

    pub fn port_hits(&self) -> u32 {
        self.state.port_hits.load(Ordering::SeqCst)
    }

    /// Number of WebSocket connections accepted so far.
    pub fn connections(&self) -> u32 {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Frames received from clients, in arrival order.
    pub fn received(&self) -> Vec<Value> {
        self.state.received.lock().clone()
    }

    /// Wait until at least `count` frames have arrived.
    pub async fn wait_for_frames(
        &self,
        count: usize,
        timeout: Duration,
    ) -> anyhow::Result<Vec<Value>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let frames = self.received();
            if frames.len() >= count {
                return Ok(frames);
            }
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!(
                    "timed out waiting for {count} frames, got {}: {frames:?}",
                    frames.len()
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Push a frame to every connected client.
    pub fn push(&self, frame: &Value) -> anyhow::Result<()> {
        self.state
            .push_tx
            .send(Some(frame.to_string()))
            .map_err(|_| anyhow::anyhow!("no client connected"))?;
        Ok(())
    }

    /// Close every connected client's socket from the server side.
    pub fn close_all(&self) -> anyhow::Result<()> {
        self.state.push_tx.send(None).map_err(|_| anyhow::anyhow!("no client connected"))?;
        Ok(())
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn wsport(State(state): State<Arc<BackendState>>) -> impl IntoResponse {
    state.port_hits.fetch_add(1, Ordering::SeqCst);
    let body = state.port_body.clone().unwrap_or_else(|| state.ws_port.to_string());
    (state.port_status, body)
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<BackendState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Outgoing item for a connection's writer task. `None` closes the socket.
type Outgoing = Option<String>;

async fn handle_socket(socket: WebSocket, state: Arc<BackendState>) {
    state.connections.fetch_add(1, Ordering::SeqCst);
    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outgoing>();
    let mut push_rx = state.push_tx.subscribe();

    tokio::spawn(async move {
        loop {
            let out = tokio::select! {
                out = out_rx.recv() => out.flatten(),
                pushed = push_rx.recv() => match pushed {
                    Ok(out) => out,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(_) => break,
                },
            };
            let Some(text) = out else {
                let _ = sink.send(Message::Close(None)).await;
                break;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = stream.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) else {
            continue;
        };
        state.received.lock().push(frame.clone());
        if frame["action"] == "kick" {
            let _ = out_tx.send(None);
            break;
        }
        reply(&state, &frame, &out_tx);
    }
}

fn reply(state: &BackendState, frame: &Value, out_tx: &mpsc::UnboundedSender<Outgoing>) {
    let Some(callback_id) = frame.get("callbackId").cloned() else {
        return;
    };
    let action = frame["action"].clone();
    let message = frame.get("message").cloned().unwrap_or(Value::Null);

    let (payload, delay, copies) = match action.as_str() {
        Some("init") => (state.init_payload.clone(), state.init_delay, 1),
        Some("fail") => (json!({"error": {"message": "boom"}}), Duration::ZERO, 1),
        Some("dupe") => (message, Duration::ZERO, 2),
        Some("silent") => return,
        _ => {
            let delay = message.get("delayMs").and_then(Value::as_u64).unwrap_or(0);
            (message, Duration::from_millis(delay), 1)
        }
    };
    let text =
        json!({"action": action, "callbackId": callback_id, "message": payload}).to_string();

    let out_tx = out_tx.clone();
    tokio::spawn(async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        for _ in 0..copies {
            let _ = out_tx.send(Some(text.clone()));
        }
    });
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
