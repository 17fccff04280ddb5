// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection driver: runs one [`ClientSession`] over a real WebSocket.
//!
//! [`session`] returns a cloneable [`SessionHandle`] for submitting requests
//! and a [`SessionDriver`] that owns the socket. One call to
//! [`SessionDriver::run`] is one connection cycle: resolve the port, connect,
//! pump frames until the socket goes away, wait out the reload delay, and
//! tell the host the session is unrecoverable. Callers that want to keep
//! going start a fresh session.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::credential::CredentialStore;
use crate::frame::build_ws_url;
use crate::host::SessionHost;
use crate::listener::ListenerRegistry;
use crate::port::PortResolver;
use crate::queue::{Callback, PendingRequest};
use crate::session::ClientSession;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Where to connect and how long to wait before giving up on a lost session.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub server: reqwest::Url,
    pub reload_delay: Duration,
}

/// How a connection cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEnd {
    /// The shutdown token fired. The host was not notified.
    Shutdown,
    /// The socket closed or never opened, and the host has been told.
    ConnectionLost,
}

/// Build a session bound to `host` and `credentials`.
pub fn session(
    host: Arc<dyn SessionHost>,
    credentials: Arc<dyn CredentialStore>,
    options: ConnectOptions,
) -> (SessionHandle, SessionDriver) {
    let (tx, requests) = mpsc::unbounded_channel();
    let session = ClientSession::new(Arc::clone(&host), credentials);
    let handle = SessionHandle { tx, listeners: session.listeners() };
    (handle, SessionDriver { session, requests, options, host })
}

/// Cheap, cloneable front end of a running session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<PendingRequest>,
    listeners: ListenerRegistry,
}

impl SessionHandle {
    /// Submit a request. If the driver is gone the request is dropped along
    /// with its callback.
    pub fn send(
        &self,
        action: impl Into<String>,
        message: Option<Value>,
        callback: Option<Callback>,
    ) {
        let request = PendingRequest {
            action: action.into(),
            message: message.unwrap_or(Value::Null),
            callback,
        };
        if let Err(mpsc::error::SendError(request)) = self.tx.send(request) {
            debug!(action = %request.action, "session driver gone, request dropped");
        }
    }

    /// Submit a request and wait for its response payload.
    ///
    /// Fails if the request is abandoned: the connection closed, a server
    /// error cleared it, or the driver went away.
    pub async fn request(
        &self,
        action: impl Into<String>,
        message: Option<Value>,
    ) -> anyhow::Result<Value> {
        let action = action.into();
        let (tx, rx) = oneshot::channel();
        let callback: Callback = Box::new(move |value: Value| {
            let _ = tx.send(value);
        });
        self.send(action.clone(), message, Some(callback));
        rx.await.map_err(|_| anyhow::anyhow!("request {action:?} abandoned without a response"))
    }

    pub fn on(
        &self,
        id: impl Into<String>,
        listener: impl Fn(&str, &Value) + Send + Sync + 'static,
    ) {
        self.listeners.on(id, listener);
    }

    pub fn off(&self, id: &str) -> bool {
        self.listeners.off(id)
    }
}

/// Owns the socket side of one session.
pub struct SessionDriver {
    session: ClientSession,
    requests: mpsc::UnboundedReceiver<PendingRequest>,
    options: ConnectOptions,
    host: Arc<dyn SessionHost>,
}

impl SessionDriver {
    /// Run one connection cycle.
    ///
    /// Port resolution failures are returned as errors; nothing is retried
    /// and the host is not notified. Every other way the cycle ends, except
    /// cancellation, fires [`SessionHost::on_unrecoverable_disconnect`]
    /// exactly once after the reload delay.
    pub async fn run(
        self,
        resolver: &PortResolver,
        shutdown: CancellationToken,
    ) -> anyhow::Result<CycleEnd> {
        let Self { mut session, mut requests, options, host } = self;
        session.begin_connect();

        let connect = async {
            let port = resolver.resolve().await?;
            let url = build_ws_url(&options.server, port)?;
            info!(url = %url, "connecting");
            anyhow::Ok(tokio_tungstenite::connect_async(url).await)
        };
        tokio::pin!(connect);

        // Requests submitted while connecting are queued by the session.
        let opened = loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(CycleEnd::Shutdown),
                res = &mut connect => break res?,
                Some(req) = requests.recv() => submit(&mut session, req),
            }
        };

        match opened {
            Ok((ws, _)) => {
                info!("websocket connected");
                if pump(&mut session, &mut requests, ws, &shutdown).await {
                    return Ok(CycleEnd::Shutdown);
                }
            }
            Err(e) => session.on_error(&e),
        }
        session.on_close();

        info!(delay_ms = options.reload_delay.as_millis() as u64, "waiting before giving up");
        let delay = tokio::time::sleep(options.reload_delay);
        tokio::pin!(delay);
        loop {
            tokio::select! {
                _ = &mut delay => break,
                _ = shutdown.cancelled() => return Ok(CycleEnd::Shutdown),
                Some(req) = requests.recv() => submit(&mut session, req),
            }
        }

        host.on_unrecoverable_disconnect();
        Ok(CycleEnd::ConnectionLost)
    }
}

fn submit(session: &mut ClientSession, req: PendingRequest) {
    session.send(req.action, Some(req.message), req.callback);
}

/// Shuttle frames between the socket and the session until either side
/// stops. Returns true if the shutdown token ended it.
async fn pump(
    session: &mut ClientSession,
    requests: &mut mpsc::UnboundedReceiver<PendingRequest>,
    ws: WsStream,
    shutdown: &CancellationToken,
) -> bool {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (wire_tx, mut wire_rx) = mpsc::unbounded_channel::<String>();
    session.on_open(wire_tx);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                return true;
            }
            Some(text) = wire_rx.recv() => {
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    session.on_error(&e);
                    return false;
                }
            }
            Some(req) = requests.recv() => submit(session, req),
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => session.on_message(text.as_str()),
                Some(Ok(Message::Close(frame))) => {
                    debug!(frame = ?frame, "server closed websocket");
                    return false;
                }
                None => return false,
                Some(Err(e)) => {
                    session.on_error(&e);
                    return false;
                }
                Some(Ok(other)) => trace!(kind = ?other, "ignoring non-text frame"),
            },
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
