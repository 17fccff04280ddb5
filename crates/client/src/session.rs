// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client session state machine.
//!
//! [`ClientSession`] owns the correlation state for one connection: the
//! callback registry, the outbound queue, the listener registry, and the
//! handle used to put text frames on the wire. It performs no I/O itself;
//! the connection driver feeds it transport signals (`on_open`,
//! `on_message`, `on_error`, `on_close`) and forwards whatever it writes to
//! the wire channel.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──open──▶ Handshaking ──init reply──▶ Connected
//!       ▲                                                                       │
//!       └────────────────────────────── close ─────────────────────────────────┘
//! ```
//!
//! Requests submitted before `Connected` are queued and flushed, in order,
//! right after the init reply has been handled.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::callback::{CallbackRegistry, Taken};
use crate::credential::{CredentialStore, LOGIN_HASH, LOGIN_NAME};
use crate::error::{FailureKind, ServerError};
use crate::frame::{InboundFrame, InitInfo, OutboundFrame, INIT_ACTION, SERVER_DISCONNECT_ACTION};
use crate::host::{Notice, SessionHost};
use crate::listener::ListenerRegistry;
use crate::queue::{Callback, OutboundQueue, PendingRequest};

/// Lifecycle of a session's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Port lookup or socket open in progress.
    Connecting,
    /// Socket open, init request sent, reply outstanding.
    Handshaking,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a correlation id is waiting for.
enum Awaiting {
    Handshake,
    Reply(Callback),
}

/// Sending half of the live socket plus the credential source stamped onto
/// every frame.
struct Wire {
    tx: mpsc::UnboundedSender<String>,
    credentials: Arc<dyn CredentialStore>,
}

impl Wire {
    fn transmit(
        &self,
        callbacks: &mut CallbackRegistry<Awaiting>,
        action: String,
        message: Value,
        awaiting: Option<Awaiting>,
    ) {
        let callback_id = awaiting.map(|a| callbacks.register(a));
        let frame = OutboundFrame {
            action,
            callback_id,
            message,
            login_name: self.credentials.get(LOGIN_NAME),
            login_hash: self.credentials.get(LOGIN_HASH),
        };
        let text = match frame.to_text() {
            Ok(t) => t,
            Err(e) => {
                error!(action = %frame.action, err = %e, "failed to encode frame");
                return;
            }
        };
        debug!(action = %frame.action, callback_id = ?frame.callback_id, "send");
        if self.tx.send(text).is_err() {
            warn!(
                kind = %FailureKind::Transport,
                action = %frame.action,
                "socket writer gone, frame dropped"
            );
        }
    }
}

/// Request/response correlation over one connection.
pub struct ClientSession {
    state: ConnectionState,
    wire: Option<Wire>,
    callbacks: CallbackRegistry<Awaiting>,
    queue: OutboundQueue,
    listeners: ListenerRegistry,
    user: Option<Value>,
    host: Arc<dyn SessionHost>,
    credentials: Arc<dyn CredentialStore>,
}

impl ClientSession {
    pub fn new(host: Arc<dyn SessionHost>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            wire: None,
            callbacks: CallbackRegistry::new(),
            queue: OutboundQueue::new(),
            listeners: ListenerRegistry::new(),
            user: None,
            host,
            credentials,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// User record from the init reply, if someone is logged in.
    pub fn user(&self) -> Option<&Value> {
        self.user.as_ref()
    }

    /// Handle to this session's listeners.
    pub fn listeners(&self) -> ListenerRegistry {
        self.listeners.clone()
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

    /// Requests waiting for the connection.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Correlation ids still waiting for a reply.
    pub fn in_flight(&self) -> usize {
        self.callbacks.pending()
    }

    /// Submit a request. Omitted payloads go out as `null`.
    ///
    /// Before the session is `Connected` the request is queued and gets its
    /// correlation id only when flushed. A request without a callback never
    /// gets an id.
    pub fn send(
        &mut self,
        action: impl Into<String>,
        message: Option<Value>,
        callback: Option<Callback>,
    ) {
        let action = action.into();
        let message = message.unwrap_or(Value::Null);
        match (self.state, &self.wire) {
            (ConnectionState::Connected, Some(wire)) => {
                wire.transmit(&mut self.callbacks, action, message, callback.map(Awaiting::Reply));
            }
            _ => {
                trace!(action = %action, state = %self.state, "queueing request");
                self.queue.enqueue(PendingRequest { action, message, callback });
            }
        }
    }

    /// `Disconnected → Connecting`. Returns false if a connect is already
    /// under way or done.
    pub fn begin_connect(&mut self) -> bool {
        if self.state != ConnectionState::Disconnected {
            warn!(state = %self.state, "connect requested while not disconnected");
            return false;
        }
        self.state = ConnectionState::Connecting;
        true
    }

    /// The socket opened: attach the wire and send the init request.
    pub fn on_open(&mut self, tx: mpsc::UnboundedSender<String>) {
        if self.state != ConnectionState::Connecting {
            warn!(state = %self.state, "socket opened outside of connecting state");
        }
        self.state = ConnectionState::Handshaking;
        let wire = Wire { tx, credentials: Arc::clone(&self.credentials) };
        wire.transmit(
            &mut self.callbacks,
            INIT_ACTION.to_owned(),
            Value::Null,
            Some(Awaiting::Handshake),
        );
        self.wire = Some(wire);
    }

    /// Handle one inbound text frame.
    pub fn on_message(&mut self, text: &str) {
        let Some(frame) = InboundFrame::parse(text) else {
            trace!("ignoring frame without action");
            return;
        };
        debug!(action = %frame.action, callback_id = ?frame.callback_id, "recv");

        if let Some(id) = frame.callback_id {
            self.resolve(id, &frame.action, frame.message.clone());
        }

        self.listeners.broadcast(&frame.action, &frame.message);

        if frame.action == SERVER_DISCONNECT_ACTION {
            let name = frame.message.get("servername").and_then(Value::as_str);
            self.host.notify(Notice::server_disconnect(name));
        }
    }

    /// Transport error. Logged only; the close signal that follows drives
    /// the state change.
    pub fn on_error(&mut self, err: &dyn fmt::Display) {
        error!(kind = %FailureKind::Transport, state = %self.state, err = %err, "websocket error");
    }

    /// The socket closed. In-flight callbacks and queued requests are
    /// abandoned without being invoked. Returns false if the session was
    /// already disconnected.
    pub fn on_close(&mut self) -> bool {
        if self.state == ConnectionState::Disconnected {
            return false;
        }
        let was = self.state;
        self.state = ConnectionState::Disconnected;
        self.wire = None;
        let abandoned = self.callbacks.clear_all();
        let dropped = self.queue.discard();
        warn!(
            kind = %FailureKind::Transport,
            was = %was,
            abandoned,
            dropped,
            "websocket closed"
        );
        self.host.notify(Notice::socket_disconnect());
        true
    }

    fn resolve(&mut self, id: u64, action: &str, message: Value) {
        let awaiting = match self.callbacks.take(id) {
            Taken::Pending(a) => a,
            Taken::Cleared | Taken::Unknown => {
                warn!(
                    kind = %FailureKind::ProtocolAnomaly,
                    callback_id = id,
                    action,
                    "no pending callback for id, duplicate response from backend?"
                );
                return;
            }
        };

        if let Some(err) = ServerError::from_payload(&message) {
            let discarded = self.callbacks.clear_all();
            warn!(
                kind = %FailureKind::ServerError,
                callback_id = id,
                action,
                discarded,
                err = %err,
                "server error, discarding pending callbacks"
            );
            self.host.render_server_error(&err);
            if matches!(awaiting, Awaiting::Handshake) {
                error!(state = %self.state, "init rejected by server, queued requests stay queued");
            }
            return;
        }

        match awaiting {
            Awaiting::Handshake => self.complete_handshake(message),
            Awaiting::Reply(callback) => callback(message),
        }
    }

    fn complete_handshake(&mut self, message: Value) {
        let init = InitInfo::from_payload(&message);
        if init.user.is_some() {
            self.user = init.user.clone();
        }
        self.host.on_init(&init);
        if init.update_available() {
            if let Some(ref latest) = init.latest_version {
                self.host.notify(Notice::update_available(latest));
            }
        }
        self.state = ConnectionState::Connected;

        let Some(ref wire) = self.wire else {
            return;
        };
        let callbacks = &mut self.callbacks;
        let flushed = self.queue.flush_into(|req| {
            wire.transmit(callbacks, req.action, req.message, req.callback.map(Awaiting::Reply));
        });
        info!(version = ?init.version, flushed, "session ready");
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
