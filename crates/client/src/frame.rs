// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire frames exchanged with the backend.
//!
//! Every frame is a JSON object in a single text message. Requests carry the
//! action, an optional correlation id, the payload, and the login pair read
//! from the credential store at send time. Responses and server pushes carry
//! the action, an optional correlation id, and the payload.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::FailureKind;

/// Handshake action sent right after the socket opens.
pub const INIT_ACTION: &str = "init";

/// Server-initiated notice that the backend is going away.
pub const SERVER_DISCONNECT_ACTION: &str = "serverDisconnect";

/// Outbound request frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundFrame {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<u64>,
    pub message: Value,
    pub login_name: Option<String>,
    pub login_hash: Option<String>,
}

impl OutboundFrame {
    pub fn to_text(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Inbound frame: a response to a correlated request or a server push.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    pub action: String,
    pub callback_id: Option<u64>,
    pub message: Value,
}

impl InboundFrame {
    /// Parse a text frame. Returns `None` for anything without a usable
    /// `action`, which callers drop silently.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        let Value::Object(mut map) = value else {
            return None;
        };
        let action = match map.remove("action") {
            Some(Value::String(a)) if !a.is_empty() => a,
            _ => return None,
        };
        let callback_id = match map.remove("callbackId") {
            None | Some(Value::Null) => None,
            Some(raw) => match raw.as_u64() {
                Some(id) => Some(id),
                None => {
                    warn!(
                        kind = %FailureKind::ProtocolAnomaly,
                        action = %action,
                        callback_id = %raw,
                        "ignoring malformed callback id"
                    );
                    None
                }
            },
        };
        let message = map.remove("message").unwrap_or(Value::Null);
        Some(Self { action, callback_id, message })
    }
}

/// Who the backend says is logged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Anonymous,
    User,
    Admin,
}

/// Payload of the `init` response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InitInfo {
    pub user: Option<Value>,
    pub version: Option<String>,
    pub latest_version: Option<String>,
}

impl InitInfo {
    pub fn from_payload(payload: &Value) -> Self {
        let user = payload.get("userData").filter(|u| is_truthy(u)).cloned();
        let version = payload
            .get("package")
            .and_then(|p| p.get("version"))
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);
        let latest_version = payload
            .get("latestVersion")
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);
        Self { user, version, latest_version }
    }

    pub fn login_state(&self) -> LoginState {
        match self.user {
            None => LoginState::Anonymous,
            Some(ref user) => {
                if user.get("admin").is_some_and(is_truthy) {
                    LoginState::Admin
                } else {
                    LoginState::User
                }
            }
        }
    }

    /// True when both versions are known and differ.
    pub fn update_available(&self) -> bool {
        match (&self.version, &self.latest_version) {
            (Some(own), Some(latest)) => own != latest,
            _ => false,
        }
    }
}

/// Loose truthiness: `null`, `false`, zero and `""` are false.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Build the WebSocket URL from the server's base URL and the discovered port.
///
/// Only the host is kept; the path of the base URL is irrelevant to the socket.
pub fn build_ws_url(server: &reqwest::Url, port: u16) -> anyhow::Result<String> {
    let scheme = match server.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => anyhow::bail!("unsupported server scheme: {other}"),
    };
    let host = server
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("server URL has no host: {server}"))?;
    Ok(format!("{scheme}://{host}:{port}"))
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
