// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use serde_json::Value;

use crate::frame::is_truthy;

/// Failure categories surfaced by the client, attached to log lines as the
/// `kind` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Socket error or close.
    Transport,
    /// A response named a correlation id with no pending callback.
    ProtocolAnomaly,
    /// The backend answered with an error descriptor.
    ServerError,
    /// The `/wsport` lookup failed.
    PortResolution,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "TRANSPORT",
            Self::ProtocolAnomaly => "PROTOCOL_ANOMALY",
            Self::ServerError => "SERVER_ERROR",
            Self::PortResolution => "PORT_RESOLUTION",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error descriptor carried by a response payload: `{"error": {"message", "stack"?}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    pub message: String,
    pub stack: Option<String>,
}

impl ServerError {
    /// Extract the error descriptor from a response payload, if it carries one.
    ///
    /// Any truthy `error` value counts, so `null`, `false`, `0` and `""` do
    /// not. A bare string is taken as the message; other non-object values
    /// yield an empty message.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let error = payload.get("error").filter(|e| is_truthy(e))?;
        match error {
            Value::String(s) => Some(Self { message: s.clone(), stack: None }),
            Value::Object(map) => {
                let message = match map.get("message") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                let stack = map
                    .get("stack")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned);
                Some(Self { message, stack })
            }
            _ => Some(Self { message: String::new(), stack: None }),
        }
    }

    /// Text for the error surface. The stack, when present, replaces the message.
    pub fn render(&self) -> String {
        match self.stack {
            Some(ref stack) => format!("Server Error\n{stack}"),
            None => format!("Server Error: {}", self.message),
        }
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
