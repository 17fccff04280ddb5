// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hooks into the environment embedding the client.
//!
//! The session reports the handshake result, user-facing notices, server
//! errors, and the loss of its connection through [`SessionHost`]. What the
//! host does with them (update a UI, print, restart) is its own business.

use tracing::{error, info, warn};

use crate::error::ServerError;
use crate::frame::{InitInfo, LoginState};

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Danger,
}

/// A user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Message key, e.g. `server.disconnect`.
    pub key: String,
    pub detail: Option<String>,
    pub level: NoticeLevel,
}

impl Notice {
    /// The backend announced it is going away.
    pub fn server_disconnect(server_name: Option<&str>) -> Self {
        Self {
            key: "server.disconnect".to_owned(),
            detail: server_name.map(str::to_owned),
            level: NoticeLevel::Danger,
        }
    }

    /// The socket closed underneath the client.
    pub fn socket_disconnect() -> Self {
        Self { key: "socket.disconnect".to_owned(), detail: None, level: NoticeLevel::Danger }
    }

    /// The backend reports a newer version than the one it runs.
    pub fn update_available(latest: &str) -> Self {
        Self {
            key: "update.available".to_owned(),
            detail: Some(latest.to_owned()),
            level: NoticeLevel::Info,
        }
    }

    /// `key: detail`, or just the key.
    pub fn text(&self) -> String {
        match self.detail {
            Some(ref detail) => format!("{}: {detail}", self.key),
            None => self.key.clone(),
        }
    }
}

/// Environment callbacks. All methods run on the session's task and must not block.
pub trait SessionHost: Send + Sync {
    /// The init handshake completed. Runs before queued requests are sent.
    fn on_init(&self, _init: &InitInfo) {}

    fn notify(&self, notice: Notice);

    /// A response carried an error descriptor.
    fn render_server_error(&self, error: &ServerError);

    /// The connection is gone and the reload delay has elapsed. Called once
    /// per lost connection.
    fn on_unrecoverable_disconnect(&self);
}

/// Host for the command-line binary: logs everything, prints errors to stderr.
#[derive(Debug, Default)]
pub struct ConsoleHost;

impl SessionHost for ConsoleHost {
    fn on_init(&self, init: &InitInfo) {
        let login = match init.login_state() {
            LoginState::Anonymous => "anonymous",
            LoginState::User => "user",
            LoginState::Admin => "admin",
        };
        info!(version = ?init.version, login, "session initialised");
    }

    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!(key = %notice.key, "{}", notice.text()),
            NoticeLevel::Danger => {
                warn!(key = %notice.key, "{}", notice.text());
                eprintln!("{}", notice.text());
            }
        }
    }

    fn render_server_error(&self, error: &ServerError) {
        error!(err = %error, "server reported an error");
        eprintln!("{}", error.render());
    }

    fn on_unrecoverable_disconnect(&self) {
        info!("connection lost, restarting session");
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
