// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Login credential sources consulted on every outbound request.

use std::path::PathBuf;

use serde_json::Value;
use tracing::warn;

/// Key for the login name.
pub const LOGIN_NAME: &str = "loginName";
/// Key for the login hash.
pub const LOGIN_HASH: &str = "loginHash";

/// Read-only key/value lookup for credentials.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Credentials fixed at startup (flags or env).
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    pub login_name: Option<String>,
    pub login_hash: Option<String>,
}

impl CredentialStore for StaticCredentials {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            LOGIN_NAME => self.login_name.clone(),
            LOGIN_HASH => self.login_hash.clone(),
            _ => None,
        }
    }
}

/// JSON object file, re-read on every lookup so external updates (login,
/// logout) take effect on the next request.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Option<serde_json::Map<String, Value>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), err = %e, "failed to read credential file");
                return None;
            }
        };
        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) => {
                warn!(path = %self.path.display(), "credential file is not a JSON object");
                None
            }
            Err(e) => {
                warn!(path = %self.path.display(), err = %e, "malformed credential file");
                None
            }
        }
    }
}

impl CredentialStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.load()?.remove(key)? {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
