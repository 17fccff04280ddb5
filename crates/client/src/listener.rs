// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named listeners that see every inbound frame.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;

/// Listener invoked with `(action, message)` for every inbound frame.
pub type Listener = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Shared, ordered listener map.
///
/// Cloning yields another handle to the same map, so a listener can hold a
/// handle and unregister itself (or others) while a broadcast is running.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<IndexMap<String, Listener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` under `id`, replacing any previous one. A
    /// replaced listener keeps its original position.
    pub fn on(
        &self,
        id: impl Into<String>,
        listener: impl Fn(&str, &Value) + Send + Sync + 'static,
    ) {
        self.inner.lock().insert(id.into(), Arc::new(listener));
    }

    /// Remove the listener under `id`. Returns whether one was registered.
    pub fn off(&self, id: &str) -> bool {
        self.inner.lock().shift_remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Invoke every listener in registration order.
    ///
    /// Iterates over a snapshot of the ids. Each listener is looked up again
    /// right before it runs, so one removed mid-broadcast is skipped and one
    /// added mid-broadcast waits for the next frame. The lock is never held
    /// while a listener runs.
    pub fn broadcast(&self, action: &str, message: &Value) -> usize {
        let ids: Vec<String> = self.inner.lock().keys().cloned().collect();
        let mut invoked = 0;
        for id in ids {
            let listener = self.inner.lock().get(&id).map(Arc::clone);
            if let Some(listener) = listener {
                listener(action, message);
                invoked += 1;
            }
        }
        invoked
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
