// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests submitted before the session is ready to transmit.

use std::collections::VecDeque;
use std::fmt;

use serde_json::Value;

/// Response callback supplied by a caller.
pub type Callback = Box<dyn FnOnce(Value) + Send>;

/// A request waiting for the connection. No correlation id is assigned
/// until it is actually transmitted.
pub struct PendingRequest {
    pub action: String,
    pub message: Value,
    pub callback: Option<Callback>,
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("action", &self.action)
            .field("message", &self.message)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// FIFO of [`PendingRequest`]s.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    items: VecDeque<PendingRequest>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, request: PendingRequest) {
        self.items.push_back(request);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Hand every queued request to `sink` in submission order.
    ///
    /// Requests are popped one at a time, so anything appended while the
    /// flush is running is sent after the requests already queued.
    /// Returns the number of requests flushed.
    pub fn flush_into(&mut self, mut sink: impl FnMut(PendingRequest)) -> usize {
        let mut flushed = 0;
        while let Some(request) = self.items.pop_front() {
            sink(request);
            flushed += 1;
        }
        flushed
    }

    /// Drop everything still queued. Returns how many requests were dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
