// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Correlation id allocation and pending-callback storage.

use std::collections::BTreeMap;

/// Result of taking a slot.
#[derive(Debug, PartialEq, Eq)]
pub enum Taken<T> {
    /// The callback registered under the id; the slot is now cleared.
    Pending(T),
    /// The id was issued but its callback is gone (already resolved or
    /// discarded by [`CallbackRegistry::clear_all`]).
    Cleared,
    /// The id was never issued by this registry.
    Unknown,
}

/// Pending callbacks keyed by correlation id.
///
/// Ids start at 0 and grow by one per registration. They are never reissued
/// for the lifetime of the registry, including after [`clear_all`]. Only
/// pending ids are stored; an issued id with no entry has been cleared.
///
/// [`clear_all`]: CallbackRegistry::clear_all
pub struct CallbackRegistry<T> {
    slots: BTreeMap<u64, T>,
    next_id: u64,
}

impl<T> Default for CallbackRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CallbackRegistry<T> {
    pub fn new() -> Self {
        Self { slots: BTreeMap::new(), next_id: 0 }
    }

    /// Store a callback and return its correlation id.
    pub fn register(&mut self, callback: T) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.slots.insert(id, callback);
        id
    }

    /// Remove the callback for `id`. The id stays reserved.
    pub fn take(&mut self, id: u64) -> Taken<T> {
        if id >= self.next_id {
            return Taken::Unknown;
        }
        match self.slots.remove(&id) {
            Some(callback) => Taken::Pending(callback),
            None => Taken::Cleared,
        }
    }

    /// Drop every pending callback. Returns how many were discarded.
    pub fn clear_all(&mut self) -> usize {
        let discarded = self.slots.len();
        self.slots.clear();
        discarded
    }

    /// Number of callbacks still waiting for a response.
    pub fn pending(&self) -> usize {
        self.slots.len()
    }

    /// Id the next registration will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
