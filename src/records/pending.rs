// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! Side-table for pods still waiting for an address.
//!
//! A pod lands here when its add event arrived without an address and
//! polling timed out. The update handler resolves the entry once the pod
//! reports an address; deletion events drop it.

use std::collections::HashMap;
use std::time::Instant;

/// Map from `namespace/name` to the moment the pod was first seen without an
/// address.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<String, Instant>,
}

impl PendingTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as pending, stamped now. Re-inserting an existing key
    /// refreshes the stamp.
    pub fn insert(&mut self, key: &str) {
        self.entries.insert(key.to_string(), Instant::now());
    }

    /// True if `key` is waiting for an address.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove `key`; returns the first-seen stamp if it was present.
    pub fn remove(&mut self, key: &str) -> Option<Instant> {
        self.entries.remove(key)
    }

    /// Number of pending pods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no pod is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod pending_tests;
