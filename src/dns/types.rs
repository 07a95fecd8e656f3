// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! Wire-level record and change types shared by the batcher and backends.

use crate::constants::RECORD_TTL_SECS;
use std::collections::HashSet;
use std::fmt;

/// The record types the controller manages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// Forward IPv4 address record
    A,
    /// Reverse pointer record
    Ptr,
    /// Service locator record
    Srv,
}

impl RecordType {
    /// Wire name of the record type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Ptr => "PTR",
            Self::Srv => "SRV",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-specified resource record set as it exists (or should exist) in a
/// zone. The `name` is always dot-terminated at this level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordSet {
    /// Dot-terminated owner name (e.g. `db-0.db.example.com.`)
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Time to live in seconds
    pub ttl: i64,
    /// Record data, ordered as submitted
    pub rrdatas: Vec<String>,
}

impl RecordSet {
    /// Build a forward A record for a single address.
    #[must_use]
    pub fn a(domain: &str, address: &str) -> Self {
        Self {
            name: format!("{domain}."),
            record_type: RecordType::A,
            ttl: RECORD_TTL_SECS,
            rrdatas: vec![address.to_string()],
        }
    }

    /// Build a PTR record pointing an address back at a domain.
    ///
    /// The owner name keeps the address spelled forward
    /// (`<address>.in-addr.arpa.`), matching the layout of the reverse zones
    /// this controller writes to.
    #[must_use]
    pub fn ptr(address: &str, domain: &str) -> Self {
        Self {
            name: format!("{address}.in-addr.arpa."),
            record_type: RecordType::Ptr,
            ttl: RECORD_TTL_SECS,
            rrdatas: vec![domain.to_string()],
        }
    }

    /// Build an SRV record for a service-locator name.
    ///
    /// The payload is the bare target hostname rather than the RFC 2782
    /// `priority weight port target` quadruple; consumers of these zones
    /// depend on that shape.
    #[must_use]
    pub fn srv(srv_name: &str, target: &str) -> Self {
        Self {
            name: format!("{srv_name}."),
            record_type: RecordType::Srv,
            ttl: RECORD_TTL_SECS,
            rrdatas: vec![target.to_string()],
        }
    }

    /// True if the record data contains `datum`.
    #[must_use]
    pub fn contains(&self, datum: &str) -> bool {
        self.rrdatas.iter().any(|d| d == datum)
    }

    /// Compare record data as sets, ignoring order and duplicates.
    ///
    /// Zones may return multi-value record sets in any order, so positional
    /// comparison is not meaningful.
    #[must_use]
    pub fn same_data(&self, other: &Self) -> bool {
        let mine: HashSet<&str> = self.rrdatas.iter().map(String::as_str).collect();
        let theirs: HashSet<&str> = other.rrdatas.iter().map(String::as_str).collect();
        mine == theirs
    }

    /// A copy of this record set with every occurrence of `datum` removed.
    #[must_use]
    pub fn without(&self, datum: &str) -> Self {
        Self {
            name: self.name.clone(),
            record_type: self.record_type,
            ttl: self.ttl,
            rrdatas: self
                .rrdatas
                .iter()
                .filter(|d| d.as_str() != datum)
                .cloned()
                .collect(),
        }
    }

    /// A copy of this record set with `datum` prepended to the data.
    #[must_use]
    pub fn with_prepended(&self, datum: &str) -> Self {
        let mut rrdatas = Vec::with_capacity(self.rrdatas.len() + 1);
        rrdatas.push(datum.to_string());
        rrdatas.extend(self.rrdatas.iter().cloned());
        Self {
            name: self.name.clone(),
            record_type: self.record_type,
            ttl: self.ttl,
            rrdatas,
        }
    }
}

/// Staged additions and deletions for one zone, submitted in a single
/// provider round-trip.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    /// Record sets to create
    pub additions: Vec<RecordSet>,
    /// Record sets to delete (must match the zone's current contents)
    pub deletions: Vec<RecordSet>,
}

impl ChangeSet {
    /// True if the change stages no additions and no deletions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }

    /// Stage a record set for creation.
    pub fn add(&mut self, record: RecordSet) {
        self.additions.push(record);
    }

    /// Stage a record set for deletion.
    pub fn delete(&mut self, record: RecordSet) {
        self.deletions.push(record);
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
