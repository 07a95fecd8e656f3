// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! Error types for DNS zone operations.
//!
//! These errors cover the provider boundary: record lookups, change
//! submission, change-status polling and credential acquisition. They carry
//! enough structure for callers to distinguish transient failures (worth
//! retrying on the next pod event) from misconfiguration.

use thiserror::Error;

/// Errors that can occur while reading from or writing to a DNS zone.
#[derive(Error, Debug)]
pub enum DnsError {
    /// A single-record lookup against the zone failed.
    ///
    /// Lookups are advisory: callers treat a failed lookup as "no existing
    /// record" and let the subsequent change either succeed or surface the
    /// conflict.
    #[error("lookup of '{name}' ({record_type}) in zone '{zone}' failed: {reason}")]
    LookupFailed {
        /// The zone that was queried
        zone: String,
        /// The record name that was looked up
        name: String,
        /// The record type (A, PTR, SRV)
        record_type: String,
        /// Underlying failure
        reason: String,
    },

    /// Submitting a change (additions + deletions) to the zone failed.
    #[error("change submission to zone '{zone}' failed: {reason}")]
    ChangeFailed {
        /// The zone the change was submitted to
        zone: String,
        /// Underlying failure
        reason: String,
    },

    /// A submitted change was accepted but its status could not be polled to
    /// a terminal state.
    #[error("status poll for change '{change_id}' in zone '{zone}' failed: {reason}")]
    ChangePollFailed {
        /// The zone the change was submitted to
        zone: String,
        /// Provider-assigned change identifier
        change_id: String,
        /// Underlying failure
        reason: String,
    },

    /// An access token for the provider API could not be obtained.
    #[error("failed to obtain provider credentials: {0}")]
    Credentials(String),
}

impl DnsError {
    /// Returns true if this error is transient and the operation may succeed
    /// when re-driven by a later pod event.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::LookupFailed { .. } | Self::ChangeFailed { .. } | Self::ChangePollFailed { .. } => {
                true
            }
            Self::Credentials(_) => false,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
