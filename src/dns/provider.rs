// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! The DNS provider handle the record managers depend on.
//!
//! [`ZoneApi`] is the transport seam: a backend that can look up a single
//! record set by name and type, and apply a batch of additions and deletions,
//! blocking until the zone acknowledges the change. The production backend is
//! [`crate::dns::clouddns::CloudDns`]; tests substitute an in-memory zone.
//!
//! [`DnsProvider`] binds a backend to a forward zone and an optional reverse
//! zone and hands out [`ChangeRequest`]s, the unit of one coalesced
//! read-modify-write against the zones.

use crate::dns::error::DnsError;
use crate::dns::request::ChangeRequest;
use crate::dns::types::{ChangeSet, RecordSet, RecordType};
use async_trait::async_trait;
use std::sync::Arc;

/// Zone transport: single-record lookup plus blocking change application.
#[async_trait]
pub trait ZoneApi: Send + Sync {
    /// Look up the record set with the given dot-terminated `name` and
    /// `record_type` in `zone`. Returns `None` if no such record exists.
    async fn lookup(
        &self,
        zone: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<RecordSet>, DnsError>;

    /// Apply a change to `zone` and block until the zone reports it as
    /// terminal.
    async fn apply(&self, zone: &str, change: &ChangeSet) -> Result<(), DnsError>;
}

/// Provider handle for one forward zone and an optional reverse zone.
#[derive(Clone)]
pub struct DnsProvider {
    api: Arc<dyn ZoneApi>,
    zone: String,
    reverse_zone: Option<String>,
}

impl DnsProvider {
    /// Create a provider over `api` writing to `zone`, and to `reverse_zone`
    /// for PTR records when one is given.
    #[must_use]
    pub fn new(api: Arc<dyn ZoneApi>, zone: String, reverse_zone: Option<String>) -> Self {
        Self {
            api,
            zone,
            reverse_zone,
        }
    }

    /// Open a new change request. Staged mutations are only submitted when
    /// [`ChangeRequest::submit`] is called.
    #[must_use]
    pub fn new_request(&self) -> ChangeRequest<'_> {
        ChangeRequest::new(self)
    }

    /// True if a reverse zone is configured and PTR records are managed.
    #[must_use]
    pub fn has_reverse_zone(&self) -> bool {
        self.reverse_zone.is_some()
    }

    pub(crate) fn api(&self) -> &dyn ZoneApi {
        self.api.as_ref()
    }

    pub(crate) fn zone(&self) -> &str {
        &self.zone
    }

    pub(crate) fn reverse_zone(&self) -> Option<&str> {
        self.reverse_zone.as_deref()
    }
}
