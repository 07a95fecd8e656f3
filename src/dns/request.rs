// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! The change batcher: one read-modify-write round against the zones.
//!
//! A [`ChangeRequest`] stages additions and deletions for the forward zone
//! and, when configured, the reverse zone. Every `add_*`/`remove_*` call
//! looks up the live record set first and stages only the mutations needed
//! to reach the desired state, so replaying the same pod event produces no
//! writes. [`ChangeRequest::submit`] is the commit point: at most one
//! provider call per non-empty change set.
//!
//! Lookup failures are treated optimistically as "no existing record"; the
//! subsequent change either succeeds or the zone rejects the conflict, which
//! is surfaced from `submit`.

use crate::dns::error::DnsError;
use crate::dns::provider::DnsProvider;
use crate::dns::types::{ChangeSet, RecordSet, RecordType};
use crate::metrics;
use tracing::{debug, warn};

/// Staged record mutations for one logical operation.
///
/// Obtained from [`DnsProvider::new_request`]; disposed after
/// [`ChangeRequest::submit`].
pub struct ChangeRequest<'a> {
    provider: &'a DnsProvider,
    forward: ChangeSet,
    reverse: ChangeSet,
}

impl<'a> ChangeRequest<'a> {
    pub(crate) fn new(provider: &'a DnsProvider) -> Self {
        Self {
            provider,
            forward: ChangeSet::default(),
            reverse: ChangeSet::default(),
        }
    }

    /// Stage creation of the single-owner forward A record
    /// `<domain>. -> [address]`.
    ///
    /// If the zone already holds this exact record the call is a no-op. If it
    /// holds a record with different data, the candidate is additionally
    /// staged as a deletion to evict the stale entry. Also stages the
    /// matching PTR record when a reverse zone is configured.
    pub async fn add_record(&mut self, domain: &str, address: &str) {
        let candidate = RecordSet::a(domain, address);

        match self.lookup(self.provider.zone(), &candidate).await {
            Some(existing) if existing.same_data(&candidate) => {
                debug!(name = %candidate.name, address, "A record already exists");
                return;
            }
            Some(existing) => {
                debug!(name = %existing.name, data = ?existing.rrdatas, "Evicting stale A record");
                self.forward.delete(candidate.clone());
                self.forward.add(candidate);
            }
            None => {
                self.forward.add(candidate);
            }
        }

        if self.provider.has_reverse_zone() {
            self.add_reverse_record(domain, address).await;
        }
    }

    /// Stage deletion of the forward A record for `domain`.
    ///
    /// The deletion names the address this controller believes the record
    /// holds; if the zone has drifted and the record no longer contains that
    /// address, nothing is deleted. Also stages the PTR removal when a
    /// reverse zone is configured.
    pub async fn remove_record(&mut self, domain: &str, address: &str) {
        let candidate = RecordSet::a(domain, address);

        match self.lookup(self.provider.zone(), &candidate).await {
            None => {
                debug!(name = %candidate.name, address, "No A record to delete");
                return;
            }
            Some(existing) if !existing.contains(address) => {
                debug!(
                    name = %existing.name,
                    address,
                    data = ?existing.rrdatas,
                    "A record does not match the deleted pod's address, leaving it alone"
                );
                return;
            }
            Some(existing) => self.forward.delete(existing),
        }

        if self.provider.has_reverse_zone() {
            self.remove_reverse_record(domain, address).await;
        }
    }

    /// Stage `address` into the shared-service A record for `domain`,
    /// creating the record if it does not exist yet.
    pub async fn add_to_service(&mut self, domain: &str, address: &str) {
        let candidate = RecordSet::a(domain, address);

        match self.lookup(self.provider.zone(), &candidate).await {
            Some(existing) if existing.contains(address) => {
                debug!(name = %existing.name, address, "Service record already contains address");
            }
            Some(existing) => {
                let grown = existing.with_prepended(address);
                self.forward.delete(existing);
                self.forward.add(grown);
            }
            None => self.forward.add(candidate),
        }
    }

    /// Stage removal of `address` from the shared-service A record for
    /// `domain`. The record is rewritten without the address, or deleted
    /// outright when the address was its last datum. A record that does not
    /// contain the address is left untouched.
    pub async fn remove_from_service(&mut self, domain: &str, address: &str) {
        let candidate = RecordSet::a(domain, address);

        let Some(existing) = self.lookup(self.provider.zone(), &candidate).await else {
            debug!(name = %candidate.name, "No service record exists");
            return;
        };

        if !existing.contains(address) {
            debug!(name = %existing.name, address, "Service record does not contain address");
            return;
        }

        let remaining = existing.without(address);
        self.forward.delete(existing);
        if !remaining.rrdatas.is_empty() {
            self.forward.add(remaining);
        }
    }

    /// Stage `target` (a shared-service name) into the SRV record at
    /// `srv_name`. The recorded payload is the bare target hostname with the
    /// controller's fixed priority.
    pub async fn add_to_srv(&mut self, srv_name: &str, target: &str) {
        let candidate = RecordSet::srv(srv_name, target);

        match self.lookup(self.provider.zone(), &candidate).await {
            Some(existing) if existing.contains(target) => {
                debug!(name = %existing.name, target, "SRV record already contains target");
            }
            Some(existing) => {
                let grown = existing.with_prepended(target);
                self.forward.delete(existing);
                self.forward.add(grown);
            }
            None => self.forward.add(candidate),
        }
    }

    /// Stage removal of `target` from the SRV record at `srv_name`, with the
    /// same rewrite-or-delete semantics as [`Self::remove_from_service`].
    pub async fn remove_from_srv(&mut self, srv_name: &str, target: &str) {
        let candidate = RecordSet::srv(srv_name, target);

        let Some(existing) = self.lookup(self.provider.zone(), &candidate).await else {
            debug!(name = %candidate.name, "No SRV record exists");
            return;
        };

        if !existing.contains(target) {
            debug!(name = %existing.name, target, "SRV record does not contain target");
            return;
        }

        let remaining = existing.without(target);
        self.forward.delete(existing);
        if !remaining.rrdatas.is_empty() {
            self.forward.add(remaining);
        }
    }

    /// Stage creation of the PTR record `<address>.in-addr.arpa. -> domain`
    /// in the reverse zone. No-op when no reverse zone is configured.
    pub async fn add_reverse_record(&mut self, domain: &str, address: &str) {
        let Some(reverse_zone) = self.provider.reverse_zone() else {
            return;
        };
        let candidate = RecordSet::ptr(address, domain);

        match self.lookup(reverse_zone, &candidate).await {
            Some(existing) if existing.same_data(&candidate) => {
                debug!(name = %candidate.name, "PTR record already exists");
            }
            Some(existing) => {
                debug!(name = %existing.name, data = ?existing.rrdatas, "Evicting stale PTR record");
                self.reverse.delete(candidate.clone());
                self.reverse.add(candidate);
            }
            None => self.reverse.add(candidate),
        }
    }

    /// Stage deletion of the PTR record for `address` in the reverse zone,
    /// guarded against drift the same way as [`Self::remove_record`].
    pub async fn remove_reverse_record(&mut self, domain: &str, address: &str) {
        let Some(reverse_zone) = self.provider.reverse_zone() else {
            return;
        };
        let candidate = RecordSet::ptr(address, domain);

        match self.lookup(reverse_zone, &candidate).await {
            None => {
                debug!(name = %candidate.name, "No PTR record to delete");
            }
            Some(existing) if !existing.contains(domain) => {
                debug!(
                    name = %existing.name,
                    domain,
                    data = ?existing.rrdatas,
                    "PTR record does not match the deleted pod's name, leaving it alone"
                );
            }
            Some(existing) => self.reverse.delete(existing),
        }
    }

    /// Submit the staged changes. Each non-empty change set results in
    /// exactly one provider call; an empty request performs no I/O.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. Both zones are attempted even if
    /// the first submission fails.
    pub async fn submit(self) -> Result<(), DnsError> {
        let mut first_error = None;

        if !self.forward.is_empty() {
            let result = self.provider.api().apply(self.provider.zone(), &self.forward).await;
            metrics::record_change_submitted(self.provider.zone(), result.is_ok());
            if let Err(err) = result {
                warn!(zone = %self.provider.zone(), error = %err, "Forward zone change failed");
                first_error = Some(err);
            }
        }

        if let Some(reverse_zone) = self.provider.reverse_zone() {
            if !self.reverse.is_empty() {
                let result = self.provider.api().apply(reverse_zone, &self.reverse).await;
                metrics::record_change_submitted(reverse_zone, result.is_ok());
                if let Err(err) = result {
                    warn!(zone = %reverse_zone, error = %err, "Reverse zone change failed");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The staged forward-zone change.
    #[must_use]
    pub fn forward_change(&self) -> &ChangeSet {
        &self.forward
    }

    /// The staged reverse-zone change.
    #[must_use]
    pub fn reverse_change(&self) -> &ChangeSet {
        &self.reverse
    }

    async fn lookup(&self, zone: &str, candidate: &RecordSet) -> Option<RecordSet> {
        lookup_or_none(self.provider.api(), zone, &candidate.name, candidate.record_type).await
    }
}

/// Look up a record set, treating transport failures as "no record".
async fn lookup_or_none(
    api: &dyn crate::dns::provider::ZoneApi,
    zone: &str,
    name: &str,
    record_type: RecordType,
) -> Option<RecordSet> {
    match api.lookup(zone, name, record_type).await {
        Ok(found) => found,
        Err(err) => {
            warn!(zone, name, %record_type, error = %err, "Record lookup failed, assuming no record");
            None
        }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod request_tests;
