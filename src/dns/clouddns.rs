// Copyright (c) 2025 the privatedns authors
// SPDX-License-Identifier: MIT

//! Google Cloud DNS backend for the [`ZoneApi`] transport seam.
//!
//! Talks to the Cloud DNS v1 REST API: single-record lookups via the rrsets
//! listing endpoint (filtered by name and type, `maxResults=1`), and change
//! application via the changes endpoint. A submitted change reports status
//! `pending` until the authoritative servers acknowledge it; `apply` polls
//! the change status once per second until it is terminal.
//!
//! Credentials come from a [`TokenSource`], normally the GCE metadata
//! service ([`crate::gcp::GceMetadata`]).

use crate::constants::CHANGE_POLL_INTERVAL_SECS;
use crate::dns::error::DnsError;
use crate::dns::provider::ZoneApi;
use crate::dns::types::{ChangeSet, RecordSet, RecordType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const CLOUD_DNS_BASE_URL: &str = "https://dns.googleapis.com/dns/v1/projects";

/// Source of OAuth2 bearer tokens for the Cloud DNS API.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A currently valid access token.
    async fn access_token(&self) -> Result<String, DnsError>;
}

/// Cloud DNS client scoped to one project.
#[derive(Clone)]
pub struct CloudDns {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    base_url: String,
}

impl CloudDns {
    /// Create a client for `project` using `tokens` for authentication.
    #[must_use]
    pub fn new(project: &str, tokens: Arc<dyn TokenSource>) -> Self {
        Self::with_base_url(format!("{CLOUD_DNS_BASE_URL}/{project}"), tokens)
    }

    /// Create a client against a custom API endpoint (emulators, tests).
    #[must_use]
    pub fn with_base_url(base_url: String, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http: reqwest::Client::new(),
            tokens,
            base_url,
        }
    }

    fn rrsets_url(&self, zone: &str) -> String {
        format!("{}/managedZones/{zone}/rrsets", self.base_url)
    }

    fn changes_url(&self, zone: &str) -> String {
        format!("{}/managedZones/{zone}/changes", self.base_url)
    }

    async fn poll_change(&self, zone: &str, change: WireChange) -> Result<(), DnsError> {
        let change_id = change.id.clone().unwrap_or_default();
        let mut status = change.status;

        while status.as_deref() == Some("pending") {
            tokio::time::sleep(Duration::from_secs(CHANGE_POLL_INTERVAL_SECS)).await;

            let token = self.tokens.access_token().await?;
            let url = format!("{}/{change_id}", self.changes_url(zone));
            let response = self
                .http
                .get(&url)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| DnsError::ChangePollFailed {
                    zone: zone.to_string(),
                    change_id: change_id.clone(),
                    reason: e.to_string(),
                })?;

            if !response.status().is_success() {
                return Err(DnsError::ChangePollFailed {
                    zone: zone.to_string(),
                    change_id,
                    reason: format!("HTTP {}", response.status()),
                });
            }

            let polled: WireChange =
                response
                    .json()
                    .await
                    .map_err(|e| DnsError::ChangePollFailed {
                        zone: zone.to_string(),
                        change_id: change_id.clone(),
                        reason: e.to_string(),
                    })?;
            status = polled.status;
        }

        debug!(zone, change_id, status = ?status, "Change reached terminal status");
        Ok(())
    }
}

#[async_trait]
impl ZoneApi for CloudDns {
    async fn lookup(
        &self,
        zone: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<RecordSet>, DnsError> {
        let lookup_err = |reason: String| DnsError::LookupFailed {
            zone: zone.to_string(),
            name: name.to_string(),
            record_type: record_type.to_string(),
            reason,
        };

        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .get(self.rrsets_url(zone))
            .bearer_auth(&token)
            .query(&[
                ("name", name),
                ("type", record_type.as_str()),
                ("maxResults", "1"),
            ])
            .send()
            .await
            .map_err(|e| lookup_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(lookup_err(format!("HTTP {}", response.status())));
        }

        let listing: RrsetsListResponse = response
            .json()
            .await
            .map_err(|e| lookup_err(e.to_string()))?;

        Ok(listing
            .rrsets
            .into_iter()
            .next()
            .map(|wire| wire.into_record_set(record_type)))
    }

    async fn apply(&self, zone: &str, change: &ChangeSet) -> Result<(), DnsError> {
        let change_err = |reason: String| DnsError::ChangeFailed {
            zone: zone.to_string(),
            reason,
        };

        let body = WireChange::from_change_set(change);
        debug!(
            zone,
            additions = body.additions.len(),
            deletions = body.deletions.len(),
            "Submitting change"
        );

        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(self.changes_url(zone))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| change_err(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(change_err(format!("HTTP {status}: {detail}")));
        }

        let accepted: WireChange = response
            .json()
            .await
            .map_err(|e| change_err(e.to_string()))?;

        self.poll_change(zone, accepted).await
    }
}

/// Response envelope for the rrsets listing endpoint.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct RrsetsListResponse {
    #[serde(default)]
    pub rrsets: Vec<WireRecordSet>,
}

/// Resource record set as Cloud DNS serializes it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct WireRecordSet {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub ttl: i64,
    #[serde(default)]
    pub rrdatas: Vec<String>,
}

impl WireRecordSet {
    pub(crate) fn from_record_set(record: &RecordSet) -> Self {
        Self {
            name: record.name.clone(),
            record_type: record.record_type.to_string(),
            ttl: record.ttl,
            rrdatas: record.rrdatas.clone(),
        }
    }

    /// Convert into the internal record type. The record type is taken from
    /// the lookup key; the listing endpoint only returns sets of the
    /// requested type.
    pub(crate) fn into_record_set(self, record_type: RecordType) -> RecordSet {
        RecordSet {
            name: self.name,
            record_type,
            ttl: self.ttl,
            rrdatas: self.rrdatas,
        }
    }
}

/// A change as submitted to and returned by the changes endpoint.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct WireChange {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additions: Vec<WireRecordSet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deletions: Vec<WireRecordSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl WireChange {
    pub(crate) fn from_change_set(change: &ChangeSet) -> Self {
        Self {
            additions: change.additions.iter().map(WireRecordSet::from_record_set).collect(),
            deletions: change.deletions.iter().map(WireRecordSet::from_record_set).collect(),
            id: None,
            status: None,
        }
    }
}

#[cfg(test)]
#[path = "clouddns_tests.rs"]
mod clouddns_tests;
